use std::path::PathBuf;

use clap::Parser;
use surge_config::{Config, Mode, OutputMode, RpcModePolicy};
use surge_primitives::{Address, U256};

#[derive(Parser, Debug)]
#[command(name = "surge")]
#[command(about = "JSON-RPC load generator for EVM chains")]
pub(crate) struct Cli {
    /// TOML file with defaults for every option below.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,

    /// Endpoint to send requests to.
    #[arg(short = 'r', long, env = "SURGE_RPC_URL")]
    pub rpc_url: Option<String>,

    /// HTTP proxy for every RPC request.
    #[arg(long)]
    pub proxy: Option<String>,

    /// Requests per worker.
    #[arg(short = 'n', long)]
    pub requests: Option<u64>,

    /// Number of workers.
    #[arg(short = 'c', long)]
    pub concurrency: Option<u64>,

    /// Stop the workers after this many seconds.
    #[arg(short = 't', long, value_name = "SECS")]
    pub time_limit: Option<u64>,

    /// Funding key, hex encoded.
    #[arg(long, env = "SURGE_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Chain id to sign for instead of `eth_chainId`.
    #[arg(long)]
    pub chain_id: Option<u64>,

    /// Comma separated modes or aliases, e.g. `t,s,2`.
    #[arg(short = 'm', long, value_delimiter = ',')]
    pub modes: Vec<Mode>,

    /// Recipient of transfers.
    #[arg(long)]
    pub to_address: Option<Address>,

    /// Send transfers to random addresses.
    #[arg(long)]
    pub random_recipients: bool,

    /// Value attached to transfers.
    #[arg(long, value_name = "WEI")]
    pub eth_amount_in_wei: Option<U256>,

    /// Seed for every random choice of the run.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Simulate with `eth_call` instead of sending transactions.
    #[arg(long)]
    pub eth_call_only: bool,

    /// Simulate against `latest` instead of `pending`.
    #[arg(long)]
    pub eth_call_only_latest_block: bool,

    /// Let a lone rpc mode switch call-only on by itself.
    #[arg(long)]
    pub rpc_auto_call_only: bool,

    /// Print signed transactions instead of sending them.
    #[arg(long)]
    pub output_raw_tx_only: bool,

    /// Requests per second across all workers; 0 disables the limit.
    #[arg(long)]
    pub rate_limit: Option<f64>,

    /// Adjust the rate from the pending transaction depth.
    #[arg(long)]
    pub adaptive_rate_limit: bool,

    /// Pending depth the adaptive controller aims for.
    #[arg(long)]
    pub adaptive_target_size: Option<u64>,

    /// Rate added per cycle while under the target.
    #[arg(long)]
    pub adaptive_rate_limit_increment: Option<u64>,

    /// Seconds between adaptive adjustments.
    #[arg(long, value_name = "SECS")]
    pub adaptive_cycle_duration_seconds: Option<u64>,

    /// Divisor applied to the rate while over the target.
    #[arg(long)]
    pub adaptive_backoff_factor: Option<f64>,

    /// Fixed gas limit; estimated per request when unset.
    #[arg(long)]
    pub gas_limit: Option<u64>,

    /// Fixed gas price, or max fee for dynamic fee transactions.
    #[arg(long, value_name = "WEI")]
    pub gas_price: Option<u64>,

    /// Fixed priority fee.
    #[arg(long, value_name = "WEI")]
    pub priority_gas_price: Option<u64>,

    /// Factor applied to suggested gas prices.
    #[arg(long)]
    pub gas_price_multiplier: Option<f64>,

    /// Pause while the latest base fee exceeds this value.
    #[arg(long, value_name = "WEI")]
    pub max_base_fee_wei: Option<u64>,

    /// Blob fee cap for blob transactions.
    #[arg(long, value_name = "GWEI")]
    pub blob_fee_cap: Option<u64>,

    /// Send legacy transactions.
    #[arg(long)]
    pub legacy: bool,

    /// Send without recording samples or waiting for inclusion.
    #[arg(long)]
    pub fire_and_forget: bool,

    /// Wait for each transaction's receipt before the next request.
    #[arg(long)]
    pub wait_for_receipt: bool,

    /// Receipt polls before giving up.
    #[arg(long)]
    pub receipt_retry_max: Option<u32>,

    /// First receipt poll delay; doubles on every retry.
    #[arg(long, value_name = "MS")]
    pub receipt_retry_initial_delay_ms: Option<u64>,

    /// First nonce of the funding key.
    #[arg(long)]
    pub nonce: Option<u64>,

    /// Print a block summary after the run.
    #[arg(short = 's', long)]
    pub summarize: bool,

    /// Receipts per batch request when summarizing.
    #[arg(short = 'b', long)]
    pub batch_size: Option<u64>,

    /// Blocks per batch request when summarizing.
    #[arg(long)]
    pub block_batch_size: Option<u64>,

    /// Summary format.
    #[arg(long, value_name = "text|json")]
    pub output_mode: Option<OutputMode>,

    /// Number of generated sending accounts.
    #[arg(long)]
    pub sending_accounts_count: Option<u64>,

    /// Amount sent to every sending account.
    #[arg(long, value_name = "WEI")]
    pub account_funding_amount: Option<U256>,

    /// Fund sending accounts before the workers start.
    #[arg(long)]
    pub pre_fund_sending_accounts: bool,

    /// Return what is left on sending accounts to the funder after the run.
    #[arg(long)]
    pub refund_remaining_funds: bool,

    /// File with one hex private key per line to send from.
    #[arg(long, value_name = "FILE")]
    pub sending_accounts_file: Option<PathBuf>,

    /// Write generated sending keys to this file.
    #[arg(long, value_name = "FILE")]
    pub dump_sending_accounts_file: Option<PathBuf>,

    /// Skip funding accounts that already hold the funding amount.
    #[arg(long)]
    pub check_balance_before_funding: bool,

    /// Recipients per multicall funding transaction.
    #[arg(long)]
    pub accounts_per_funding_tx: Option<u64>,

    /// Bytes written per store call.
    #[arg(long)]
    pub store_data_size: Option<u64>,

    /// Fixed opcode or precompile number.
    #[arg(short = 'f', long)]
    pub function: Option<u64>,

    /// Loop iterations for opcode and precompile calls.
    #[arg(short = 'i', long)]
    pub iterations: Option<u64>,

    /// Blocks indexed by recall and rpc modes.
    #[arg(long)]
    pub recall_blocks: Option<u64>,

    /// Existing load test contract.
    #[arg(long)]
    pub loadtest_contract_address: Option<Address>,

    /// Existing ERC-20 contract.
    #[arg(long)]
    pub erc20_address: Option<Address>,

    /// Existing ERC-721 contract.
    #[arg(long)]
    pub erc721_address: Option<Address>,

    /// Target of contract-call mode.
    #[arg(long)]
    pub contract_address: Option<Address>,

    /// Hex calldata for contract-call mode.
    #[arg(long)]
    pub calldata: Option<String>,

    /// Attach the transfer value to contract calls.
    #[arg(long)]
    pub contract_call_payable: bool,

    /// Track preconfirmations of sent transactions.
    #[arg(long)]
    pub preconf: bool,

    /// Where to write preconfirmation statistics.
    #[arg(long, value_name = "FILE")]
    pub preconf_stats_file: Option<PathBuf>,
}

impl Cli {
    /// Reads the configuration file, if any, and applies every flag given on top of it.
    pub(crate) fn load_config(&self) -> eyre::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut Config) {
        set(&mut config.rpc_url, self.rpc_url.clone());
        if self.proxy.is_some() {
            config.proxy = self.proxy.clone();
        }
        set(&mut config.requests, self.requests);
        set(&mut config.concurrency, self.concurrency);
        if self.time_limit.is_some() {
            config.time_limit_secs = self.time_limit;
        }
        if self.chain_id.is_some() {
            config.chain_id = self.chain_id;
        }
        if !self.modes.is_empty() {
            config.modes = self.modes.clone();
        }
        set(&mut config.seed, self.seed);
        config.call_only |= self.eth_call_only;
        config.call_only_latest_block |= self.eth_call_only_latest_block;
        if self.rpc_auto_call_only {
            config.rpc_mode_policy = RpcModePolicy::AutoCallOnly;
        }
        set(&mut config.batch_size, self.batch_size);
        set(&mut config.block_batch_size, self.block_batch_size);

        let tx = &mut config.transaction;
        set(&mut tx.private_key, self.private_key.clone());
        set(&mut tx.to_address, self.to_address);
        tx.random_recipients |= self.random_recipients;
        set(&mut tx.eth_amount_in_wei, self.eth_amount_in_wei);
        tx.legacy |= self.legacy;
        tx.fire_and_forget |= self.fire_and_forget;
        tx.wait_for_receipt |= self.wait_for_receipt;
        set(&mut tx.receipt_retry_max, self.receipt_retry_max);
        set(&mut tx.receipt_retry_initial_delay_ms, self.receipt_retry_initial_delay_ms);
        tx.output_raw_tx_only |= self.output_raw_tx_only;
        if self.nonce.is_some() {
            tx.start_nonce = self.nonce;
        }

        let gas = &mut config.gas;
        for (slot, flag) in [
            (&mut gas.gas_limit, self.gas_limit),
            (&mut gas.gas_price, self.gas_price),
            (&mut gas.priority_gas_price, self.priority_gas_price),
            (&mut gas.max_base_fee_wei, self.max_base_fee_wei),
        ] {
            if flag.is_some() {
                *slot = flag;
            }
        }
        set(&mut gas.gas_price_multiplier, self.gas_price_multiplier);
        set(&mut gas.blob_fee_cap_gwei, self.blob_fee_cap);

        let rate = &mut config.rate;
        set(&mut rate.rate_limit, self.rate_limit);
        rate.adaptive |= self.adaptive_rate_limit;
        set(&mut rate.adaptive_target_size, self.adaptive_target_size);
        set(&mut rate.adaptive_increment, self.adaptive_rate_limit_increment);
        set(&mut rate.adaptive_cycle_secs, self.adaptive_cycle_duration_seconds);
        set(&mut rate.adaptive_backoff_factor, self.adaptive_backoff_factor);

        let accounts = &mut config.accounts;
        set(&mut accounts.sending_accounts_count, self.sending_accounts_count);
        set(&mut accounts.funding_amount, self.account_funding_amount);
        accounts.pre_fund |= self.pre_fund_sending_accounts;
        accounts.refund_remaining_funds |= self.refund_remaining_funds;
        accounts.check_balance_before_funding |= self.check_balance_before_funding;
        if self.sending_accounts_file.is_some() {
            accounts.sending_accounts_file = self.sending_accounts_file.clone();
        }
        if self.dump_sending_accounts_file.is_some() {
            accounts.dump_sending_accounts_file = self.dump_sending_accounts_file.clone();
        }
        if self.accounts_per_funding_tx.is_some() {
            accounts.accounts_per_funding_tx = self.accounts_per_funding_tx;
        }

        let contracts = &mut config.contracts;
        for (slot, flag) in [
            (&mut contracts.load_tester_address, self.loadtest_contract_address),
            (&mut contracts.erc20_address, self.erc20_address),
            (&mut contracts.erc721_address, self.erc721_address),
        ] {
            if flag.is_some() {
                *slot = flag;
            }
        }

        let workload = &mut config.workload;
        set(&mut workload.store_data_size, self.store_data_size);
        if self.function.is_some() {
            workload.function = self.function;
        }
        set(&mut workload.iterations, self.iterations);
        set(&mut workload.recall_blocks, self.recall_blocks);
        if self.contract_address.is_some() {
            workload.contract_address = self.contract_address;
        }
        if self.calldata.is_some() {
            workload.calldata = self.calldata.clone();
        }
        workload.contract_call_payable |= self.contract_call_payable;

        config.summary.enabled |= self.summarize;
        set(&mut config.summary.output_mode, self.output_mode);
        config.preconf.enabled |= self.preconf;
        if self.preconf_stats_file.is_some() {
            config.preconf.stats_file = self.preconf_stats_file.clone();
        }
    }
}

/// Overwrites `slot` when the flag was given.
fn set<T>(slot: &mut T, flag: Option<T>) {
    if let Some(value) = flag {
        *slot = value;
    }
}
