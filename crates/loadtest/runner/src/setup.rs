//! Maps a [`Config`] onto the components of a run.

use std::time::Duration;

use rand::{SeedableRng as _, rngs::StdRng};
use surge_accounts::{AccountPool, AccountPoolConfig, read_key_file, write_key_file};
use surge_config::{Config, RateConfig, load_bytecode};
use surge_gas::{GasOracle, GasOracleConfig};
use surge_modes::{ContractAddresses, deploy_contract};
use surge_primitives::{TxOptions, U256, Wallet};
use surge_rate::AdaptiveConfig;
use surge_rpc::{BlockNumberOrTag, ClientConfig, ReceiptPolicy, RpcClient};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::RunnerError;

/// How often readiness of the pool's accounts is checked before the run starts.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// HTTP settings sized for the worker count.
pub fn client_config(config: &Config) -> ClientConfig {
    ClientConfig::default().with_concurrency(config.concurrency as usize).with_proxy(config.proxy.clone())
}

/// Gas oracle settings.
pub fn gas_oracle_config(config: &Config) -> GasOracleConfig {
    GasOracleConfig::default()
        .with_legacy(config.transaction.legacy)
        .with_multiplier(config.gas.gas_price_multiplier)
        .with_gas_price(config.gas.gas_price.map(u128::from))
        .with_priority_gas_price(config.gas.priority_gas_price.map(u128::from))
}

/// Account pool settings. Only sending accounts are funded; a pool made of the funding key alone
/// never is.
pub fn pool_config(config: &Config, chain_id: u64) -> AccountPoolConfig {
    let accounts = &config.accounts;
    let funding_amount = if accounts.uses_sending_accounts() { accounts.funding_amount } else { U256::ZERO };
    AccountPoolConfig::new(chain_id)
        .with_funding_amount(funding_amount)
        .with_call_only(config.call_only)
        .with_refund_remaining_funds(accounts.refund_remaining_funds)
        .with_check_balance_before_funding(accounts.check_balance_before_funding)
        .with_accounts_per_funding_tx(accounts.accounts_per_funding_tx)
}

/// Receipt polling for `wait_for_receipt` runs, or `None` when receipts are not awaited.
pub fn receipt_policy(config: &Config) -> Option<ReceiptPolicy> {
    let transaction = &config.transaction;
    if !transaction.wait_for_receipt || transaction.fire_and_forget || config.call_only {
        return None;
    }
    Some(
        ReceiptPolicy::default()
            .with_max_retries(transaction.receipt_retry_max)
            .with_initial_delay(transaction.receipt_retry_delay()),
    )
}

/// AIMD settings.
pub const fn adaptive_config(rate: &RateConfig) -> AdaptiveConfig {
    AdaptiveConfig {
        target_size: rate.adaptive_target_size,
        increment: rate.adaptive_increment as f64,
        backoff_factor: rate.adaptive_backoff_factor,
        cycle: rate.adaptive_cycle(),
    }
}

/// Fills the pool from the key file, freshly generated keys, or the funding key alone.
pub(crate) fn populate_pool(pool: &AccountPool, config: &Config, funder: &Wallet) -> Result<(), RunnerError> {
    let accounts = &config.accounts;
    let start_nonce = config.transaction.start_nonce;
    if let Some(path) = &accounts.sending_accounts_file {
        let wallets = read_key_file(path)?;
        match (wallets.as_slice(), start_nonce) {
            ([wallet], Some(nonce)) => pool.add(wallet.clone(), Some(nonce)),
            _ => pool.add_all(wallets),
        }
    } else if accounts.sending_accounts_count > 0 {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let wallets = pool.add_random_n(accounts.sending_accounts_count, &mut rng);
        if let Some(path) = &accounts.dump_sending_accounts_file {
            write_key_file(path, &wallets)?;
        }
    } else {
        pool.add(funder.clone(), start_nonce);
    }
    info!(accounts = pool.len(), funder = %funder.address(), "Account pool populated");
    Ok(())
}

/// Waits until every account's nonce is loaded. Returns false if `cancel` fires first.
pub(crate) async fn wait_until_ready(pool: &AccountPool, cancel: &CancellationToken) -> bool {
    loop {
        let (ready, loaded, total) = pool.all_ready();
        if ready {
            return true;
        }
        debug!(loaded, total, "Waiting for account nonces");
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(READY_POLL_INTERVAL) => {}
        }
    }
}

/// Deploys, from the funding key, every contract the selected modes need and that has no
/// configured address.
pub(crate) async fn deploy_contracts(
    client: &RpcClient,
    config: &Config,
    funder: &Wallet,
    chain_id: u64,
    gas: &GasOracle,
) -> Result<ContractAddresses, RunnerError> {
    let mut contracts = ContractAddresses::from_config(config);
    let artifacts = &config.contracts.artifacts;
    let wanted = [
        (config.needs_load_tester(), &mut contracts.load_tester, &artifacts.load_tester, "load test"),
        (config.needs_erc20(), &mut contracts.erc20, &artifacts.erc20, "ERC-20"),
        (config.needs_erc721(), &mut contracts.erc721, &artifacts.erc721, "ERC-721"),
    ];
    let mut nonce = None;
    for (needed, slot, artifact, name) in wanted {
        if !needed || slot.is_some() {
            continue;
        }
        let path = artifact.as_ref().ok_or(RunnerError::MissingArtifact(name))?;
        let bytecode = load_bytecode(path)?;
        let next = match nonce {
            Some(next) => next,
            None => client.transaction_count(funder.address(), BlockNumberOrTag::PENDING).await?,
        };
        let opts = TxOptions::new(funder.clone(), chain_id)
            .with_nonce(next)
            .with_gas_limit(config.gas.gas_limit.unwrap_or_default())
            .with_pricing(gas.suggest().await);
        let address = deploy_contract(client, opts, bytecode, ReceiptPolicy::default()).await?;
        info!(contract = name, %address, "Contract ready");
        *slot = Some(address);
        nonce = Some(next + 1);
    }
    Ok(contracts)
}
