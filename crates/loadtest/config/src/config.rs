//! Top level load test configuration.

use std::{collections::HashSet, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    AccountsConfig, ConfigError, ContractsConfig, GasConfig, Mode, PreconfConfig, RateConfig,
    SummaryConfig, TransactionConfig, UniswapV3Config, WorkloadConfig,
};

/// Default JSON-RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// Default number of receipts fetched per batch request.
pub const DEFAULT_BATCH_SIZE: u64 = 999;

/// Default number of blocks fetched per batch request.
pub const DEFAULT_BLOCK_BATCH_SIZE: u64 = 25;

/// Default seed for deterministic randomness.
pub const DEFAULT_SEED: u64 = 123_456;

/// What to do when `rpc` mode is configured without call-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RpcModePolicy {
    /// Reject the configuration.
    #[default]
    Reject,
    /// Switch call-only on when `rpc` is the only mode.
    AutoCallOnly,
}

/// A complete load test configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// JSON-RPC endpoint under test.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Chain id override; discovered from the endpoint when unset.
    #[serde(default)]
    pub chain_id: Option<u64>,

    /// HTTP proxy for every RPC request.
    #[serde(default)]
    pub proxy: Option<String>,

    /// Requests per worker.
    #[serde(default = "default_requests")]
    pub requests: u64,

    /// Number of workers.
    #[serde(default = "default_concurrency")]
    pub concurrency: u64,

    /// Receipts per batch request when summarizing.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Blocks per batch request when summarizing or indexing.
    #[serde(default = "default_block_batch_size")]
    pub block_batch_size: u64,

    /// Overall run duration limit in seconds.
    #[serde(default)]
    pub time_limit_secs: Option<u64>,

    /// Seed for recipients, filler data, and mode selection.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Workloads to run.
    #[serde(default = "default_modes")]
    pub modes: Vec<Mode>,

    /// Use `eth_call` instead of sending transactions.
    #[serde(default)]
    pub call_only: bool,

    /// In call-only recall, execute against the latest block instead of the original one.
    #[serde(default)]
    pub call_only_latest_block: bool,

    /// Handling of `rpc` mode without call-only.
    #[serde(default)]
    pub rpc_mode_policy: RpcModePolicy,

    /// Transaction shaping.
    #[serde(default)]
    pub transaction: TransactionConfig,

    /// Gas overrides.
    #[serde(default)]
    pub gas: GasConfig,

    /// Rate limiting.
    #[serde(default)]
    pub rate: RateConfig,

    /// Sending accounts.
    #[serde(default)]
    pub accounts: AccountsConfig,

    /// Contracts.
    #[serde(default)]
    pub contracts: ContractsConfig,

    /// Mode options.
    #[serde(default)]
    pub workload: WorkloadConfig,

    /// Post-run summary.
    #[serde(default)]
    pub summary: SummaryConfig,

    /// Preconfirmation tracking.
    #[serde(default)]
    pub preconf: PreconfConfig,

    /// UniswapV3 swap settings.
    #[serde(default)]
    pub uniswapv3: Option<UniswapV3Config>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: None,
            proxy: None,
            requests: default_requests(),
            concurrency: default_concurrency(),
            batch_size: DEFAULT_BATCH_SIZE,
            block_batch_size: DEFAULT_BLOCK_BATCH_SIZE,
            time_limit_secs: None,
            seed: DEFAULT_SEED,
            modes: default_modes(),
            call_only: false,
            call_only_latest_block: false,
            rpc_mode_policy: RpcModePolicy::default(),
            transaction: TransactionConfig::default(),
            gas: GasConfig::default(),
            rate: RateConfig::default(),
            accounts: AccountsConfig::default(),
            contracts: ContractsConfig::default(),
            workload: WorkloadConfig::default(),
            summary: SummaryConfig::default(),
            preconf: PreconfConfig::default(),
            uniswapv3: None,
        }
    }
}

impl Config {
    /// Reads a TOML configuration file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// Sets the per-worker request count.
    #[must_use]
    pub const fn with_requests(mut self, requests: u64) -> Self {
        self.requests = requests;
        self
    }

    /// Sets the worker count.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: u64) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the modes.
    #[must_use]
    pub fn with_modes(mut self, modes: Vec<Mode>) -> Self {
        self.modes = modes;
        self
    }

    /// Enables or disables call-only.
    #[must_use]
    pub const fn with_call_only(mut self, call_only: bool) -> Self {
        self.call_only = call_only;
        self
    }

    /// Sets the rate limit in requests per second.
    #[must_use]
    pub const fn with_rate_limit(mut self, rate_limit: f64) -> Self {
        self.rate.rate_limit = rate_limit;
        self
    }

    /// Sets the overall time limit.
    #[must_use]
    pub const fn with_time_limit_secs(mut self, secs: u64) -> Self {
        self.time_limit_secs = Some(secs);
        self
    }

    /// Sets the `rpc` mode policy.
    #[must_use]
    pub const fn with_rpc_mode_policy(mut self, policy: RpcModePolicy) -> Self {
        self.rpc_mode_policy = policy;
        self
    }

    /// Overall run duration limit.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.filter(|secs| *secs > 0).map(Duration::from_secs)
    }

    /// Whether `mode` is configured.
    pub fn has_mode(&self, mode: Mode) -> bool {
        self.modes.contains(&mode)
    }

    /// Whether any configured mode needs the load test contract.
    pub fn needs_load_tester(&self) -> bool {
        self.modes.iter().any(|m| m.requires_load_tester())
    }

    /// Whether any configured mode needs an ERC-20 token.
    pub fn needs_erc20(&self) -> bool {
        self.modes.iter().any(|m| m.requires_erc20())
    }

    /// Whether any configured mode needs an ERC-721 collection.
    pub fn needs_erc721(&self) -> bool {
        self.modes.iter().any(|m| m.requires_erc721())
    }

    /// Checks the configuration for conflicts and returns it normalized.
    ///
    /// Normalization switches call-only on for a lone `rpc` mode under
    /// [`RpcModePolicy::AutoCallOnly`] and turns fire-and-forget on for raw transaction output.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::OutOfRange { name: "concurrency", reason: "must be at least 1" });
        }
        if self.requests == 0 {
            return Err(ConfigError::OutOfRange { name: "requests", reason: "must be at least 1" });
        }
        if self.batch_size == 0 || self.block_batch_size == 0 {
            return Err(ConfigError::OutOfRange { name: "batch size", reason: "must be at least 1" });
        }

        self.validate_modes()?;
        self.apply_rpc_policy()?;
        self.validate_mode_options()?;
        self.validate_call_only()?;
        self.validate_rate()?;
        self.validate_gas()?;
        self.validate_transaction()?;
        self.validate_contracts()?;
        Ok(self)
    }

    fn validate_modes(&self) -> Result<(), ConfigError> {
        if self.modes.is_empty() {
            return Err(ConfigError::NoModes);
        }
        let mut seen = HashSet::with_capacity(self.modes.len());
        for mode in &self.modes {
            if !seen.insert(*mode) {
                return Err(ConfigError::DuplicateMode(*mode));
            }
        }
        let multiple = self.modes.len() > 1;
        if multiple && self.has_mode(Mode::Random) {
            return Err(ConfigError::RandomWithOtherModes);
        }
        if multiple && self.has_mode(Mode::Blob) {
            return Err(ConfigError::BlobWithOtherModes);
        }
        Ok(())
    }

    fn apply_rpc_policy(&mut self) -> Result<(), ConfigError> {
        if !self.has_mode(Mode::Rpc) || self.call_only {
            return Ok(());
        }
        if self.modes.len() > 1 || self.rpc_mode_policy == RpcModePolicy::Reject {
            return Err(ConfigError::RpcRequiresCallOnly);
        }
        if self.rate.adaptive {
            return Err(ConfigError::Conflict("rpc mode", "adaptive rate limiting"));
        }
        if self.transaction.wait_for_receipt {
            return Err(ConfigError::Conflict("rpc mode", "wait-for-receipt"));
        }
        if self.accounts.pre_fund {
            return Err(ConfigError::Conflict("rpc mode", "pre-funding sending accounts"));
        }
        self.call_only = true;
        Ok(())
    }

    fn validate_mode_options(&self) -> Result<(), ConfigError> {
        if self.has_mode(Mode::ContractCall) {
            if self.workload.contract_address.is_none() {
                return Err(ConfigError::MissingModeOption {
                    mode: Mode::ContractCall,
                    missing: "a contract address",
                });
            }
            if !self.workload.has_call_input() {
                return Err(ConfigError::MissingModeOption {
                    mode: Mode::ContractCall,
                    missing: "calldata or a function signature",
                });
            }
            if self.workload.calldata.is_some() && self.workload.function_signature.is_some() {
                return Err(ConfigError::Conflict("calldata", "function signature"));
            }
        }
        if self.has_mode(Mode::Blob) {
            if self.call_only {
                return Err(ConfigError::Conflict("blob mode", "eth-call-only"));
            }
            if self.transaction.legacy {
                return Err(ConfigError::Conflict("blob mode", "legacy transactions"));
            }
        }
        if self.has_mode(Mode::UniswapV3) {
            let Some(uniswap) = &self.uniswapv3 else {
                return Err(ConfigError::MissingModeOption {
                    mode: Mode::UniswapV3,
                    missing: "uniswapv3 settings",
                });
            };
            uniswap.validate()?;
        }
        Ok(())
    }

    fn validate_call_only(&self) -> Result<(), ConfigError> {
        if !self.call_only {
            return Ok(());
        }
        if self.accounts.pre_fund {
            return Err(ConfigError::Conflict("eth-call-only", "pre-funding sending accounts"));
        }
        if self.accounts.sending_accounts_file.is_some() {
            return Err(ConfigError::Conflict("eth-call-only", "a sending accounts file"));
        }
        if self.accounts.sending_accounts_count > 0 {
            return Err(ConfigError::Conflict("eth-call-only", "sending accounts"));
        }
        if self.transaction.wait_for_receipt {
            return Err(ConfigError::Conflict("eth-call-only", "wait-for-receipt"));
        }
        if self.rate.adaptive {
            return Err(ConfigError::Conflict("eth-call-only", "adaptive rate limiting"));
        }
        Ok(())
    }

    fn validate_rate(&self) -> Result<(), ConfigError> {
        if self.rate.adaptive {
            if self.rate.adaptive_backoff_factor <= 0.0 {
                return Err(ConfigError::OutOfRange {
                    name: "adaptive backoff factor",
                    reason: "must be greater than zero",
                });
            }
            if self.rate.adaptive_cycle_secs == 0 {
                return Err(ConfigError::OutOfRange {
                    name: "adaptive cycle duration",
                    reason: "must be at least one second",
                });
            }
        }
        Ok(())
    }

    fn validate_gas(&self) -> Result<(), ConfigError> {
        if self.gas.gas_price_multiplier == 0.0 || !self.gas.gas_price_multiplier.is_finite() {
            return Err(ConfigError::OutOfRange {
                name: "gas price multiplier",
                reason: "must be a finite non-zero number",
            });
        }
        if let (Some(price), Some(tip)) = (self.gas.gas_price, self.gas.priority_gas_price)
            && price < tip
        {
            return Err(ConfigError::OutOfRange {
                name: "gas price",
                reason: "must be at least the priority gas price",
            });
        }
        Ok(())
    }

    fn validate_transaction(&mut self) -> Result<(), ConfigError> {
        if self.transaction.wait_for_receipt && self.transaction.receipt_retry_max <= 1 {
            return Err(ConfigError::OutOfRange {
                name: "receipt retry max",
                reason: "must be greater than 1 when waiting for receipts",
            });
        }
        if self.transaction.output_raw_tx_only {
            if self.modes.len() > 1 {
                return Err(ConfigError::Conflict("output-raw-tx-only", "multiple modes"));
            }
            if self.modes.iter().any(|m| !m.supports_raw_output()) {
                return Err(ConfigError::Conflict("output-raw-tx-only", "rpc or uniswapv3 mode"));
            }
            self.transaction.fire_and_forget = true;
        }
        if self.transaction.start_nonce.is_some() && self.accounts.sending_accounts_count > 1 {
            return Err(ConfigError::Conflict("a start nonce", "multiple sending accounts"));
        }
        Ok(())
    }

    fn validate_contracts(&self) -> Result<(), ConfigError> {
        let contracts = &self.contracts;
        let artifacts = &contracts.artifacts;
        let deploys = [Mode::Deploy, Mode::Random].into_iter().find(|m| self.has_mode(*m));
        if let Some(mode) = deploys
            && artifacts.load_tester.is_none()
        {
            return Err(ConfigError::MissingModeOption {
                mode,
                missing: "a load tester bytecode artifact",
            });
        }
        let checks = [
            (
                self.needs_load_tester(),
                contracts.load_tester_address,
                &artifacts.load_tester,
                "a load tester address or artifact",
            ),
            (
                self.needs_erc20(),
                contracts.erc20_address,
                &artifacts.erc20,
                "an ERC-20 address or artifact",
            ),
            (
                self.needs_erc721(),
                contracts.erc721_address,
                &artifacts.erc721,
                "an ERC-721 address or artifact",
            ),
        ];
        for (needed, address, artifact, missing) in checks {
            if needed && address.is_none() && artifact.is_none() {
                let mode = self.modes.first().copied().unwrap_or(Mode::Transaction);
                return Err(ConfigError::MissingModeOption { mode, missing });
            }
        }
        Ok(())
    }
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

const fn default_requests() -> u64 {
    1
}

const fn default_concurrency() -> u64 {
    1
}

const fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

const fn default_block_batch_size() -> u64 {
    DEFAULT_BLOCK_BATCH_SIZE
}

const fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_modes() -> Vec<Mode> {
    vec![Mode::Transaction]
}

#[cfg(test)]
mod tests {
    use std::{io::Write, path::PathBuf};

    use alloy_primitives::{Address, U256};
    use rstest::rstest;

    use super::*;

    fn with_artifacts(mut config: Config) -> Config {
        config.contracts.artifacts.load_tester = Some(PathBuf::from("LoadTester.hex"));
        config.contracts.artifacts.erc20 = Some(PathBuf::from("ERC20.hex"));
        config.contracts.artifacts.erc721 = Some(PathBuf::from("ERC721.hex"));
        config
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default().validate().expect("valid");
        assert_eq!(config.modes, vec![Mode::Transaction]);
        assert_eq!(config.requests, 1);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(config.time_limit().is_none());
    }

    #[test]
    fn test_builders() {
        let config = Config::default()
            .with_rpc_url("http://node:8545")
            .with_requests(10)
            .with_concurrency(4)
            .with_modes(vec![Mode::Store])
            .with_rate_limit(-1.0)
            .with_time_limit_secs(30)
            .with_call_only(true);
        assert_eq!(config.rpc_url, "http://node:8545");
        assert_eq!(config.requests, 10);
        assert_eq!(config.concurrency, 4);
        assert!(config.has_mode(Mode::Store));
        assert!(!config.rate.is_limited());
        assert_eq!(config.time_limit(), Some(Duration::from_secs(30)));
        assert!(config.call_only);
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"
rpc_url = "http://10.0.0.1:8545"
requests = 500
concurrency = 8
modes = ["t", "erc20"]

[rate]
rate_limit = 100.0

[accounts]
sending_accounts_count = 4
funding_amount = "0xde0b6b3a7640000"

[contracts]
erc20_address = "0x1111111111111111111111111111111111111111"
"#
        )
        .expect("write");
        let config = Config::load(file.path()).expect("load").validate().expect("valid");
        assert_eq!(config.rpc_url, "http://10.0.0.1:8545");
        assert_eq!(config.requests, 500);
        assert_eq!(config.modes, vec![Mode::Transaction, Mode::Erc20]);
        assert_eq!(config.rate.rate_limit, 100.0);
        assert_eq!(config.accounts.funding_amount, U256::from(10u64).pow(U256::from(18)));
        assert_eq!(config.contracts.erc20_address, Some(Address::repeat_byte(0x11)));
        assert_eq!(config.seed, DEFAULT_SEED);
    }

    #[test]
    fn test_load_rejects_unknown_mode() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "modes = [\"warp\"]").expect("write");
        assert!(matches!(Config::load(file.path()), Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/surge.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = with_artifacts(Config::default().with_modes(vec![Mode::Store, Mode::Recall]));
        let serialized = toml::to_string(&config).expect("serialize toml");
        let deserialized: Config = toml::from_str(&serialized).expect("deserialize toml");
        assert_eq!(config, deserialized);
    }

    #[rstest]
    #[case(vec![], "NoModes")]
    #[case(vec![Mode::Store, Mode::Store], "DuplicateMode")]
    #[case(vec![Mode::Random, Mode::Transaction], "RandomWithOtherModes")]
    #[case(vec![Mode::Blob, Mode::Transaction], "BlobWithOtherModes")]
    fn test_mode_set_rules(#[case] modes: Vec<Mode>, #[case] expected: &str) {
        let err = with_artifacts(Config::default().with_modes(modes)).validate().unwrap_err();
        assert!(format!("{err:?}").starts_with(expected), "{err:?}");
    }

    #[test]
    fn test_rpc_rejected_without_call_only() {
        let config = with_artifacts(Config::default().with_modes(vec![Mode::Rpc]));
        assert!(matches!(config.validate(), Err(ConfigError::RpcRequiresCallOnly)));
    }

    #[test]
    fn test_rpc_auto_call_only() {
        let config = with_artifacts(Config::default().with_modes(vec![Mode::Rpc]))
            .with_rpc_mode_policy(RpcModePolicy::AutoCallOnly)
            .validate()
            .expect("valid");
        assert!(config.call_only);
    }

    #[test]
    fn test_rpc_auto_call_only_still_rejects_multi_mode() {
        let config = with_artifacts(Config::default().with_modes(vec![Mode::Rpc, Mode::Store]))
            .with_rpc_mode_policy(RpcModePolicy::AutoCallOnly);
        assert!(matches!(config.validate(), Err(ConfigError::RpcRequiresCallOnly)));
    }

    #[test]
    fn test_rpc_auto_call_only_rejects_adaptive() {
        let mut config = with_artifacts(Config::default().with_modes(vec![Mode::Rpc]))
            .with_rpc_mode_policy(RpcModePolicy::AutoCallOnly);
        config.rate.adaptive = true;
        assert!(matches!(config.validate(), Err(ConfigError::Conflict("rpc mode", _))));
    }

    #[test]
    fn test_rpc_multi_mode_with_call_only() {
        let config = with_artifacts(Config::default().with_modes(vec![Mode::Rpc, Mode::Store]))
            .with_call_only(true);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_contract_call_requirements() {
        let mut config = Config::default().with_modes(vec![Mode::ContractCall]);
        assert!(matches!(config.clone().validate(), Err(ConfigError::MissingModeOption { .. })));
        config.workload.contract_address = Some(Address::repeat_byte(9));
        assert!(matches!(config.clone().validate(), Err(ConfigError::MissingModeOption { .. })));
        config.workload.calldata = Some("0x371303c0".to_string());
        assert!(config.clone().validate().is_ok());
        config.workload.function_signature = Some("inc()".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Conflict(..))));
    }

    #[test]
    fn test_blob_conflicts() {
        let mut config = Config::default().with_modes(vec![Mode::Blob]);
        config.transaction.legacy = true;
        assert!(matches!(config.validate(), Err(ConfigError::Conflict("blob mode", _))));
        let config = Config::default().with_modes(vec![Mode::Blob]).with_call_only(true);
        assert!(matches!(config.validate(), Err(ConfigError::Conflict("blob mode", _))));
    }

    #[rstest]
    #[case::prefund(|c: &mut Config| c.accounts.pre_fund = true)]
    #[case::file(|c: &mut Config| c.accounts.sending_accounts_file = Some(PathBuf::from("k")))]
    #[case::count(|c: &mut Config| c.accounts.sending_accounts_count = 2)]
    #[case::receipts(|c: &mut Config| c.transaction.wait_for_receipt = true)]
    #[case::adaptive(|c: &mut Config| c.rate.adaptive = true)]
    fn test_call_only_conflicts(#[case] tweak: fn(&mut Config)) {
        let mut config = Config::default().with_call_only(true);
        tweak(&mut config);
        assert!(matches!(config.validate(), Err(ConfigError::Conflict("eth-call-only", _))));
    }

    #[test]
    fn test_adaptive_backoff_must_be_positive() {
        let mut config = Config::default();
        config.rate.adaptive = true;
        config.rate.adaptive_backoff_factor = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn test_wait_for_receipt_needs_retries() {
        let mut config = Config::default();
        config.transaction.wait_for_receipt = true;
        config.transaction.receipt_retry_max = 1;
        assert!(config.clone().validate().is_err());
        config.transaction.receipt_retry_max = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_gas_rules() {
        let mut config = Config::default();
        config.gas.gas_price_multiplier = 0.0;
        assert!(config.clone().validate().is_err());
        config.gas.gas_price_multiplier = 1.2;
        config.gas.gas_price = Some(1);
        config.gas.priority_gas_price = Some(2);
        assert!(config.clone().validate().is_err());
        config.gas.gas_price = Some(2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_raw_output_implies_fire_and_forget() {
        let mut config = Config::default();
        config.transaction.output_raw_tx_only = true;
        let config = config.validate().expect("valid");
        assert!(config.transaction.fire_and_forget);
    }

    #[test]
    fn test_raw_output_rejects_multiple_modes_and_uniswap() {
        let mut config = with_artifacts(Config::default().with_modes(vec![Mode::Transaction, Mode::Store]));
        config.transaction.output_raw_tx_only = true;
        assert!(matches!(config.validate(), Err(ConfigError::Conflict("output-raw-tx-only", _))));

        let mut config = Config::default().with_modes(vec![Mode::UniswapV3]);
        config.uniswapv3 = Some(UniswapV3Config {
            swap_router: Address::repeat_byte(1),
            token_in: Address::repeat_byte(2),
            token_out: Address::repeat_byte(3),
            fee: 500,
            amount_in: U256::from(1),
        });
        config.transaction.output_raw_tx_only = true;
        assert!(matches!(config.validate(), Err(ConfigError::Conflict("output-raw-tx-only", _))));
    }

    #[test]
    fn test_start_nonce_with_many_accounts() {
        let mut config = Config::default();
        config.transaction.start_nonce = Some(5);
        config.accounts.sending_accounts_count = 2;
        assert!(matches!(config.validate(), Err(ConfigError::Conflict("a start nonce", _))));
    }

    #[test]
    fn test_contract_requirements() {
        let config = Config::default().with_modes(vec![Mode::Store]);
        assert!(matches!(config.validate(), Err(ConfigError::MissingModeOption { .. })));

        let mut config = Config::default().with_modes(vec![Mode::Store]);
        config.contracts.load_tester_address = Some(Address::repeat_byte(4));
        assert!(config.validate().is_ok());

        let mut config = Config::default().with_modes(vec![Mode::Deploy]);
        config.contracts.load_tester_address = Some(Address::repeat_byte(4));
        assert!(matches!(config.validate(), Err(ConfigError::MissingModeOption { mode: Mode::Deploy, .. })));
    }

    #[test]
    fn test_uniswap_requires_settings() {
        let config = Config::default().with_modes(vec![Mode::UniswapV3]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingModeOption { mode: Mode::UniswapV3, .. })
        ));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(Config::default().with_concurrency(0).validate().is_err());
    }
}
