//! Load test configuration for surge.
#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/surge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod accounts;
pub use accounts::AccountsConfig;

mod config;
pub use config::{
    Config, DEFAULT_BATCH_SIZE, DEFAULT_BLOCK_BATCH_SIZE, DEFAULT_RPC_URL, DEFAULT_SEED,
    RpcModePolicy,
};

mod contracts;
pub use contracts::{
    ContractArtifacts, ContractsConfig, UNISWAP_FEE_TIERS, UniswapV3Config, load_bytecode,
};

mod error;
pub use error::ConfigError;

mod gas;
pub use gas::{DEFAULT_BLOB_FEE_CAP_GWEI, GasConfig};

mod mode;
pub use mode::{Mode, parse_modes};

mod output;
pub use output::{OutputMode, PreconfConfig, SummaryConfig};

mod rate;
pub use rate::{DEFAULT_RATE_LIMIT, RateConfig};

mod transaction;
pub use transaction::{
    DEFAULT_PRIVATE_KEY, DEFAULT_RECEIPT_RETRY_DELAY_MS, DEFAULT_RECEIPT_RETRY_MAX,
    DEFAULT_TO_ADDRESS, TransactionConfig,
};

mod workload;
pub use workload::WorkloadConfig;
