//! Sending account pool for surge: nonces, funding and refunds.
#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/surge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod account;
pub use account::Account;

mod config;
pub use config::{AccountPoolConfig, DEFAULT_POOL_RPC_RATE};

mod error;
pub use error::AccountError;

mod funding;

mod keys;
pub use keys::{read_key_file, write_key_file};

mod multicall;
pub use multicall::{
    DEFAULT_ACCOUNTS_PER_FUNDING_TX, GAS_PER_FUNDED_ACCOUNT, MAX_ACCOUNTS_PER_FUNDING_TX,
    accounts_per_funding_tx, aggregate3_value_calldata, multicall3_available,
};

mod pool;
pub use pool::AccountPool;
