//! Orchestrates a surge load test run.
#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/surge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod base_fee;
pub use base_fee::{BASE_FEE_POLL_INTERVAL, BaseFeeGuard};

mod drain;
pub use drain::{DRAIN_MAX_TRIES, DRAIN_POLL_INTERVAL, wait_for_nonces};

mod error;
pub use error::RunnerError;

mod runner;
pub use runner::{RunOutcome, Runner};

mod setup;
pub use setup::{adaptive_config, client_config, gas_oracle_config, pool_config, receipt_policy};

mod state;
pub use state::RunState;

mod worker;
