//! Block-cached gas price oracle for surge.
#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/surge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod error;
pub use error::GasError;

mod oracle;
pub use oracle::{
    DEFAULT_HEAD_TTL, DECREASE_CONFIRMATIONS, FEE_HISTORY_BLOCKS, GasCache, GasOracle,
    GasOracleConfig,
};
