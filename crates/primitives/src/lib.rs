//! Shared value types for the surge load generator.
#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/surge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub use alloy_primitives::{Address, B256, Bytes, I256, TxKind, U64, U256, address, keccak256};

mod constants;
pub use constants::{
    DEFAULT_RECEIPT_TIMEOUT, ETHER, GWEI, MULTICALL3_ADDRESS, TRANSFER_GAS, gwei, to_gwei,
};

mod error;
pub use error::WalletError;

mod options;
pub use options::{GasPricing, TxOptions};

mod sample;
pub use sample::Sample;

mod wallet;
pub use wallet::{SignedTx, Wallet, address_from_key};
