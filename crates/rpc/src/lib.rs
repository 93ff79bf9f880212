//! JSON-RPC client, wire types and receipt polling for surge.
#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/surge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod client;
pub use client::{BatchRequest, ClientConfig, DEFAULT_REQUEST_TIMEOUT, RpcClient};

mod error;
pub use error::{RpcError, SubmissionErrorKind, codes as error_codes, parse_overshot};

mod receipt;
pub use receipt::{MAX_RECEIPT_DELAY, ReceiptPolicy, wait_for_receipt};

mod types;
pub use types::{
    BlockNumberOrTag, BlockTag, BlockTransactions, CallRequest, FeeHistory, LogFilter, RpcBlock, RpcLog,
    RpcTransaction, RpcTransactionReceipt, TxpoolStatus,
};

#[cfg(feature = "test-utils")]
pub mod test_utils;
