//! Workload modes for surge.
#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/surge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod activity;
pub use activity::{ActivityIndex, fetch_tape};

pub mod bindings;

mod context;
pub use context::{
    ContractAddresses, Dispatch, Execution, ModeContext, RawSink, TxRequest, call_request, random_address,
};

mod deploy;
pub use deploy::deploy_contract;

mod error;
pub use error::ModeError;

mod mode;
pub use mode::{LoadMode, ModeRegistry, build_mode};

mod modes;
pub use modes::{
    BLOB_GAS_LIMIT, BlobMode, ContractCallMode, DeployMode, Erc20Mode, Erc721Mode, IncrementMode, OpcodeMode,
    PrecompileMode, PreparedCall, RPC_WEIGHT_TOTAL, RandomMode, RecallMode, RpcCall, RpcMode, StoreMode,
    TransferMode, UniswapV3Mode, blob_payload, replay_call, replay_request,
};
