//! Mode implementations.

mod blob;
pub use blob::{BLOB_GAS_LIMIT, BlobMode, blob_payload};

mod contract_call;
pub use contract_call::{ContractCallMode, PreparedCall};

mod deploy;
pub use deploy::DeployMode;

mod load_tester;
pub use load_tester::{IncrementMode, OpcodeMode, PrecompileMode, StoreMode};

mod random;
pub use random::RandomMode;

mod recall;
pub use recall::{RecallMode, replay_call, replay_request};

mod rpc;
pub use rpc::{RPC_WEIGHT_TOTAL, RpcCall, RpcMode};

mod tokens;
pub use tokens::{Erc20Mode, Erc721Mode};

mod transfer;
pub use transfer::TransferMode;

mod uniswap;
pub use uniswap::UniswapV3Mode;
