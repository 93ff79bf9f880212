//! Mode errors.

use surge_abi::AbiError;
use surge_config::{ConfigError, Mode};
use surge_primitives::{B256, WalletError};
use surge_rpc::{RpcError, SubmissionErrorKind};

/// Errors raised while preparing or running one request.
#[derive(Debug, thiserror::Error)]
pub enum ModeError {
    /// A contract the mode calls has neither been deployed nor configured.
    #[error("{0} contract address is not available")]
    MissingContract(&'static str),

    /// Deploy mode was initialized without creation bytecode.
    #[error("no bytecode artifact for the {0} contract")]
    MissingBytecode(&'static str),

    /// The opcode number has no matching load test method.
    #[error("opcode {0:#04x} has no load test method")]
    UnknownOpcode(u64),

    /// The precompile address has no matching load test method.
    #[error("precompile address {0} has no load test method")]
    UnknownPrecompile(u64),

    /// Contract-call calldata is not valid hex.
    #[error("invalid calldata: {0}")]
    InvalidCalldata(#[from] hex::FromHexError),

    /// Contract-call mode has neither calldata nor a function signature.
    #[error("contract-call mode needs calldata or a function signature")]
    MissingCalldata,

    /// Recall mode found no transactions in the inspected blocks.
    #[error("no transactions found in the last {0} blocks to recall")]
    EmptyTape(u64),

    /// The chain has too little history for rpc mode.
    #[error(
        "insufficient chain activity for rpc mode: {transactions} transactions, {addresses} addresses, {blocks} blocks, head {head}"
    )]
    InsufficientActivity {
        /// Transactions indexed.
        transactions: usize,
        /// Distinct addresses indexed.
        addresses: usize,
        /// Blocks indexed.
        blocks: usize,
        /// Head block number.
        head: u64,
    },

    /// A mode was asked to sign with pricing it cannot use.
    #[error("{0} mode requires EIP-1559 pricing")]
    RequiresDynamicFees(Mode),

    /// Random mode has no member left to draw.
    #[error("random mode has no usable modes")]
    EmptyRandomPool,

    /// UniswapV3 mode was built without router settings.
    #[error("uniswapv3 mode requires swap settings")]
    MissingUniswapConfig,

    /// Building the blob sidecar failed.
    #[error("failed to build blob sidecar: {0}")]
    Blob(String),

    /// A deployment was mined but reverted.
    #[error("deployment {0} reverted")]
    DeploymentReverted(B256),

    /// A deployment receipt carried no contract address.
    #[error("deployment {0} produced no contract address")]
    NoContractAddress(B256),

    /// Writing a raw transaction failed.
    #[error("failed to write raw transaction: {0}")]
    RawOutput(#[from] std::io::Error),

    /// Loading a bytecode artifact failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Encoding or parsing calldata failed.
    #[error(transparent)]
    Abi(#[from] AbiError),

    /// Signing failed.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// The endpoint call failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl ModeError {
    /// Whether the nonce reserved for the failed request was consumed.
    ///
    /// Only endpoint errors can consume a nonce. Everything else failed before submission.
    pub fn submission_kind(&self) -> SubmissionErrorKind {
        match self {
            Self::Rpc(err) => err.submission_kind(),
            _ => SubmissionErrorKind::NonceReusable,
        }
    }
}
