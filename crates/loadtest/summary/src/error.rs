//! Summary errors.

use surge_rpc::RpcError;

/// Errors raised while building or writing a summary.
#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    /// The first block of the run could not be found.
    #[error("block {0} not found")]
    MissingBlock(u64),

    /// Fetching blocks or receipts failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Writing the report failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serializing the report failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
