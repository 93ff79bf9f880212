//! Client and submission error types.

use alloy_primitives::{B256, U256};
use thiserror::Error;

/// JSON-RPC error codes following Ethereum conventions.
pub mod codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i64 = -32700;
    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: i64 = -32600;
    /// Invalid method parameter(s).
    pub const INVALID_PARAMS: i64 = -32602;
    /// The method does not exist or is not available.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Generic server error, used by nodes for rejected transactions.
    pub const SERVER_ERROR: i64 = -32000;
    /// Transaction rejected by the pool.
    pub const TRANSACTION_REJECTED: i64 = -32003;
    /// Request exceeds a node-side limit.
    pub const LIMIT_EXCEEDED: i64 = -32005;
    /// Execution reverted.
    pub const EXECUTION_ERROR: i64 = 3;
}

/// Errors raised by [`crate::RpcClient`].
#[derive(Debug, Error)]
pub enum RpcError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message reported by the endpoint.
        message: String,
    },

    /// A result could not be decoded into the expected type.
    #[error("failed to decode {method} response: {source}")]
    Decode {
        /// Method whose result failed to decode.
        method: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// A required object was `null`.
    #[error("{0} returned no result")]
    MissingResult(String),

    /// A batch response lacked the entry for one request.
    #[error("batch response is missing request id {0}")]
    MissingBatchEntry(u64),

    /// No receipt after the configured number of attempts.
    #[error("no receipt for {hash} after {attempts} attempts")]
    ReceiptNotFound {
        /// Transaction hash.
        hash: B256,
        /// Attempts made.
        attempts: u32,
    },

    /// No receipt before the deadline.
    #[error("timed out waiting for receipt of {0}")]
    ReceiptTimeout(B256),
}

impl RpcError {
    /// Whether the endpoint reported that the method is unavailable.
    pub fn is_method_not_found(&self) -> bool {
        match self {
            Self::Rpc { code, message } => {
                *code == codes::METHOD_NOT_FOUND
                    || message.contains("not found")
                    || message.contains("not supported")
                    || message.contains("does not exist")
            }
            _ => false,
        }
    }

    /// Classifies a failed `eth_sendRawTransaction`.
    ///
    /// The error code decides first: requests the node refused to parse or
    /// admit never reach the pool. Pool rejections carry the reason only in
    /// the message.
    pub fn submission_kind(&self) -> SubmissionErrorKind {
        match self {
            Self::Rpc { code, message } => match *code {
                codes::PARSE_ERROR
                | codes::INVALID_REQUEST
                | codes::METHOD_NOT_FOUND
                | codes::INVALID_PARAMS
                | codes::LIMIT_EXCEEDED => SubmissionErrorKind::NonceReusable,
                _ => SubmissionErrorKind::classify(message),
            },
            _ => SubmissionErrorKind::NonceReusable,
        }
    }

    /// Amount reported by an `overshot` balance error, if any.
    pub fn overshot(&self) -> Option<U256> {
        parse_overshot(&self.to_string())
    }
}

/// Messages meaning the nonce was taken by the node even though the submission failed.
const NONCE_CONSUMED_MARKERS: [&str; 5] = [
    "replacement transaction underpriced",
    "transaction underpriced",
    "nonce too low",
    "already known",
    "could not replace existing",
];

/// Whether a failed submission consumed its nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionErrorKind {
    /// The nonce is used; it must not be handed out again.
    NonceConsumed,
    /// The nonce is still free and goes back to the account's reusable set.
    NonceReusable,
}

impl SubmissionErrorKind {
    /// Classifies an error message.
    pub fn classify(message: &str) -> Self {
        if NONCE_CONSUMED_MARKERS.iter().any(|marker| message.contains(marker)) {
            Self::NonceConsumed
        } else {
            Self::NonceReusable
        }
    }

    /// Whether the nonce can be reused.
    pub const fn is_reusable(self) -> bool {
        matches!(self, Self::NonceReusable)
    }
}

/// Extracts the decimal amount following the last `overshot` in an error message.
pub fn parse_overshot(message: &str) -> Option<U256> {
    let (_, tail) = message.rsplit_once("overshot")?;
    let digits: String = tail.trim_start().chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
