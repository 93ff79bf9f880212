//! Gas oracle errors.

use surge_rpc::RpcError;

/// Errors raised while setting up a [`crate::GasOracle`].
#[derive(Debug, thiserror::Error)]
pub enum GasError {
    /// The chain has no base fee and dynamic pricing was requested without forced values.
    #[error("EIP-1559 is not active on this chain; use legacy transactions or force both gas price and priority gas price")]
    Eip1559Unavailable,

    /// Probing the chain failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}
