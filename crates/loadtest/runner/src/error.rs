//! Runner errors.

use surge_accounts::AccountError;
use surge_config::ConfigError;
use surge_gas::GasError;
use surge_modes::ModeError;
use surge_primitives::WalletError;
use surge_rpc::RpcError;
use surge_summary::SummaryError;

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The funding key is invalid.
    #[error("invalid funding key: {0}")]
    FundingKey(#[source] WalletError),

    /// The endpoint could not be used during setup.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The gas oracle could not be built.
    #[error(transparent)]
    Gas(#[from] GasError),

    /// Account setup, funding or refunds failed.
    #[error(transparent)]
    Accounts(#[from] AccountError),

    /// A contract deployment or mode initialization failed.
    #[error(transparent)]
    Mode(#[from] ModeError),

    /// The report could not be built or written.
    #[error(transparent)]
    Summary(#[from] SummaryError),

    /// A contract is needed but neither an address nor an artifact was given.
    #[error("{0} contract has neither an address nor a bytecode artifact")]
    MissingArtifact(&'static str),

    /// The run was already started once.
    #[error("runner was already used")]
    AlreadyStarted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            RunnerError::MissingArtifact("ERC-20").to_string(),
            "ERC-20 contract has neither an address nor a bytecode artifact"
        );
        assert_eq!(RunnerError::AlreadyStarted.to_string(), "runner was already used");
    }

    #[test]
    fn test_runner_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RunnerError>();
    }
}
