//! Account pool errors.

use std::{io, path::PathBuf};

use surge_abi::AbiError;
use surge_primitives::{Address, B256, U256, WalletError};
use surge_rate::RateLimitError;
use surge_rpc::RpcError;

/// Errors raised by [`crate::AccountPool`].
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// The pool holds no accounts.
    #[error("no accounts available")]
    NoAccounts,

    /// The address is not part of the pool.
    #[error("account {0} is not in the pool")]
    UnknownAccount(Address),

    /// The account's starting nonce has not been loaded yet.
    #[error("account {0} is not ready; its nonce is still loading")]
    NotReady(Address),

    /// The funder cannot cover the amount to distribute plus fees.
    #[error("funding account {address} balance {balance} can't cover the {needed} needed to fund all accounts")]
    InsufficientFunder {
        /// Funder address.
        address: Address,
        /// Funder balance in wei.
        balance: U256,
        /// Total required in wei.
        needed: U256,
    },

    /// Some funding transactions were not mined successfully.
    #[error("{failed} of {total} funding transactions failed")]
    FundingFailed {
        /// Transactions that reverted, were dropped, or timed out.
        failed: usize,
        /// Transactions sent.
        total: usize,
    },

    /// A funding or refund transaction was mined but reverted.
    #[error("transaction {0} reverted")]
    Reverted(B256),

    /// The refund amount became negative while correcting an `overshot` rejection.
    #[error("cannot return funds from {0}: balance does not cover the transfer fee")]
    RefundUnderflow(Address),

    /// A key file could not be read or written.
    #[error("key file {path}: {source}")]
    KeyFile {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A key file line is not a valid private key.
    #[error("key file {path} line {line}: {source}")]
    InvalidKey {
        /// File path.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// Parse error.
        source: WalletError,
    },

    /// Signing failed.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Encoding the Multicall3 call failed.
    #[error(transparent)]
    Abi(#[from] AbiError),

    /// The endpoint call failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Waiting on the pool's request throttle was cancelled.
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(AccountError::NoAccounts.to_string(), "no accounts available");
        assert_eq!(
            AccountError::FundingFailed { failed: 2, total: 10 }.to_string(),
            "2 of 10 funding transactions failed"
        );
        let err = AccountError::InsufficientFunder {
            address: Address::ZERO,
            balance: U256::from(1),
            needed: U256::from(5),
        };
        assert!(err.to_string().contains("balance 1 can't cover the 5 needed"));
    }

    #[test]
    fn test_account_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AccountError>();
    }
}
