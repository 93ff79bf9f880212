//! Wallet error types.

use thiserror::Error;

/// Errors raised while loading keys or signing transactions.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The private key is not valid hex.
    #[error("invalid private key hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The private key has the wrong length.
    #[error("invalid private key length: expected 32 bytes, got {0}")]
    InvalidLength(usize),

    /// The private key is not a valid secp256k1 scalar.
    #[error("invalid secp256k1 private key")]
    InvalidKey,

    /// Producing a recoverable signature failed.
    #[error("failed to sign transaction: {0}")]
    Signing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_length_display() {
        let err = WalletError::InvalidLength(31);
        assert_eq!(err.to_string(), "invalid private key length: expected 32 bytes, got 31");
    }

    #[test]
    fn test_invalid_key_display() {
        assert_eq!(WalletError::InvalidKey.to_string(), "invalid secp256k1 private key");
    }

    #[test]
    fn test_hex_error_from() {
        let err: WalletError = hex::decode("zz").unwrap_err().into();
        assert!(err.to_string().contains("invalid private key hex"));
    }

    #[test]
    fn test_wallet_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WalletError>();
    }
}
