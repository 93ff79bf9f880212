//! Configuration error types.

use std::path::PathBuf;

use crate::Mode;

/// Errors raised while loading or validating a load test configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a file referenced by the configuration.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A mode name matched no known mode or alias.
    #[error("unrecognized load test mode: {0}")]
    UnknownMode(String),

    /// No mode was configured.
    #[error("at least one mode must be specified")]
    NoModes,

    /// The same mode was listed twice.
    #[error("duplicate mode: {0}")]
    DuplicateMode(Mode),

    /// `random` was combined with other modes.
    #[error("random mode can't be used in combination with any other modes")]
    RandomWithOtherModes,

    /// `blob` was combined with other modes.
    #[error("blob mode can't be used in combination with any other modes")]
    BlobWithOtherModes,

    /// `rpc` was configured without call-only.
    #[error("rpc mode requires call-only; pass --eth-call-only")]
    RpcRequiresCallOnly,

    /// A mode requires options that are missing.
    #[error("{mode} mode requires {missing}")]
    MissingModeOption {
        /// The mode that needs the option.
        mode: Mode,
        /// Description of what is missing.
        missing: &'static str,
    },

    /// Two options cannot be used together.
    #[error("{0} and {1} can't be used together")]
    Conflict(&'static str, &'static str),

    /// A numeric option is outside its allowed range.
    #[error("invalid {name}: {reason}")]
    OutOfRange {
        /// Option name.
        name: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// A contract bytecode file does not hold valid hex.
    #[error("invalid bytecode in {path}: {source}")]
    InvalidBytecode {
        /// The bytecode file.
        path: PathBuf,
        /// The hex decoding error.
        source: hex::FromHexError,
    },
}
