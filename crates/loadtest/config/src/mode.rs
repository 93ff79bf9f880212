//! Load test mode catalog.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A workload a worker can run for one request.
///
/// Modes parse from their name or a short alias. Matching is exact, so `r` is random and `R`
/// is recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Mode {
    /// ERC-20 `transfer` calls. Alias `2`.
    Erc20,
    /// ERC-721 `mintBatch` calls. Alias `7`.
    Erc721,
    /// EIP-4844 transactions carrying one blob. Alias `b`.
    Blob,
    /// User supplied contract calls. Alias `cc`.
    ContractCall,
    /// Deployments of the load test contract. Alias `d`.
    Deploy,
    /// Counter increments on the load test contract. Alias `inc`.
    Increment,
    /// Opcode exercisers on the load test contract. Alias `f`.
    Opcode,
    /// Precompile exercisers on the load test contract. Alias `p`.
    Precompile,
    /// A fresh uniform draw from [`Mode::RANDOM_POOL`] per request. Alias `r`.
    Random,
    /// Replay of recently observed transactions. Alias `R`.
    Recall,
    /// Weighted mix of read-only JSON-RPC calls.
    Rpc,
    /// `store(bytes)` calls on the load test contract. Alias `s`.
    Store,
    /// Plain value transfers. Aliases `t` and `transfer`.
    Transaction,
    /// UniswapV3 `exactInputSingle` swaps. Alias `v3`.
    UniswapV3,
}

impl Mode {
    /// Every mode, in catalog order.
    pub const ALL: [Self; 14] = [
        Self::Erc20,
        Self::Erc721,
        Self::Blob,
        Self::ContractCall,
        Self::Deploy,
        Self::Increment,
        Self::Opcode,
        Self::Precompile,
        Self::Random,
        Self::Recall,
        Self::Rpc,
        Self::Store,
        Self::Transaction,
        Self::UniswapV3,
    ];

    /// Modes that `random` draws from. Modes needing a tape, an index, a blob sidecar, or
    /// external setup are left out.
    pub const RANDOM_POOL: [Self; 8] = [
        Self::Transaction,
        Self::Deploy,
        Self::Store,
        Self::Increment,
        Self::Opcode,
        Self::Precompile,
        Self::Erc20,
        Self::Erc721,
    ];

    /// Canonical name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Erc20 => "erc20",
            Self::Erc721 => "erc721",
            Self::Blob => "blob",
            Self::ContractCall => "contract-call",
            Self::Deploy => "deploy",
            Self::Increment => "increment",
            Self::Opcode => "opcode",
            Self::Precompile => "precompile",
            Self::Random => "random",
            Self::Recall => "recall",
            Self::Rpc => "rpc",
            Self::Store => "store",
            Self::Transaction => "transaction",
            Self::UniswapV3 => "uniswapv3",
        }
    }

    /// Whether the mode calls or deploys the load test contract.
    pub const fn requires_load_tester(self) -> bool {
        matches!(
            self,
            Self::Deploy
                | Self::Increment
                | Self::Opcode
                | Self::Precompile
                | Self::Random
                | Self::Store
        )
    }

    /// Whether the mode needs an ERC-20 contract.
    pub const fn requires_erc20(self) -> bool {
        matches!(self, Self::Erc20 | Self::Random | Self::Rpc)
    }

    /// Whether the mode needs an ERC-721 contract.
    pub const fn requires_erc721(self) -> bool {
        matches!(self, Self::Erc721 | Self::Random | Self::Rpc)
    }

    /// Whether the mode can run without sending transactions.
    pub const fn supports_raw_output(self) -> bool {
        !matches!(self, Self::Rpc | Self::UniswapV3)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s {
            "2" | "erc20" => Self::Erc20,
            "7" | "erc721" => Self::Erc721,
            "b" | "blob" => Self::Blob,
            "cc" | "contract-call" => Self::ContractCall,
            "d" | "deploy" => Self::Deploy,
            "inc" | "increment" => Self::Increment,
            "f" | "opcode" => Self::Opcode,
            "p" | "precompile" => Self::Precompile,
            "r" | "random" => Self::Random,
            "R" | "recall" => Self::Recall,
            "rpc" => Self::Rpc,
            "s" | "store" => Self::Store,
            "t" | "transaction" | "transfer" => Self::Transaction,
            "v3" | "uniswapv3" => Self::UniswapV3,
            other => return Err(ConfigError::UnknownMode(other.to_string())),
        };
        Ok(mode)
    }
}

impl TryFrom<String> for Mode {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.as_str().to_string()
    }
}

/// Parses a comma separated mode list such as `t,erc20,R`.
pub fn parse_modes(list: &str) -> Result<Vec<Mode>, ConfigError> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::parse).collect()
}
