//! Contract addresses, bytecode artifacts, and UniswapV3 settings.

use std::path::{Path, PathBuf};

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Fee tiers with a canonical UniswapV3 pool, in hundredths of a basis point.
pub const UNISWAP_FEE_TIERS: [u32; 3] = [500, 3_000, 10_000];

/// Paths to hex encoded creation bytecode for contracts surge may deploy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractArtifacts {
    /// The load test contract.
    #[serde(default)]
    pub load_tester: Option<PathBuf>,
    /// A mintable ERC-20 token.
    #[serde(default)]
    pub erc20: Option<PathBuf>,
    /// A mintable ERC-721 collection.
    #[serde(default)]
    pub erc721: Option<PathBuf>,
}

/// Pre-deployed contracts and where to find bytecode for the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractsConfig {
    /// Address of a deployed load test contract.
    #[serde(default)]
    pub load_tester_address: Option<Address>,
    /// Address of a deployed ERC-20 token.
    #[serde(default)]
    pub erc20_address: Option<Address>,
    /// Address of a deployed ERC-721 collection.
    #[serde(default)]
    pub erc721_address: Option<Address>,
    /// Bytecode artifacts used when an address is missing.
    #[serde(default)]
    pub artifacts: ContractArtifacts,
}

/// Settings for `exactInputSingle` swaps through a deployed router.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UniswapV3Config {
    /// SwapRouter address.
    pub swap_router: Address,
    /// Token sold.
    pub token_in: Address,
    /// Token bought.
    pub token_out: Address,
    /// Pool fee tier.
    #[serde(default = "default_fee")]
    pub fee: u32,
    /// Amount of `token_in` per swap.
    pub amount_in: U256,
}

impl UniswapV3Config {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !UNISWAP_FEE_TIERS.contains(&self.fee) {
            return Err(ConfigError::OutOfRange {
                name: "uniswap fee",
                reason: "supported tiers are 500, 3000, and 10000",
            });
        }
        if self.amount_in.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: "uniswap amount_in",
                reason: "must be greater than zero",
            });
        }
        if self.token_in == self.token_out {
            return Err(ConfigError::Conflict("uniswap token_in", "an identical token_out"));
        }
        Ok(())
    }
}

const fn default_fee() -> u32 {
    3_000
}

/// Reads hex encoded bytecode from a file, tolerating a `0x` prefix and surrounding whitespace.
pub fn load_bytecode(path: &Path) -> Result<Bytes, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    let trimmed = contents.trim();
    let hex_str = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(hex_str)
        .map(Bytes::from)
        .map_err(|source| ConfigError::InvalidBytecode { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn uniswap() -> UniswapV3Config {
        UniswapV3Config {
            swap_router: Address::repeat_byte(1),
            token_in: Address::repeat_byte(2),
            token_out: Address::repeat_byte(3),
            fee: 3_000,
            amount_in: U256::from(1_000),
        }
    }

    #[test]
    fn test_load_bytecode() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "  0x6080604052  ").expect("write");
        let code = load_bytecode(file.path()).expect("load");
        assert_eq!(code.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
    }

    #[test]
    fn test_load_bytecode_rejects_bad_hex() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "0x608").expect("write");
        assert!(matches!(load_bytecode(file.path()), Err(ConfigError::InvalidBytecode { .. })));
    }

    #[test]
    fn test_load_bytecode_missing_file() {
        let err = load_bytecode(Path::new("/nonexistent/surge/bytecode.hex")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_uniswap_validation() {
        assert!(uniswap().validate().is_ok());
        let mut bad_fee = uniswap();
        bad_fee.fee = 42;
        assert!(bad_fee.validate().is_err());
        let mut zero = uniswap();
        zero.amount_in = U256::ZERO;
        assert!(zero.validate().is_err());
        let mut same = uniswap();
        same.token_out = same.token_in;
        assert!(same.validate().is_err());
    }
}
