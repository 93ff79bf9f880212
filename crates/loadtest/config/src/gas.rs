//! Gas pricing overrides.

use serde::{Deserialize, Serialize};

/// Default blob fee cap, in gwei.
pub const DEFAULT_BLOB_FEE_CAP_GWEI: u64 = 100_000;

/// Overrides applied on top of the gas oracle's suggestions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GasConfig {
    /// Fixed gas limit; when unset, gas is estimated or taken from the mode.
    #[serde(default)]
    pub gas_limit: Option<u64>,

    /// Fixed gas price (legacy) or fee cap (EIP-1559), in wei.
    #[serde(default)]
    pub gas_price: Option<u64>,

    /// Fixed priority fee, in wei.
    #[serde(default)]
    pub priority_gas_price: Option<u64>,

    /// Factor applied to suggested prices before overrides.
    #[serde(default = "default_multiplier")]
    pub gas_price_multiplier: f64,

    /// Pause sending while the latest base fee exceeds this value, in wei.
    #[serde(default)]
    pub max_base_fee_wei: Option<u64>,

    /// Blob fee cap for blob transactions, in gwei.
    #[serde(default = "default_blob_fee_cap")]
    pub blob_fee_cap_gwei: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            gas_limit: None,
            gas_price: None,
            priority_gas_price: None,
            gas_price_multiplier: 1.0,
            max_base_fee_wei: None,
            blob_fee_cap_gwei: DEFAULT_BLOB_FEE_CAP_GWEI,
        }
    }
}

const fn default_multiplier() -> f64 {
    1.0
}

const fn default_blob_fee_cap() -> u64 {
    DEFAULT_BLOB_FEE_CAP_GWEI
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_defaults() {
        let config: GasConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(config, GasConfig::default());
        assert_eq!(config.gas_price_multiplier, 1.0);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = GasConfig {
            gas_limit: Some(50_000),
            gas_price: Some(3_000_000_000),
            priority_gas_price: Some(1_000_000_000),
            gas_price_multiplier: 1.5,
            max_base_fee_wei: Some(10_000_000_000),
            blob_fee_cap_gwei: 7,
        };
        let serialized = toml::to_string(&config).expect("serialize toml");
        let deserialized: GasConfig = toml::from_str(&serialized).expect("deserialize toml");
        assert_eq!(config, deserialized);
    }
}
