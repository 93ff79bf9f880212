//! Unit and protocol constants.

use std::time::Duration;

use alloy_primitives::{Address, U256, address};

/// One gwei in wei.
pub const GWEI: u128 = 1_000_000_000;

/// One ether in wei.
pub const ETHER: u128 = 1_000_000_000_000_000_000;

/// Gas consumed by a plain value transfer.
pub const TRANSFER_GAS: u64 = 21_000;

/// Canonical Multicall3 deployment address, identical on every EVM chain that has it.
pub const MULTICALL3_ADDRESS: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Default upper bound when waiting for a single receipt.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Converts a gwei amount to wei.
pub fn gwei(amount: u64) -> U256 {
    U256::from(amount) * U256::from(GWEI)
}

/// Converts wei to fractional gwei for display.
pub fn to_gwei(wei: U256) -> f64 {
    let wei: u128 = wei.try_into().unwrap_or(u128::MAX);
    wei as f64 / GWEI as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gwei_conversion() {
        assert_eq!(gwei(0), U256::ZERO);
        assert_eq!(gwei(10), U256::from(10_000_000_000u64));
        assert_eq!(to_gwei(gwei(42)), 42.0);
    }

    #[test]
    fn test_multicall3_address() {
        assert_eq!(
            MULTICALL3_ADDRESS.to_string().to_lowercase(),
            "0xca11bde05977b3631167028862be2a173976ca11"
        );
    }

    #[test]
    fn test_ether_is_gwei_squared() {
        assert_eq!(ETHER, GWEI * GWEI);
    }
}
