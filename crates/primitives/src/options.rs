//! Per-request transaction options.

use alloy_consensus::{TxEip1559, TxLegacy};
use alloy_primitives::{Address, Bytes, TxKind, U256};

use crate::{SignedTx, Wallet, WalletError};

/// Fee fields of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasPricing {
    /// Type 0 pricing with a single gas price.
    Legacy {
        /// Gas price in wei.
        gas_price: u128,
    },
    /// Type 2 pricing with a fee cap and a priority tip.
    Dynamic {
        /// Maximum total fee per gas in wei.
        max_fee_per_gas: u128,
        /// Maximum priority fee per gas in wei.
        max_priority_fee_per_gas: u128,
    },
}

impl GasPricing {
    /// Returns the gas price for legacy pricing, or the fee cap for dynamic pricing.
    pub const fn max_fee(&self) -> u128 {
        match self {
            Self::Legacy { gas_price } => *gas_price,
            Self::Dynamic { max_fee_per_gas, .. } => *max_fee_per_gas,
        }
    }

    /// Returns the priority tip. Legacy pricing has none.
    pub const fn tip(&self) -> u128 {
        match self {
            Self::Legacy { .. } => 0,
            Self::Dynamic { max_priority_fee_per_gas, .. } => *max_priority_fee_per_gas,
        }
    }

    /// Returns true for legacy pricing.
    pub const fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy { .. })
    }
}

impl Default for GasPricing {
    fn default() -> Self {
        Self::Legacy { gas_price: 0 }
    }
}

/// Transaction options handed to a mode for one request.
///
/// The runner fills the identity and nonce from the account pool and the pricing from the gas
/// oracle. A `gas_limit` of zero asks the mode to estimate gas through the endpoint.
#[derive(Debug, Clone)]
pub struct TxOptions {
    /// Signing identity of the sender.
    pub wallet: Wallet,
    /// Chain id used for replay protection.
    pub chain_id: u64,
    /// Nonce reserved for this request.
    pub nonce: u64,
    /// Gas limit, or zero to estimate.
    pub gas_limit: u64,
    /// Fee fields.
    pub pricing: GasPricing,
    /// Value attached to the transaction.
    pub value: U256,
}

impl TxOptions {
    /// Creates options for the given wallet and chain with empty pricing and nonce zero.
    pub fn new(wallet: Wallet, chain_id: u64) -> Self {
        Self { wallet, chain_id, nonce: 0, gas_limit: 0, pricing: GasPricing::default(), value: U256::ZERO }
    }

    /// Address of the sender.
    pub const fn from(&self) -> Address {
        self.wallet.address()
    }

    /// Sets the nonce.
    #[must_use]
    pub const fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the gas limit.
    #[must_use]
    pub const fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Sets the fee fields.
    #[must_use]
    pub const fn with_pricing(mut self, pricing: GasPricing) -> Self {
        self.pricing = pricing;
        self
    }

    /// Sets the attached value.
    #[must_use]
    pub const fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Signs a type 0 or type 2 transaction, following the pricing variant.
    pub fn sign(&self, to: TxKind, input: Bytes) -> Result<SignedTx, WalletError> {
        match self.pricing {
            GasPricing::Legacy { gas_price } => self.wallet.sign_transaction(TxLegacy {
                chain_id: Some(self.chain_id),
                nonce: self.nonce,
                gas_price,
                gas_limit: self.gas_limit,
                to,
                value: self.value,
                input,
            }),
            GasPricing::Dynamic { max_fee_per_gas, max_priority_fee_per_gas } => {
                self.wallet.sign_transaction(TxEip1559 {
                    chain_id: self.chain_id,
                    nonce: self.nonce,
                    gas_limit: self.gas_limit,
                    max_fee_per_gas,
                    max_priority_fee_per_gas,
                    to,
                    value: self.value,
                    access_list: Default::default(),
                    input,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_consensus::Transaction as _;

    use super::*;

    #[test]
    fn test_legacy_pricing_has_no_tip() {
        let pricing = GasPricing::Legacy { gas_price: 7 };
        assert_eq!(pricing.max_fee(), 7);
        assert_eq!(pricing.tip(), 0);
        assert!(pricing.is_legacy());
    }

    #[test]
    fn test_dynamic_pricing_accessors() {
        let pricing = GasPricing::Dynamic { max_fee_per_gas: 100, max_priority_fee_per_gas: 2 };
        assert_eq!(pricing.max_fee(), 100);
        assert_eq!(pricing.tip(), 2);
        assert!(!pricing.is_legacy());
    }

    #[test]
    fn test_tx_options_builders() {
        let wallet = Wallet::from_seed(3);
        let opts = TxOptions::new(wallet.clone(), 1337)
            .with_nonce(9)
            .with_gas_limit(21_000)
            .with_value(U256::from(5))
            .with_pricing(GasPricing::Legacy { gas_price: 1 });
        assert_eq!(opts.from(), wallet.address());
        assert_eq!(opts.chain_id, 1337);
        assert_eq!(opts.nonce, 9);
        assert_eq!(opts.gas_limit, 21_000);
        assert_eq!(opts.value, U256::from(5));
    }

    #[test]
    fn test_sign_follows_pricing_variant() {
        let to = Address::repeat_byte(0x11);
        let base = TxOptions::new(Wallet::from_seed(4), 1337).with_nonce(2).with_gas_limit(21_000);

        let legacy = base
            .clone()
            .with_pricing(GasPricing::Legacy { gas_price: 5 })
            .sign(TxKind::Call(to), Bytes::new())
            .expect("sign legacy");
        assert!(legacy.envelope.is_legacy());
        assert_eq!(legacy.envelope.gas_price(), Some(5));
        assert_eq!(legacy.envelope.chain_id(), Some(1337));

        let dynamic = base
            .with_pricing(GasPricing::Dynamic { max_fee_per_gas: 9, max_priority_fee_per_gas: 1 })
            .with_value(U256::from(3))
            .sign(TxKind::Call(to), Bytes::new())
            .expect("sign dynamic");
        assert!(dynamic.envelope.is_eip1559());
        assert_eq!(dynamic.envelope.max_fee_per_gas(), 9);
        assert_eq!(dynamic.envelope.nonce(), 2);
        assert_eq!(dynamic.envelope.value(), U256::from(3));
    }
}
