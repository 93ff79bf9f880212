//! Transaction shaping options.

use std::time::Duration;

use alloy_primitives::{Address, U256, address};
use serde::{Deserialize, Serialize};

/// Well-known development key used when no funding key is configured.
pub const DEFAULT_PRIVATE_KEY: &str =
    "42b6e34dc21598a807dc19d7784c71b2a7a01f6480dc6f58258f78e539f1a1fa";

/// Recipient used by transfers when recipients are not randomized.
pub const DEFAULT_TO_ADDRESS: Address = address!("DEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEF");

/// Default receipt polling budget for `wait_for_receipt`.
pub const DEFAULT_RECEIPT_RETRY_MAX: u32 = 30;

/// Default initial delay between receipt polls, in milliseconds.
pub const DEFAULT_RECEIPT_RETRY_DELAY_MS: u64 = 100;

/// How each request's transaction is built and what happens after submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionConfig {
    /// Hex encoded private key of the funding account.
    #[serde(default = "default_private_key")]
    pub private_key: String,

    /// Fixed recipient for transfers, ERC-20 transfers, and mints.
    #[serde(default = "default_to_address")]
    pub to_address: Address,

    /// Send to a fresh random address on every request.
    #[serde(default)]
    pub random_recipients: bool,

    /// Value attached to transfers and payable calls.
    #[serde(default)]
    pub eth_amount_in_wei: U256,

    /// Build type 0 transactions instead of EIP-1559 ones.
    #[serde(default)]
    pub legacy: bool,

    /// Skip sample recording and receipt waiting.
    #[serde(default)]
    pub fire_and_forget: bool,

    /// Poll for every receipt before counting the request as done.
    #[serde(default)]
    pub wait_for_receipt: bool,

    /// Receipt polling attempts.
    #[serde(default = "default_receipt_retry_max")]
    pub receipt_retry_max: u32,

    /// First receipt polling delay in milliseconds; later delays double.
    #[serde(default = "default_receipt_retry_delay_ms")]
    pub receipt_retry_initial_delay_ms: u64,

    /// Print signed transactions instead of sending them.
    #[serde(default)]
    pub output_raw_tx_only: bool,

    /// Starting nonce for a single sending account, overriding the chain's pending nonce.
    #[serde(default)]
    pub start_nonce: Option<u64>,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            private_key: default_private_key(),
            to_address: DEFAULT_TO_ADDRESS,
            random_recipients: false,
            eth_amount_in_wei: U256::ZERO,
            legacy: false,
            fire_and_forget: false,
            wait_for_receipt: false,
            receipt_retry_max: DEFAULT_RECEIPT_RETRY_MAX,
            receipt_retry_initial_delay_ms: DEFAULT_RECEIPT_RETRY_DELAY_MS,
            output_raw_tx_only: false,
            start_nonce: None,
        }
    }
}

impl TransactionConfig {
    /// Initial receipt polling delay.
    pub const fn receipt_retry_delay(&self) -> Duration {
        Duration::from_millis(self.receipt_retry_initial_delay_ms)
    }
}

fn default_private_key() -> String {
    DEFAULT_PRIVATE_KEY.to_string()
}

const fn default_to_address() -> Address {
    DEFAULT_TO_ADDRESS
}

const fn default_receipt_retry_max() -> u32 {
    DEFAULT_RECEIPT_RETRY_MAX
}

const fn default_receipt_retry_delay_ms() -> u64 {
    DEFAULT_RECEIPT_RETRY_DELAY_MS
}
