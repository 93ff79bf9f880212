//! Per-mode workload options.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Options read by individual modes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkloadConfig {
    /// Bytes written per `store` call.
    #[serde(default = "default_store_data_size")]
    pub store_data_size: u64,

    /// Fixed opcode number for opcode mode, or precompile address for precompile mode.
    #[serde(default)]
    pub function: Option<u64>,

    /// Loop iterations for opcode and precompile calls, and the ERC-721 mint batch size.
    #[serde(default = "default_iterations")]
    pub iterations: u64,

    /// Number of recent blocks indexed by recall and rpc modes.
    #[serde(default = "default_recall_blocks")]
    pub recall_blocks: u64,

    /// Target of contract-call mode.
    #[serde(default)]
    pub contract_address: Option<Address>,

    /// Hex calldata for contract-call mode.
    #[serde(default)]
    pub calldata: Option<String>,

    /// Function signature to encode calldata from, e.g. `transfer(address,uint256)`.
    #[serde(default)]
    pub function_signature: Option<String>,

    /// Solidity literal arguments for `function_signature`.
    #[serde(default)]
    pub function_args: Vec<String>,

    /// Attach `eth_amount_in_wei` to contract calls.
    #[serde(default)]
    pub contract_call_payable: bool,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            store_data_size: default_store_data_size(),
            function: None,
            iterations: default_iterations(),
            recall_blocks: default_recall_blocks(),
            contract_address: None,
            calldata: None,
            function_signature: None,
            function_args: Vec::new(),
            contract_call_payable: false,
        }
    }
}

impl WorkloadConfig {
    /// Whether contract-call mode has something to call.
    pub const fn has_call_input(&self) -> bool {
        self.calldata.is_some() || self.function_signature.is_some()
    }
}

const fn default_store_data_size() -> u64 {
    1024
}

const fn default_iterations() -> u64 {
    100
}

const fn default_recall_blocks() -> u64 {
    50
}
