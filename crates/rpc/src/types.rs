//! Ethereum JSON-RPC wire types.

use alloy_primitives::{Address, B256, Bytes, U64, U256};
use serde::{Deserialize, Serialize};

/// Block number or tag for RPC queries.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BlockNumberOrTag {
    /// Block number.
    Number(U64),
    /// Block tag.
    Tag(BlockTag),
}

/// Block tags for RPC queries.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    /// Earliest block (genesis).
    Earliest,
    /// Finalized block.
    Finalized,
    /// Safe block.
    Safe,
    /// Latest block.
    #[default]
    Latest,
    /// Pending block.
    Pending,
}

impl Default for BlockNumberOrTag {
    fn default() -> Self {
        Self::Tag(BlockTag::Latest)
    }
}

impl BlockNumberOrTag {
    /// The `latest` tag.
    pub const LATEST: Self = Self::Tag(BlockTag::Latest);
    /// The `pending` tag.
    pub const PENDING: Self = Self::Tag(BlockTag::Pending);

    /// Returns true if this is a pending block reference.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Tag(BlockTag::Pending))
    }

    /// Returns the block number if this is not a tag.
    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(n.to()),
            Self::Tag(_) => None,
        }
    }
}

impl From<u64> for BlockNumberOrTag {
    fn from(number: u64) -> Self {
        Self::Number(U64::from(number))
    }
}

/// Block header fields plus its transactions.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcBlock {
    /// Block hash.
    pub hash: B256,
    /// Parent block hash.
    pub parent_hash: B256,
    /// Block number.
    pub number: U64,
    /// Block timestamp in seconds.
    pub timestamp: U64,
    /// Gas limit.
    pub gas_limit: U64,
    /// Gas used.
    pub gas_used: U64,
    /// Base fee per gas; absent before London.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<U256>,
    /// Miner/beneficiary address.
    pub miner: Address,
    /// Transactions (hashes or full objects).
    pub transactions: BlockTransactions,
}

impl RpcBlock {
    /// Block number as `u64`.
    pub fn number(&self) -> u64 {
        self.number.to()
    }

    /// Timestamp as `u64`.
    pub fn timestamp(&self) -> u64 {
        self.timestamp.to()
    }

    /// Hashes of all transactions, whichever form the block was fetched in.
    pub fn transaction_hashes(&self) -> Vec<B256> {
        match &self.transactions {
            BlockTransactions::Hashes(hashes) => hashes.clone(),
            BlockTransactions::Full(txs) => txs.iter().map(|tx| tx.hash).collect(),
        }
    }

    /// Full transactions; empty when the block was fetched with hashes only.
    pub fn full_transactions(&self) -> &[RpcTransaction] {
        match &self.transactions {
            BlockTransactions::Full(txs) => txs,
            BlockTransactions::Hashes(_) => &[],
        }
    }

    /// Number of transactions.
    pub fn transaction_count(&self) -> usize {
        match &self.transactions {
            BlockTransactions::Hashes(hashes) => hashes.len(),
            BlockTransactions::Full(txs) => txs.len(),
        }
    }
}

/// Transactions in a block response.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BlockTransactions {
    /// Only transaction hashes.
    Hashes(Vec<B256>),
    /// Full transaction objects.
    Full(Vec<RpcTransaction>),
}

impl Default for BlockTransactions {
    fn default() -> Self {
        Self::Hashes(Vec::new())
    }
}

/// Transaction object.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcTransaction {
    /// Transaction hash.
    pub hash: B256,
    /// Nonce.
    pub nonce: U64,
    /// Block hash; `None` while pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<B256>,
    /// Block number; `None` while pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<U64>,
    /// Sender address.
    pub from: Address,
    /// Recipient; `None` for contract creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Value transferred.
    pub value: U256,
    /// Gas limit.
    pub gas: U64,
    /// Gas price (legacy) or effective gas price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    /// Max fee per gas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    /// Max priority fee per gas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    /// Input data.
    pub input: Bytes,
    /// Transaction type.
    #[serde(rename = "type")]
    pub tx_type: U64,
    /// Chain ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U64>,
}

impl RpcTransaction {
    /// Nonce as `u64`.
    pub fn nonce(&self) -> u64 {
        self.nonce.to()
    }

    /// Gas limit as `u64`.
    pub fn gas(&self) -> u64 {
        self.gas.to()
    }

    /// Whether the transaction carries EIP-1559 fee fields.
    pub const fn is_dynamic_fee(&self) -> bool {
        self.max_fee_per_gas.is_some()
    }
}

/// Transaction receipt.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcTransactionReceipt {
    /// Transaction hash.
    pub transaction_hash: B256,
    /// Transaction index in block.
    pub transaction_index: U64,
    /// Block hash.
    pub block_hash: B256,
    /// Block number.
    pub block_number: U64,
    /// Sender address.
    pub from: Address,
    /// Recipient address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Cumulative gas used.
    pub cumulative_gas_used: U64,
    /// Gas used by this transaction.
    pub gas_used: U64,
    /// Contract address created, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    /// Logs generated.
    pub logs: Vec<RpcLog>,
    /// Transaction type.
    #[serde(rename = "type")]
    pub tx_type: U64,
    /// Status (1 = success, 0 = failure).
    pub status: U64,
    /// Effective gas price.
    pub effective_gas_price: U256,
}

impl RpcTransactionReceipt {
    /// Whether execution succeeded.
    pub fn is_success(&self) -> bool {
        self.status == U64::from(1)
    }

    /// Block number as `u64`.
    pub fn block_number(&self) -> u64 {
        self.block_number.to()
    }

    /// Gas used as `u64`.
    pub fn gas_used(&self) -> u64 {
        self.gas_used.to()
    }
}

/// Log entry.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcLog {
    /// Contract address.
    pub address: Address,
    /// Log topics.
    pub topics: Vec<B256>,
    /// Log data.
    pub data: Bytes,
    /// Block number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<U64>,
    /// Transaction hash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    /// Log index in block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_index: Option<U64>,
}

/// Filter for `eth_getLogs`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    /// First block of the range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_block: Option<BlockNumberOrTag>,
    /// Last block of the range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_block: Option<BlockNumberOrTag>,
    /// Emitting contracts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,
    /// Topic filters by position; `None` matches anything.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<Option<B256>>,
}

impl LogFilter {
    /// Filter over an inclusive block range.
    pub fn range(from: u64, to: u64) -> Self {
        Self { from_block: Some(from.into()), to_block: Some(to.into()), ..Default::default() }
    }

    /// Restricts the filter to one contract.
    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = vec![address];
        self
    }

    /// Restricts the first topic.
    #[must_use]
    pub fn with_topic0(mut self, topic: B256) -> Self {
        self.topics = vec![Some(topic)];
        self
    }
}

/// Call request for `eth_call` and `eth_estimateGas`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    /// Sender address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Recipient; `None` for contract creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Gas limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U64>,
    /// Gas price (legacy).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    /// Max fee per gas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    /// Max priority fee per gas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    /// Value to transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    /// Input data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Bytes>,
    /// Nonce.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U64>,
}

impl CallRequest {
    /// Call to `to` with the given input.
    pub fn new(to: Address, input: Bytes) -> Self {
        Self { to: Some(to), input: Some(input), ..Default::default() }
    }

    /// Sets the sender.
    #[must_use]
    pub const fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Sets the value.
    #[must_use]
    pub const fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    /// Sets the gas limit.
    #[must_use]
    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(U64::from(gas));
        self
    }

    /// Input data, empty when unset.
    pub fn input_data(&self) -> Bytes {
        self.input.clone().unwrap_or_default()
    }
}

/// Fee history response.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeeHistory {
    /// Base fee per gas for each block, plus the next block.
    pub base_fee_per_gas: Vec<U256>,
    /// Gas used ratio for each block.
    pub gas_used_ratio: Vec<f64>,
    /// Oldest block number.
    pub oldest_block: U64,
    /// Priority fee rewards at the requested percentiles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<Vec<Vec<U256>>>,
}

impl FeeHistory {
    /// Base fee of the most recent block in the window.
    pub fn latest_base_fee(&self) -> Option<U256> {
        let len = self.base_fee_per_gas.len();
        match len {
            0 => None,
            1 => self.base_fee_per_gas.first().copied(),
            _ => self.base_fee_per_gas.get(len - 2).copied(),
        }
    }
}

/// `txpool_status` response.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxpoolStatus {
    /// Executable transactions.
    pub pending: U64,
    /// Transactions waiting on a nonce gap.
    pub queued: U64,
}

impl TxpoolStatus {
    /// Pending plus queued.
    pub fn depth(&self) -> u64 {
        self.pending.to::<u64>().saturating_add(self.queued.to())
    }
}
