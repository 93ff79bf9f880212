//! HTTP JSON-RPC client.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use alloy_primitives::{Address, B256, Bytes, U64, U128, U256};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::{
    BlockNumberOrTag, CallRequest, FeeHistory, LogFilter, RpcBlock, RpcError, RpcLog, RpcTransaction,
    RpcTransactionReceipt, TxpoolStatus,
};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP settings for [`RpcClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Idle connections kept per host.
    pub pool_size: usize,
    /// Optional proxy URL for all requests.
    pub proxy: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { pool_size: 100, proxy: None, timeout: DEFAULT_REQUEST_TIMEOUT }
    }
}

impl ClientConfig {
    /// Sizes the connection pool for the given worker count.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.pool_size = concurrency.saturating_mul(2);
        self
    }

    /// Routes requests through a proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One entry of a batched request.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    /// Method name.
    pub method: String,
    /// Positional parameters.
    pub params: Value,
}

impl BatchRequest {
    /// Creates a batch entry.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self { method: method.into(), params }
    }
}

#[derive(Debug, Deserialize)]
struct ResponseError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ResponseError>,
}

impl Response {
    fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(RpcError::Rpc { code: error.code, message: error.message }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// JSON-RPC 2.0 client over HTTP.
///
/// Cloning is cheap; clones share the connection pool and request id counter.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: Arc<str>,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    /// Client with default settings.
    pub fn new(url: impl AsRef<str>) -> Result<Self, RpcError> {
        Self::with_config(url, &ClientConfig::default())
    }

    /// Client with explicit HTTP settings.
    pub fn with_config(url: impl AsRef<str>, config: &ClientConfig) -> Result<Self, RpcError> {
        let mut builder =
            reqwest::Client::builder().timeout(config.timeout).pool_max_idle_per_host(config.pool_size);
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self { http: builder.build()?, url: Arc::from(url.as_ref()), next_id: Arc::new(AtomicU64::new(1)) })
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn reserve_ids(&self, count: u64) -> u64 {
        self.next_id.fetch_add(count, Ordering::Relaxed)
    }

    /// Sends one request and decodes its result.
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.reserve_ids(1);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        trace!(method, id, "Sending request");
        let response: Response = self.http.post(&*self.url).json(&body).send().await?.json().await?;
        let value = response.into_result()?;
        serde_json::from_value(value).map_err(|source| RpcError::Decode { method: method.to_string(), source })
    }

    /// Sends a batch and returns one result per request, in request order.
    ///
    /// The outer error covers transport failures; each entry carries its own RPC error.
    pub async fn batch(&self, requests: &[BatchRequest]) -> Result<Vec<Result<Value, RpcError>>, RpcError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let first_id = self.reserve_ids(requests.len() as u64);
        let body: Vec<Value> = requests
            .iter()
            .zip(first_id..)
            .map(|(req, id)| json!({ "jsonrpc": "2.0", "id": id, "method": req.method, "params": req.params }))
            .collect();
        debug!(size = requests.len(), "Sending batch");
        let value: Value = self.http.post(&*self.url).json(&body).send().await?.json().await?;
        let responses: Vec<Response> = match value {
            Value::Array(_) => serde_json::from_value(value)
                .map_err(|source| RpcError::Decode { method: "batch".to_string(), source })?,
            other => {
                let single: Response = serde_json::from_value(other)
                    .map_err(|source| RpcError::Decode { method: "batch".to_string(), source })?;
                return Err(single.into_result().err().unwrap_or(RpcError::MissingBatchEntry(first_id)));
            }
        };
        let mut by_id: HashMap<u64, Response> =
            responses.into_iter().filter_map(|r| r.id.map(|id| (id, r))).collect();
        Ok((first_id..first_id + requests.len() as u64)
            .map(|id| by_id.remove(&id).ok_or(RpcError::MissingBatchEntry(id)).and_then(Response::into_result))
            .collect())
    }

    /// Decodes a batch entry's result.
    pub fn decode_batch_entry<T: DeserializeOwned>(
        method: &str,
        entry: Result<Value, RpcError>,
    ) -> Result<T, RpcError> {
        serde_json::from_value(entry?).map_err(|source| RpcError::Decode { method: method.to_string(), source })
    }

    /// `eth_chainId`.
    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        self.request::<U64>("eth_chainId", json!([])).await.map(|v| v.to())
    }

    /// `eth_blockNumber`.
    pub async fn block_number(&self) -> Result<u64, RpcError> {
        self.request::<U64>("eth_blockNumber", json!([])).await.map(|v| v.to())
    }

    /// `eth_gasPrice`.
    pub async fn gas_price(&self) -> Result<u128, RpcError> {
        self.request::<U128>("eth_gasPrice", json!([])).await.map(|v| v.to())
    }

    /// `eth_maxPriorityFeePerGas`.
    pub async fn max_priority_fee_per_gas(&self) -> Result<u128, RpcError> {
        self.request::<U128>("eth_maxPriorityFeePerGas", json!([])).await.map(|v| v.to())
    }

    /// `eth_feeHistory` for the `block_count` blocks ending at `newest`.
    pub async fn fee_history(
        &self,
        block_count: u64,
        newest: BlockNumberOrTag,
        percentiles: &[f64],
    ) -> Result<FeeHistory, RpcError> {
        self.request("eth_feeHistory", json!([U64::from(block_count), newest, percentiles])).await
    }

    /// `eth_getBlockByNumber`.
    pub async fn block_by_number(
        &self,
        block: BlockNumberOrTag,
        full_transactions: bool,
    ) -> Result<Option<RpcBlock>, RpcError> {
        self.request("eth_getBlockByNumber", json!([block, full_transactions])).await
    }

    /// Latest block header with transaction hashes.
    pub async fn latest_block(&self) -> Result<RpcBlock, RpcError> {
        self.block_by_number(BlockNumberOrTag::LATEST, false)
            .await?
            .ok_or_else(|| RpcError::MissingResult("eth_getBlockByNumber".to_string()))
    }

    /// `eth_getBalance`.
    pub async fn balance(&self, address: Address, block: BlockNumberOrTag) -> Result<U256, RpcError> {
        self.request("eth_getBalance", json!([address, block])).await
    }

    /// `eth_getTransactionCount`.
    pub async fn transaction_count(&self, address: Address, block: BlockNumberOrTag) -> Result<u64, RpcError> {
        self.request::<U64>("eth_getTransactionCount", json!([address, block])).await.map(|v| v.to())
    }

    /// `eth_getCode` at the latest block.
    pub async fn code(&self, address: Address) -> Result<Bytes, RpcError> {
        self.request("eth_getCode", json!([address, BlockNumberOrTag::LATEST])).await
    }

    /// `eth_estimateGas`.
    pub async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, RpcError> {
        self.request::<U64>("eth_estimateGas", json!([request])).await.map(|v| v.to())
    }

    /// `eth_call`.
    pub async fn call(&self, request: &CallRequest, block: BlockNumberOrTag) -> Result<Bytes, RpcError> {
        self.request("eth_call", json!([request, block])).await
    }

    /// `eth_sendRawTransaction`.
    pub async fn send_raw_transaction(&self, raw: &Bytes) -> Result<B256, RpcError> {
        self.request("eth_sendRawTransaction", json!([raw])).await
    }

    /// `eth_getTransactionReceipt`; `None` while the transaction is not mined.
    pub async fn transaction_receipt(&self, hash: B256) -> Result<Option<RpcTransactionReceipt>, RpcError> {
        self.request("eth_getTransactionReceipt", json!([hash])).await
    }

    /// `eth_getTransactionByHash`.
    pub async fn transaction_by_hash(&self, hash: B256) -> Result<Option<RpcTransaction>, RpcError> {
        self.request("eth_getTransactionByHash", json!([hash])).await
    }

    /// `eth_getLogs`.
    pub async fn logs(&self, filter: &LogFilter) -> Result<Vec<RpcLog>, RpcError> {
        self.request("eth_getLogs", json!([filter])).await
    }

    /// `txpool_status`.
    pub async fn txpool_status(&self) -> Result<TxpoolStatus, RpcError> {
        self.request("txpool_status", json!([])).await
    }

    /// `eth_checkPreconfStatus`.
    pub async fn check_preconf_status(&self, hash: B256) -> Result<bool, RpcError> {
        self.request("eth_checkPreconfStatus", json!([hash])).await
    }

    /// `eth_getBlockReceipts`.
    pub async fn block_receipts(&self, block: BlockNumberOrTag) -> Result<Option<Vec<RpcTransactionReceipt>>, RpcError> {
        self.request("eth_getBlockReceipts", json!([block])).await
    }

    /// Fetches the inclusive range `[from, to]` with batched `eth_getBlockByNumber`, `page_size`
    /// blocks per batch. Missing blocks are skipped.
    pub async fn blocks_in_range(
        &self,
        from: u64,
        to: u64,
        page_size: u64,
        full_transactions: bool,
    ) -> Result<Vec<RpcBlock>, RpcError> {
        let page_size = page_size.max(1);
        let mut blocks = Vec::new();
        let mut start = from;
        while start <= to {
            let end = to.min(start.saturating_add(page_size - 1));
            let requests: Vec<_> = (start..=end)
                .map(|n| BatchRequest::new("eth_getBlockByNumber", json!([BlockNumberOrTag::from(n), full_transactions])))
                .collect();
            for entry in self.batch(&requests).await? {
                if let Some(block) = Self::decode_batch_entry::<Option<RpcBlock>>("eth_getBlockByNumber", entry)? {
                    blocks.push(block);
                }
            }
            debug!(from = start, to = end, "Fetched block page");
            if end == u64::MAX {
                break;
            }
            start = end + 1;
        }
        Ok(blocks)
    }

    /// Receipts for every transaction of the given blocks.
    ///
    /// Uses `eth_getBlockReceipts` when the endpoint supports it, otherwise batched
    /// `eth_getTransactionReceipt` with `batch_size` hashes per batch. Empty results are dropped.
    pub async fn receipts_for_blocks(
        &self,
        blocks: &[RpcBlock],
        batch_size: usize,
    ) -> Result<Vec<RpcTransactionReceipt>, RpcError> {
        let batch_size = batch_size.max(1);
        let per_block = match self.block_receipts(BlockNumberOrTag::from(0)).await {
            Ok(_) => true,
            Err(err) if err.is_method_not_found() => false,
            Err(err) => {
                debug!(error = %err, "eth_getBlockReceipts probe failed, using per-transaction receipts");
                false
            }
        };

        let requests: Vec<BatchRequest> = if per_block {
            blocks
                .iter()
                .filter(|block| block.transaction_count() > 0)
                .map(|block| BatchRequest::new("eth_getBlockReceipts", json!([BlockNumberOrTag::from(block.number())])))
                .collect()
        } else {
            blocks
                .iter()
                .flat_map(RpcBlock::transaction_hashes)
                .map(|hash| BatchRequest::new("eth_getTransactionReceipt", json!([hash])))
                .collect()
        };

        let mut receipts = Vec::new();
        for chunk in requests.chunks(batch_size) {
            for entry in self.batch(chunk).await? {
                if per_block {
                    let found: Option<Vec<RpcTransactionReceipt>> =
                        Self::decode_batch_entry("eth_getBlockReceipts", entry)?;
                    receipts.extend(found.unwrap_or_default());
                } else if let Some(receipt) =
                    Self::decode_batch_entry::<Option<RpcTransactionReceipt>>("eth_getTransactionReceipt", entry)?
                {
                    receipts.push(receipt);
                }
            }
        }
        Ok(receipts)
    }
}

#[cfg(test)]
mod tests {
    use surge_primitives::{TRANSFER_GAS, Wallet};

    use super::*;
    use crate::test_utils::{MockNode, sign_transfer};

    #[tokio::test]
    async fn test_basic_queries() {
        let node = MockNode::start().await.expect("start");
        let client = node.client();
        assert_eq!(client.chain_id().await.expect("chain id"), node.chain_id());
        assert_eq!(client.block_number().await.expect("block number"), 0);
        assert!(client.latest_block().await.expect("block").base_fee_per_gas.is_some());
        assert_eq!(node.calls("eth_chainId"), 1);
    }

    #[tokio::test]
    async fn test_send_and_receipt() {
        let node = MockNode::start().await.expect("start");
        let client = node.client();
        let wallet = Wallet::from_seed(1);
        node.set_balance(wallet.address(), U256::from(10u64).pow(U256::from(18)));

        let tx = sign_transfer(&wallet, node.chain_id(), 0, Address::repeat_byte(9), U256::from(1)).expect("sign");
        let hash = client.send_raw_transaction(&tx.raw).await.expect("send");
        assert_eq!(hash, tx.hash);

        let receipt = client.transaction_receipt(hash).await.expect("receipt").expect("mined");
        assert!(receipt.is_success());
        assert_eq!(receipt.gas_used(), TRANSFER_GAS);
        assert_eq!(receipt.from, wallet.address());
        assert_eq!(
            client.transaction_count(wallet.address(), BlockNumberOrTag::PENDING).await.expect("nonce"),
            1
        );
        assert_eq!(client.block_number().await.expect("block number"), 1);
    }

    #[tokio::test]
    async fn test_rpc_error_surfaces() {
        let node = MockNode::start().await.expect("start");
        node.set_send_error(Some("nonce too low".to_string()));
        let wallet = Wallet::from_seed(2);
        let tx = sign_transfer(&wallet, node.chain_id(), 0, Address::ZERO, U256::ZERO).expect("sign");
        let err = node.client().send_raw_transaction(&tx.raw).await.unwrap_err();
        assert!(matches!(err, RpcError::Rpc { .. }));
        assert!(!err.submission_kind().is_reusable());
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let node = MockNode::start().await.expect("start");
        let client = node.client();
        let mut results = client
            .batch(&[
                BatchRequest::new("eth_blockNumber", json!([])),
                BatchRequest::new("eth_chainId", json!([])),
                BatchRequest::new("eth_unknownMethod", json!([])),
            ])
            .await
            .expect("batch");
        assert_eq!(results.len(), 3);
        assert!(results[2].as_ref().is_err_and(RpcError::is_method_not_found));
        let chain_id: U64 = RpcClient::decode_batch_entry("eth_chainId", results.remove(1)).expect("decode");
        assert_eq!(chain_id.to::<u64>(), node.chain_id());
    }

    #[tokio::test]
    async fn test_blocks_in_range_pages() {
        let node = MockNode::start().await.expect("start");
        for _ in 0..5 {
            node.mine_block();
        }
        let blocks = node.client().blocks_in_range(1, 5, 2, false).await.expect("range");
        assert_eq!(blocks.iter().map(RpcBlock::number).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(node.calls("eth_getBlockByNumber"), 5);
    }

    #[tokio::test]
    async fn test_receipts_for_blocks_fallback() {
        let node = MockNode::start().await.expect("start");
        let client = node.client();
        let wallet = Wallet::from_seed(3);
        node.set_balance(wallet.address(), U256::from(10u64).pow(U256::from(18)));
        for nonce in 0..3 {
            let tx = sign_transfer(&wallet, node.chain_id(), nonce, Address::repeat_byte(1), U256::from(1)).expect("sign");
            client.send_raw_transaction(&tx.raw).await.expect("send");
        }
        let blocks = client.blocks_in_range(1, 3, 10, false).await.expect("range");

        node.set_block_receipts_supported(false);
        let receipts = client.receipts_for_blocks(&blocks, 2).await.expect("receipts");
        assert_eq!(receipts.len(), 3);
        assert_eq!(node.calls("eth_getTransactionReceipt"), 3);

        node.set_block_receipts_supported(true);
        let receipts = client.receipts_for_blocks(&blocks, 2).await.expect("receipts");
        assert_eq!(receipts.len(), 3);
    }

    #[test]
    fn test_client_config_builders() {
        let config = ClientConfig::default().with_concurrency(8).with_timeout(Duration::from_secs(5));
        assert_eq!(config.pool_size, 16);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(RpcClient::with_config("http://127.0.0.1:8545", &config).is_ok());
    }
}
