//! In-process mock node for tests.
//!
//! [`MockNode`] serves the subset of the Ethereum JSON-RPC API that surge uses from an in-memory
//! chain. Accepted raw transactions have their sender recovered, bump the sender's nonce and, with
//! auto-mining on, land in a fresh block with a receipt. A transaction ahead of the sender's next
//! nonce waits, unmined, until the gap is filled.

use std::{
    collections::{BTreeMap, HashMap},
    net::SocketAddr,
    sync::Arc,
};

use alloy_consensus::{Transaction as _, TxEip1559, TxEnvelope};
use alloy_eips::eip2718::Decodable2718;
use alloy_primitives::{Address, B256, Bytes, TxKind, U64, U256, keccak256};
use jsonrpsee::{
    RpcModule,
    core::{RegisterMethodError, RpcResult},
    proc_macros::rpc,
    server::{Server, ServerHandle},
    types::ErrorObjectOwned,
};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use parking_lot::Mutex;
use surge_primitives::{GWEI, SignedTx, TRANSFER_GAS, Wallet, WalletError};
use thiserror::Error;
use tracing::debug;

use crate::{
    BlockNumberOrTag, BlockTag, BlockTransactions, CallRequest, ClientConfig, FeeHistory, LogFilter,
    RpcBlock, RpcClient, RpcError, RpcLog, RpcTransaction, RpcTransactionReceipt, TxpoolStatus,
    error::codes,
};

/// Chain id served by a fresh mock node.
pub const MOCK_CHAIN_ID: u64 = 1337;

/// Block gas limit of every mock block.
pub const MOCK_BLOCK_GAS_LIMIT: u64 = 30_000_000;

/// Gas estimate for calls that carry input data.
pub const MOCK_GAS_ESTIMATE: u64 = 100_000;

const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Errors starting a [`MockNode`].
#[derive(Debug, Error)]
pub enum MockNodeError {
    /// The server could not bind a local port.
    #[error("failed to bind mock node: {0}")]
    Bind(#[from] std::io::Error),
    /// A method could not be registered.
    #[error("failed to register mock methods: {0}")]
    Register(#[from] RegisterMethodError),
    /// The client for the node could not be built.
    #[error("failed to build client: {0}")]
    Client(#[from] RpcError),
}

/// Signs a 21 000 gas EIP-1559 transfer paying 2 gwei max fee and 1 gwei tip.
pub fn sign_transfer(
    wallet: &Wallet,
    chain_id: u64,
    nonce: u64,
    to: Address,
    value: U256,
) -> Result<SignedTx, WalletError> {
    wallet.sign_transaction(TxEip1559 {
        chain_id,
        nonce,
        gas_limit: TRANSFER_GAS,
        max_fee_per_gas: 2 * GWEI,
        max_priority_fee_per_gas: GWEI,
        to: TxKind::Call(to),
        value,
        access_list: Default::default(),
        input: Bytes::new(),
    })
}

#[derive(Debug)]
struct ChainState {
    chain_id: u64,
    base_fee: Option<u128>,
    gas_price: u128,
    priority_fee: u128,
    block_time: u64,
    estimate: u64,
    blocks: Vec<RpcBlock>,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    pending_nonces: HashMap<Address, u64>,
    code: HashMap<Address, Bytes>,
    call_results: HashMap<Address, Bytes>,
    transactions: HashMap<B256, RpcTransaction>,
    receipts: HashMap<B256, RpcTransactionReceipt>,
    submitted: Vec<TxEnvelope>,
    pool: Vec<B256>,
    queued: HashMap<Address, BTreeMap<u64, B256>>,
    logs: Vec<RpcLog>,
    auto_mine: bool,
    enforce_balances: bool,
    revert: bool,
    send_error: Option<String>,
    txpool: Option<TxpoolStatus>,
    block_receipts: bool,
    preconf: Option<bool>,
    calls: HashMap<String, u64>,
}

impl ChainState {
    fn new() -> Self {
        let genesis = RpcBlock {
            hash: keccak256(0u64.to_be_bytes()),
            timestamp: U64::from(GENESIS_TIMESTAMP),
            gas_limit: U64::from(MOCK_BLOCK_GAS_LIMIT),
            base_fee_per_gas: Some(U256::from(GWEI)),
            ..Default::default()
        };
        Self {
            chain_id: MOCK_CHAIN_ID,
            base_fee: Some(GWEI),
            gas_price: 2 * GWEI,
            priority_fee: GWEI,
            block_time: 2,
            estimate: MOCK_GAS_ESTIMATE,
            blocks: vec![genesis],
            balances: HashMap::new(),
            nonces: HashMap::new(),
            pending_nonces: HashMap::new(),
            code: HashMap::new(),
            call_results: HashMap::new(),
            transactions: HashMap::new(),
            receipts: HashMap::new(),
            submitted: Vec::new(),
            pool: Vec::new(),
            queued: HashMap::new(),
            logs: Vec::new(),
            auto_mine: true,
            enforce_balances: false,
            revert: false,
            send_error: None,
            txpool: None,
            block_receipts: true,
            preconf: Some(true),
            calls: HashMap::new(),
        }
    }

    fn head(&self) -> u64 {
        (self.blocks.len() - 1) as u64
    }

    fn resolve(&self, block: BlockNumberOrTag) -> Option<u64> {
        match block {
            BlockNumberOrTag::Number(n) => Some(n.to::<u64>()).filter(|n| *n <= self.head()),
            BlockNumberOrTag::Tag(BlockTag::Earliest) => Some(0),
            BlockNumberOrTag::Tag(_) => Some(self.head()),
        }
    }

    fn nonce(&self, address: Address, block: Option<BlockNumberOrTag>) -> u64 {
        let mined = self.nonces.get(&address).copied().unwrap_or_default();
        if block.is_some_and(|b| b.is_pending()) {
            self.pending_nonces.get(&address).copied().unwrap_or(mined).max(mined)
        } else {
            mined
        }
    }

    fn effective_gas_price(&self, envelope: &TxEnvelope) -> u128 {
        match self.base_fee {
            Some(base) if envelope.is_dynamic_fee() => {
                envelope.max_fee_per_gas().min(base + envelope.max_priority_fee_per_gas().unwrap_or_default())
            }
            _ => envelope.max_fee_per_gas(),
        }
    }

    fn submit(&mut self, raw: &Bytes) -> Result<B256, ErrorObjectOwned> {
        if let Some(message) = &self.send_error {
            return Err(rpc_error(codes::SERVER_ERROR, message.clone()));
        }
        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
            .map_err(|e| rpc_error(codes::INVALID_PARAMS, format!("invalid transaction: {e}")))?;
        let sender = recover_sender(&envelope)?;
        let hash = *envelope.tx_hash();
        if self.transactions.contains_key(&hash) {
            return Err(rpc_error(codes::SERVER_ERROR, "already known"));
        }
        let mined_nonce = self.nonce(sender, None);
        if envelope.nonce() < mined_nonce {
            return Err(rpc_error(
                codes::SERVER_ERROR,
                format!("nonce too low: next nonce {mined_nonce}, tx nonce {}", envelope.nonce()),
            ));
        }
        if self.enforce_balances {
            let balance = self.balances.get(&sender).copied().unwrap_or_default();
            let cost = envelope.value()
                + U256::from(envelope.gas_limit()) * U256::from(envelope.max_fee_per_gas());
            if cost > balance {
                return Err(rpc_error(
                    codes::SERVER_ERROR,
                    format!(
                        "insufficient funds for gas * price + value: balance {balance}, tx cost {cost}, overshot {}",
                        cost - balance
                    ),
                ));
            }
        }

        let next_nonce = self.nonce(sender, Some(BlockNumberOrTag::PENDING));
        self.transactions.insert(
            hash,
            RpcTransaction {
                hash,
                nonce: U64::from(envelope.nonce()),
                from: sender,
                to: envelope.to(),
                value: envelope.value(),
                gas: U64::from(envelope.gas_limit()),
                gas_price: envelope.gas_price().map(U256::from),
                max_fee_per_gas: envelope.is_dynamic_fee().then(|| U256::from(envelope.max_fee_per_gas())),
                max_priority_fee_per_gas: envelope.max_priority_fee_per_gas().map(U256::from),
                input: envelope.input().clone(),
                tx_type: U64::from(u8::from(envelope.tx_type())),
                chain_id: envelope.chain_id().map(U64::from),
                ..Default::default()
            },
        );
        let nonce = envelope.nonce();
        self.submitted.push(envelope);
        if nonce > next_nonce {
            self.queued.entry(sender).or_default().insert(nonce, hash);
            debug!(%hash, %sender, nonce, next_nonce, "Mock node queued transaction behind a nonce gap");
            return Ok(hash);
        }
        self.pool.push(hash);
        self.promote(sender, nonce + 1);
        debug!(%hash, %sender, "Mock node accepted transaction");
        if self.auto_mine {
            self.mine();
        }
        Ok(hash)
    }

    /// Moves queued transactions of `sender` into the pool while their nonces are contiguous.
    fn promote(&mut self, sender: Address, mut next: u64) {
        if let Some(queued) = self.queued.get_mut(&sender) {
            while let Some(hash) = queued.remove(&next) {
                self.pool.push(hash);
                next += 1;
            }
        }
        let pending = self.pending_nonces.entry(sender).or_default();
        *pending = (*pending).max(next);
    }

    fn mine(&mut self) -> u64 {
        let number = self.head() + 1;
        let parent = self.blocks.last().cloned().unwrap_or_default();
        let block_hash = keccak256(number.to_be_bytes());
        let hashes: Vec<B256> = std::mem::take(&mut self.pool);
        let mut cumulative = 0u64;

        for (index, hash) in hashes.iter().enumerate() {
            let Some(envelope) = self.submitted.iter().find(|e| e.tx_hash() == hash).cloned() else {
                continue;
            };
            let Some(tx) = self.transactions.get_mut(hash) else { continue };
            tx.block_hash = Some(block_hash);
            tx.block_number = Some(U64::from(number));
            let (sender, to, value, nonce) = (tx.from, tx.to, tx.value, tx.nonce());

            let gas_used = if envelope.input().is_empty() && to.is_some() {
                TRANSFER_GAS
            } else {
                envelope.gas_limit().min(self.estimate).max(TRANSFER_GAS)
            };
            cumulative += gas_used;
            let price = self.effective_gas_price(&envelope);
            let fee = U256::from(gas_used) * U256::from(price);

            let sender_balance = self.balances.entry(sender).or_default();
            *sender_balance = sender_balance.saturating_sub(value + fee);
            let contract_address = match to {
                Some(to) => {
                    let balance = self.balances.entry(to).or_default();
                    *balance = balance.saturating_add(value);
                    None
                }
                None => {
                    let created = sender.create(nonce);
                    self.code.insert(created, envelope.input().clone());
                    Some(created)
                }
            };
            let mined = self.nonces.entry(sender).or_default();
            *mined = (*mined).max(nonce + 1);

            self.receipts.insert(
                *hash,
                RpcTransactionReceipt {
                    transaction_hash: *hash,
                    transaction_index: U64::from(index),
                    block_hash,
                    block_number: U64::from(number),
                    from: sender,
                    to,
                    cumulative_gas_used: U64::from(cumulative),
                    gas_used: U64::from(gas_used),
                    contract_address,
                    tx_type: U64::from(u8::from(envelope.tx_type())),
                    status: U64::from(u8::from(!self.revert)),
                    effective_gas_price: U256::from(price),
                    ..Default::default()
                },
            );
        }

        self.blocks.push(RpcBlock {
            hash: block_hash,
            parent_hash: parent.hash,
            number: U64::from(number),
            timestamp: U64::from(parent.timestamp() + self.block_time),
            gas_limit: U64::from(MOCK_BLOCK_GAS_LIMIT),
            gas_used: U64::from(cumulative),
            base_fee_per_gas: self.base_fee.map(U256::from),
            miner: Address::ZERO,
            transactions: BlockTransactions::Hashes(hashes),
        });
        number
    }

    fn block(&self, block: BlockNumberOrTag, full: bool) -> Option<RpcBlock> {
        let number = self.resolve(block)?;
        let mut block = self.blocks.get(number as usize)?.clone();
        if full {
            let txs = block
                .transaction_hashes()
                .iter()
                .filter_map(|hash| self.transactions.get(hash).cloned())
                .collect();
            block.transactions = BlockTransactions::Full(txs);
        }
        Some(block)
    }
}

fn rpc_error(code: i64, message: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code as i32, message.into(), None::<()>)
}

fn recover_sender(envelope: &TxEnvelope) -> Result<Address, ErrorObjectOwned> {
    let invalid = || rpc_error(codes::INVALID_PARAMS, "invalid signature");
    let signature = envelope.signature();
    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&signature.r().to_be_bytes::<32>());
    sig_bytes[32..].copy_from_slice(&signature.s().to_be_bytes::<32>());
    let sig = Signature::from_slice(&sig_bytes).map_err(|_| invalid())?;
    let recovery_id = RecoveryId::try_from(u8::from(signature.v())).map_err(|_| invalid())?;
    let signing_hash = envelope.signature_hash();
    let key = VerifyingKey::recover_from_prehash(signing_hash.as_slice(), &sig, recovery_id)
        .map_err(|_| invalid())?;
    let encoded = key.to_encoded_point(false);
    Ok(Address::from_slice(&keccak256(&encoded.as_bytes()[1..])[12..]))
}

#[rpc(server, namespace = "eth")]
trait MockEth {
    #[method(name = "chainId")]
    async fn chain_id(&self) -> RpcResult<U64>;

    #[method(name = "blockNumber")]
    async fn block_number(&self) -> RpcResult<U64>;

    #[method(name = "gasPrice")]
    async fn gas_price(&self) -> RpcResult<U256>;

    #[method(name = "maxPriorityFeePerGas")]
    async fn max_priority_fee_per_gas(&self) -> RpcResult<U256>;

    #[method(name = "feeHistory")]
    async fn fee_history(
        &self,
        block_count: U64,
        newest_block: BlockNumberOrTag,
        reward_percentiles: Option<Vec<f64>>,
    ) -> RpcResult<FeeHistory>;

    #[method(name = "getBlockByNumber")]
    async fn get_block_by_number(&self, block: BlockNumberOrTag, full: bool) -> RpcResult<Option<RpcBlock>>;

    #[method(name = "getBalance")]
    async fn get_balance(&self, address: Address, block: Option<BlockNumberOrTag>) -> RpcResult<U256>;

    #[method(name = "getTransactionCount")]
    async fn get_transaction_count(&self, address: Address, block: Option<BlockNumberOrTag>) -> RpcResult<U64>;

    #[method(name = "getCode")]
    async fn get_code(&self, address: Address, block: Option<BlockNumberOrTag>) -> RpcResult<Bytes>;

    #[method(name = "estimateGas")]
    async fn estimate_gas(&self, request: CallRequest, block: Option<BlockNumberOrTag>) -> RpcResult<U64>;

    #[method(name = "call")]
    async fn call(&self, request: CallRequest, block: Option<BlockNumberOrTag>) -> RpcResult<Bytes>;

    #[method(name = "sendRawTransaction")]
    async fn send_raw_transaction(&self, data: Bytes) -> RpcResult<B256>;

    #[method(name = "getTransactionReceipt")]
    async fn get_transaction_receipt(&self, hash: B256) -> RpcResult<Option<RpcTransactionReceipt>>;

    #[method(name = "getTransactionByHash")]
    async fn get_transaction_by_hash(&self, hash: B256) -> RpcResult<Option<RpcTransaction>>;

    #[method(name = "getLogs")]
    async fn get_logs(&self, filter: LogFilter) -> RpcResult<Vec<RpcLog>>;

    #[method(name = "getBlockReceipts")]
    async fn get_block_receipts(&self, block: BlockNumberOrTag) -> RpcResult<Option<Vec<RpcTransactionReceipt>>>;

    #[method(name = "checkPreconfStatus")]
    async fn check_preconf_status(&self, hash: B256) -> RpcResult<bool>;
}

#[rpc(server, namespace = "txpool")]
trait MockTxpool {
    #[method(name = "status")]
    async fn status(&self) -> RpcResult<TxpoolStatus>;
}

#[derive(Debug, Clone)]
struct MockApi {
    state: Arc<Mutex<ChainState>>,
}

impl MockApi {
    fn hit(&self, method: &str) -> parking_lot::MutexGuard<'_, ChainState> {
        let mut state = self.state.lock();
        *state.calls.entry(method.to_string()).or_default() += 1;
        state
    }
}

#[jsonrpsee::core::async_trait]
impl MockEthServer for MockApi {
    async fn chain_id(&self) -> RpcResult<U64> {
        Ok(U64::from(self.hit("eth_chainId").chain_id))
    }

    async fn block_number(&self) -> RpcResult<U64> {
        Ok(U64::from(self.hit("eth_blockNumber").head()))
    }

    async fn gas_price(&self) -> RpcResult<U256> {
        Ok(U256::from(self.hit("eth_gasPrice").gas_price))
    }

    async fn max_priority_fee_per_gas(&self) -> RpcResult<U256> {
        Ok(U256::from(self.hit("eth_maxPriorityFeePerGas").priority_fee))
    }

    async fn fee_history(
        &self,
        block_count: U64,
        newest_block: BlockNumberOrTag,
        reward_percentiles: Option<Vec<f64>>,
    ) -> RpcResult<FeeHistory> {
        let state = self.hit("eth_feeHistory");
        let newest = state.resolve(newest_block).unwrap_or_else(|| state.head());
        let count = block_count.to::<u64>().min(newest + 1).max(1);
        let base_fee = U256::from(state.base_fee.unwrap_or_default());
        let tip = U256::from(state.priority_fee);
        Ok(FeeHistory {
            base_fee_per_gas: vec![base_fee; count as usize + 1],
            gas_used_ratio: vec![0.5; count as usize],
            oldest_block: U64::from(newest + 1 - count),
            reward: reward_percentiles.map(|p| vec![vec![tip; p.len()]; count as usize]),
        })
    }

    async fn get_block_by_number(&self, block: BlockNumberOrTag, full: bool) -> RpcResult<Option<RpcBlock>> {
        Ok(self.hit("eth_getBlockByNumber").block(block, full))
    }

    async fn get_balance(&self, address: Address, _block: Option<BlockNumberOrTag>) -> RpcResult<U256> {
        Ok(self.hit("eth_getBalance").balances.get(&address).copied().unwrap_or_default())
    }

    async fn get_transaction_count(&self, address: Address, block: Option<BlockNumberOrTag>) -> RpcResult<U64> {
        Ok(U64::from(self.hit("eth_getTransactionCount").nonce(address, block)))
    }

    async fn get_code(&self, address: Address, _block: Option<BlockNumberOrTag>) -> RpcResult<Bytes> {
        Ok(self.hit("eth_getCode").code.get(&address).cloned().unwrap_or_default())
    }

    async fn estimate_gas(&self, request: CallRequest, _block: Option<BlockNumberOrTag>) -> RpcResult<U64> {
        let state = self.hit("eth_estimateGas");
        if request.input_data().is_empty() && request.to.is_some() {
            return Ok(U64::from(TRANSFER_GAS));
        }
        Ok(U64::from(state.estimate))
    }

    async fn call(&self, request: CallRequest, _block: Option<BlockNumberOrTag>) -> RpcResult<Bytes> {
        let state = self.hit("eth_call");
        let result = request.to.and_then(|to| state.call_results.get(&to).cloned());
        Ok(result.unwrap_or_else(|| Bytes::from(U256::from(1).to_be_bytes::<32>().to_vec())))
    }

    async fn send_raw_transaction(&self, data: Bytes) -> RpcResult<B256> {
        self.hit("eth_sendRawTransaction").submit(&data)
    }

    async fn get_transaction_receipt(&self, hash: B256) -> RpcResult<Option<RpcTransactionReceipt>> {
        Ok(self.hit("eth_getTransactionReceipt").receipts.get(&hash).cloned())
    }

    async fn get_transaction_by_hash(&self, hash: B256) -> RpcResult<Option<RpcTransaction>> {
        Ok(self.hit("eth_getTransactionByHash").transactions.get(&hash).cloned())
    }

    async fn get_logs(&self, filter: LogFilter) -> RpcResult<Vec<RpcLog>> {
        let state = self.hit("eth_getLogs");
        let from = filter.from_block.and_then(|b| state.resolve(b)).unwrap_or_default();
        let to = filter.to_block.and_then(|b| state.resolve(b)).unwrap_or_else(|| state.head());
        Ok(state
            .logs
            .iter()
            .filter(|log| {
                let number = log.block_number.map(|n| n.to::<u64>()).unwrap_or_default();
                (from..=to).contains(&number)
                    && (filter.address.is_empty() || filter.address.contains(&log.address))
            })
            .cloned()
            .collect())
    }

    async fn get_block_receipts(&self, block: BlockNumberOrTag) -> RpcResult<Option<Vec<RpcTransactionReceipt>>> {
        let state = self.hit("eth_getBlockReceipts");
        if !state.block_receipts {
            return Err(rpc_error(codes::METHOD_NOT_FOUND, "the method eth_getBlockReceipts does not exist"));
        }
        Ok(state.block(block, false).map(|b| {
            b.transaction_hashes().iter().filter_map(|hash| state.receipts.get(hash).cloned()).collect()
        }))
    }

    async fn check_preconf_status(&self, hash: B256) -> RpcResult<bool> {
        let state = self.hit("eth_checkPreconfStatus");
        match state.preconf {
            Some(status) => Ok(status && state.transactions.contains_key(&hash)),
            None => Err(rpc_error(codes::METHOD_NOT_FOUND, "the method eth_checkPreconfStatus does not exist")),
        }
    }
}

#[jsonrpsee::core::async_trait]
impl MockTxpoolServer for MockApi {
    async fn status(&self) -> RpcResult<TxpoolStatus> {
        self.hit("txpool_status")
            .txpool
            .ok_or_else(|| rpc_error(codes::METHOD_NOT_FOUND, "the method txpool_status does not exist"))
    }
}

/// In-process JSON-RPC node backed by an in-memory chain.
#[derive(Debug)]
pub struct MockNode {
    state: Arc<Mutex<ChainState>>,
    addr: SocketAddr,
    handle: ServerHandle,
    client: RpcClient,
}

impl MockNode {
    /// Starts a node on an ephemeral local port with auto-mining on.
    pub async fn start() -> Result<Self, MockNodeError> {
        let state = Arc::new(Mutex::new(ChainState::new()));
        let server = Server::builder().build("127.0.0.1:0").await?;
        let addr = server.local_addr()?;

        let api = MockApi { state: state.clone() };
        let mut module = RpcModule::new(());
        module.merge(MockEthServer::into_rpc(api.clone()))?;
        module.merge(MockTxpoolServer::into_rpc(api))?;
        let handle = server.start(module);

        let client = RpcClient::with_config(format!("http://{addr}"), &ClientConfig::default())?;
        debug!(%addr, "Mock node started");
        Ok(Self { state, addr, handle, client })
    }

    /// HTTP URL of the node.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client connected to the node.
    pub fn client(&self) -> RpcClient {
        self.client.clone()
    }

    /// Chain id served by `eth_chainId`.
    pub fn chain_id(&self) -> u64 {
        self.state.lock().chain_id
    }

    /// Number of calls received for a method, e.g. `eth_chainId`.
    pub fn calls(&self, method: &str) -> u64 {
        self.state.lock().calls.get(method).copied().unwrap_or_default()
    }

    /// Latest block number.
    pub fn block_number(&self) -> u64 {
        self.state.lock().head()
    }

    /// Mines the pending pool into a new block and returns its number.
    pub fn mine_block(&self) -> u64 {
        self.state.lock().mine()
    }

    /// Every accepted transaction, in submission order.
    pub fn submitted(&self) -> Vec<TxEnvelope> {
        self.state.lock().submitted.clone()
    }

    /// Current balance of an account.
    pub fn balance(&self, address: Address) -> U256 {
        self.state.lock().balances.get(&address).copied().unwrap_or_default()
    }

    /// Mined nonce of an account.
    pub fn nonce(&self, address: Address) -> u64 {
        self.state.lock().nonce(address, None)
    }

    /// Sets an account balance.
    pub fn set_balance(&self, address: Address, balance: U256) {
        self.state.lock().balances.insert(address, balance);
    }

    /// Sets the mined and pending nonce of an account.
    pub fn set_nonce(&self, address: Address, nonce: u64) {
        let mut state = self.state.lock();
        state.nonces.insert(address, nonce);
        state.pending_nonces.insert(address, nonce);
    }

    /// Sets the pending nonce only, as if transactions were waiting in the pool.
    pub fn set_pending_nonce(&self, address: Address, nonce: u64) {
        self.state.lock().pending_nonces.insert(address, nonce);
    }

    /// Installs code at an address.
    pub fn set_code(&self, address: Address, code: Bytes) {
        self.state.lock().code.insert(address, code);
    }

    /// Sets the `eth_call` return data for calls to an address; the default is the word `1`.
    pub fn set_call_result(&self, address: Address, result: Bytes) {
        self.state.lock().call_results.insert(address, result);
    }

    /// Base fee of new blocks; `None` makes the chain pre-London.
    pub fn set_base_fee(&self, base_fee: Option<u128>) {
        let mut state = self.state.lock();
        state.base_fee = base_fee;
        if let Some(head) = state.blocks.last_mut() {
            head.base_fee_per_gas = base_fee.map(U256::from);
        }
    }

    /// Value returned by `eth_gasPrice`.
    pub fn set_gas_price(&self, gas_price: u128) {
        self.state.lock().gas_price = gas_price;
    }

    /// Value returned by `eth_maxPriorityFeePerGas`.
    pub fn set_priority_fee(&self, priority_fee: u128) {
        self.state.lock().priority_fee = priority_fee;
    }

    /// Gas estimate for calls with input data.
    pub fn set_estimate_gas(&self, estimate: u64) {
        self.state.lock().estimate = estimate;
    }

    /// Seconds between consecutive block timestamps.
    pub fn set_block_time(&self, seconds: u64) {
        self.state.lock().block_time = seconds;
    }

    /// Whether each accepted transaction is mined immediately.
    pub fn set_auto_mine(&self, auto_mine: bool) {
        self.state.lock().auto_mine = auto_mine;
    }

    /// Whether submissions are checked against the sender's balance.
    pub fn set_enforce_balances(&self, enforce: bool) {
        self.state.lock().enforce_balances = enforce;
    }

    /// Whether mined receipts report failure.
    pub fn set_revert(&self, revert: bool) {
        self.state.lock().revert = revert;
    }

    /// Error message returned by every `eth_sendRawTransaction`, or `None` to accept.
    pub fn set_send_error(&self, message: Option<String>) {
        self.state.lock().send_error = message;
    }

    /// `txpool_status` response, or `None` to report the method as unavailable.
    pub fn set_txpool_status(&self, status: Option<TxpoolStatus>) {
        self.state.lock().txpool = status;
    }

    /// Whether `eth_getBlockReceipts` is available.
    pub fn set_block_receipts_supported(&self, supported: bool) {
        self.state.lock().block_receipts = supported;
    }

    /// `eth_checkPreconfStatus` answer for known transactions, or `None` for unavailable.
    pub fn set_preconf_status(&self, status: Option<bool>) {
        self.state.lock().preconf = status;
    }

    /// Adds a log served by `eth_getLogs`.
    pub fn push_log(&self, log: RpcLog) {
        self.state.lock().logs.push(log);
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        let _ = self.handle.stop();
    }
}

#[cfg(test)]
mod tests {
    use alloy_consensus::TxLegacy;

    use super::*;

    #[tokio::test]
    async fn test_recovers_sender_and_tracks_nonces() {
        let node = MockNode::start().await.expect("start");
        let wallet = Wallet::from_seed(9);
        node.set_auto_mine(false);
        let tx = sign_transfer(&wallet, MOCK_CHAIN_ID, 0, Address::repeat_byte(1), U256::from(1)).expect("sign");
        node.client().send_raw_transaction(&tx.raw).await.expect("send");

        let client = node.client();
        assert_eq!(client.transaction_count(wallet.address(), BlockNumberOrTag::PENDING).await.expect("nonce"), 1);
        assert_eq!(client.transaction_count(wallet.address(), BlockNumberOrTag::LATEST).await.expect("nonce"), 0);
        assert!(client.transaction_receipt(tx.hash).await.expect("receipt").is_none());

        assert_eq!(node.mine_block(), 1);
        assert_eq!(node.nonce(wallet.address()), 1);
        let receipt = client.transaction_receipt(tx.hash).await.expect("receipt").expect("mined");
        assert_eq!(receipt.from, wallet.address());
    }

    #[tokio::test]
    async fn test_rejects_duplicates_and_low_nonces() {
        let node = MockNode::start().await.expect("start");
        let wallet = Wallet::from_seed(10);
        let client = node.client();
        let tx = sign_transfer(&wallet, MOCK_CHAIN_ID, 0, Address::ZERO, U256::ZERO).expect("sign");
        client.send_raw_transaction(&tx.raw).await.expect("send");
        let err = client.send_raw_transaction(&tx.raw).await.unwrap_err();
        assert!(err.to_string().contains("already known"));

        let stale = sign_transfer(&wallet, MOCK_CHAIN_ID, 0, Address::repeat_byte(2), U256::ZERO).expect("sign");
        let err = client.send_raw_transaction(&stale.raw).await.unwrap_err();
        assert!(err.to_string().contains("nonce too low"));
    }

    #[tokio::test]
    async fn test_out_of_order_nonces_wait_for_gap() {
        let node = MockNode::start().await.expect("start");
        let wallet = Wallet::from_seed(12);
        let client = node.client();
        let first = sign_transfer(&wallet, MOCK_CHAIN_ID, 0, Address::repeat_byte(1), U256::ZERO).expect("sign");
        let second = sign_transfer(&wallet, MOCK_CHAIN_ID, 1, Address::repeat_byte(1), U256::ZERO).expect("sign");

        client.send_raw_transaction(&second.raw).await.expect("send");
        assert!(client.transaction_receipt(second.hash).await.expect("receipt").is_none());
        assert_eq!(node.nonce(wallet.address()), 0);

        client.send_raw_transaction(&first.raw).await.expect("send");
        assert_eq!(node.nonce(wallet.address()), 2);
        assert!(client.transaction_receipt(second.hash).await.expect("receipt").is_some());
    }

    #[tokio::test]
    async fn test_overshot_error_when_balances_enforced() {
        let node = MockNode::start().await.expect("start");
        node.set_enforce_balances(true);
        let wallet = Wallet::from_seed(11);
        node.set_balance(wallet.address(), U256::from(100));
        let tx = sign_transfer(&wallet, MOCK_CHAIN_ID, 0, Address::ZERO, U256::from(50)).expect("sign");
        let err = node.client().send_raw_transaction(&tx.raw).await.unwrap_err();
        let cost = U256::from(50) + U256::from(TRANSFER_GAS) * U256::from(2 * GWEI);
        assert_eq!(err.overshot(), Some(cost - U256::from(100)));
    }

    #[tokio::test]
    async fn test_contract_creation_installs_code() {
        let node = MockNode::start().await.expect("start");
        let wallet = Wallet::from_seed(12);
        let tx = TxLegacy {
            chain_id: Some(MOCK_CHAIN_ID),
            nonce: 0,
            gas_price: GWEI,
            gas_limit: 500_000,
            to: TxKind::Create,
            value: U256::ZERO,
            input: Bytes::from_static(&[0x60, 0x00]),
        };
        let signed = wallet.sign_transaction(tx).expect("sign");
        let client = node.client();
        client.send_raw_transaction(&signed.raw).await.expect("send");
        let receipt = client.transaction_receipt(signed.hash).await.expect("receipt").expect("mined");
        let created = receipt.contract_address.expect("created");
        assert_eq!(created, wallet.address().create(0));
        assert!(!client.code(created).await.expect("code").is_empty());
    }

    #[tokio::test]
    async fn test_optional_methods() {
        let node = MockNode::start().await.expect("start");
        let client = node.client();
        assert!(client.txpool_status().await.unwrap_err().is_method_not_found());
        node.set_txpool_status(Some(TxpoolStatus { pending: U64::from(3), queued: U64::from(1) }));
        assert_eq!(client.txpool_status().await.expect("status").depth(), 4);

        node.set_preconf_status(None);
        assert!(client.check_preconf_status(B256::ZERO).await.unwrap_err().is_method_not_found());
    }

    #[tokio::test]
    async fn test_fee_history_and_legacy_chain() {
        let node = MockNode::start().await.expect("start");
        let client = node.client();
        let history = client.fee_history(5, BlockNumberOrTag::LATEST, &[50.0]).await.expect("history");
        assert_eq!(history.latest_base_fee(), Some(U256::from(GWEI)));
        node.set_base_fee(None);
        assert!(client.latest_block().await.expect("block").base_fee_per_gas.is_none());
    }
}
