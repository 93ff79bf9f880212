//! Shared state handed to every mode, and the one place requests leave the process.

use std::{
    io::Write as _,
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

use parking_lot::Mutex;
use rand::{Rng, SeedableRng as _, rngs::StdRng};
use surge_config::Config;
use surge_primitives::{Address, B256, Bytes, GasPricing, Sample, SignedTx, TxKind, TxOptions, U256};
use surge_rpc::{BlockNumberOrTag, CallRequest, RpcClient};
use tracing::trace;

use crate::ModeError;

/// Addresses of the contracts modes call, deployed or configured before the run starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContractAddresses {
    /// The load test contract.
    pub load_tester: Option<Address>,
    /// The ERC-20 token.
    pub erc20: Option<Address>,
    /// The ERC-721 collection.
    pub erc721: Option<Address>,
}

impl ContractAddresses {
    /// Addresses configured up front.
    pub const fn from_config(config: &Config) -> Self {
        Self {
            load_tester: config.contracts.load_tester_address,
            erc20: config.contracts.erc20_address,
            erc721: config.contracts.erc721_address,
        }
    }

    /// The load test contract, or [`ModeError::MissingContract`].
    pub fn load_tester(&self) -> Result<Address, ModeError> {
        self.load_tester.ok_or(ModeError::MissingContract("load test"))
    }

    /// The ERC-20 token, or [`ModeError::MissingContract`].
    pub fn erc20(&self) -> Result<Address, ModeError> {
        self.erc20.ok_or(ModeError::MissingContract("ERC-20"))
    }

    /// The ERC-721 collection, or [`ModeError::MissingContract`].
    pub fn erc721(&self) -> Result<Address, ModeError> {
        self.erc721.ok_or(ModeError::MissingContract("ERC-721"))
    }
}

/// How a built transaction is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Sign and submit with `eth_sendRawTransaction`.
    Send,
    /// Execute with `eth_call` and discard the result.
    CallOnly,
    /// Sign and print the raw transaction without submitting it.
    RawOutput,
}

impl Dispatch {
    /// Delivery selected by the configuration. Call-only wins over raw output.
    pub const fn from_config(config: &Config) -> Self {
        if config.call_only {
            Self::CallOnly
        } else if config.transaction.output_raw_tx_only {
            Self::RawOutput
        } else {
            Self::Send
        }
    }
}

/// Destination of raw transactions in [`Dispatch::RawOutput`].
#[derive(Debug, Clone, Default)]
pub enum RawSink {
    /// One `0x` prefixed transaction per line on stdout.
    #[default]
    Stdout,
    /// Collected in memory.
    Memory(Arc<Mutex<Vec<String>>>),
}

impl RawSink {
    fn write(&self, raw: String) -> Result<(), ModeError> {
        match self {
            Self::Stdout => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{raw}")?;
            }
            Self::Memory(lines) => lines.lock().push(raw),
        }
        Ok(())
    }
}

/// Target and input of a transaction a mode wants delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// Recipient, or contract creation.
    pub to: TxKind,
    /// Calldata or creation bytecode.
    pub input: Bytes,
}

impl TxRequest {
    /// A call to `to`.
    pub const fn call(to: Address, input: Bytes) -> Self {
        Self { to: TxKind::Call(to), input }
    }

    /// A contract creation.
    pub const fn create(bytecode: Bytes) -> Self {
        Self { to: TxKind::Create, input: bytecode }
    }
}

/// Outcome of one request.
#[derive(Debug)]
pub struct Execution {
    /// Wall-clock start of the timed round trip.
    pub started_at: SystemTime,
    /// Duration of the round trip. Signing and gas estimation are not included.
    pub wait: Duration,
    /// Hash of the submitted or printed transaction.
    pub tx_hash: Option<B256>,
    /// Whether the request succeeded.
    pub result: Result<(), ModeError>,
}

impl Execution {
    /// A request that failed before reaching the endpoint.
    pub fn failed(err: impl Into<ModeError>) -> Self {
        Self { started_at: SystemTime::now(), wait: Duration::ZERO, tx_hash: None, result: Err(err.into()) }
    }

    fn timed(started_at: SystemTime, start: Instant, tx_hash: Option<B256>, result: Result<(), ModeError>) -> Self {
        Self { started_at, wait: start.elapsed(), tx_hash, result }
    }

    /// Whether the request failed.
    pub const fn is_error(&self) -> bool {
        self.result.is_err()
    }

    /// The sample recorded for this execution.
    pub fn to_sample(&self, worker_id: u64, request_id: u64, nonce: u64) -> Sample {
        Sample {
            worker_id,
            request_id,
            started_at: self.started_at,
            wait: self.wait,
            tx_hash: self.tx_hash,
            is_error: self.is_error(),
            nonce,
        }
    }
}

/// Everything a mode needs to build and deliver requests.
#[derive(Debug)]
pub struct ModeContext {
    client: RpcClient,
    config: Arc<Config>,
    contracts: ContractAddresses,
    dispatch: Dispatch,
    raw_sink: RawSink,
    rng: Mutex<StdRng>,
}

impl ModeContext {
    /// Creates a context seeded from the configuration.
    pub fn new(client: RpcClient, config: Arc<Config>, contracts: ContractAddresses) -> Self {
        let dispatch = Dispatch::from_config(&config);
        let rng = Mutex::new(StdRng::seed_from_u64(config.seed));
        Self { client, config, contracts, dispatch, raw_sink: RawSink::default(), rng }
    }

    /// Replaces the raw transaction sink.
    #[must_use]
    pub fn with_raw_sink(mut self, raw_sink: RawSink) -> Self {
        self.raw_sink = raw_sink;
        self
    }

    /// The endpoint client.
    pub const fn client(&self) -> &RpcClient {
        &self.client
    }

    /// The run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Contract addresses.
    pub const fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    /// Delivery mode.
    pub const fn dispatch(&self) -> Dispatch {
        self.dispatch
    }

    /// Runs `f` with the shared seeded generator.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        f(&mut self.rng.lock())
    }

    /// Recipient for transfers and mints: the configured address, or a fresh random one.
    pub fn recipient(&self) -> Address {
        if self.config.transaction.random_recipients {
            self.with_rng(random_address)
        } else {
            self.config.transaction.to_address
        }
    }

    /// Builds, signs, and delivers a transaction according to [`Dispatch`].
    ///
    /// A zero gas limit is filled by `eth_estimateGas` first, except in call-only where the
    /// node picks the gas itself.
    pub async fn dispatch_tx(&self, mut opts: TxOptions, request: TxRequest) -> Execution {
        if self.dispatch == Dispatch::CallOnly {
            let call = call_request(&opts, &request);
            return self.timed_call(&call, BlockNumberOrTag::LATEST).await;
        }
        if opts.gas_limit == 0 {
            match self.client.estimate_gas(&call_request(&opts, &request)).await {
                Ok(gas) => opts.gas_limit = gas,
                Err(err) => return Execution::failed(err),
            }
        }
        match opts.sign(request.to, request.input) {
            Ok(signed) => self.send_signed(signed).await,
            Err(err) => Execution::failed(err),
        }
    }

    /// [`Self::dispatch_tx`] for a request whose construction may have failed.
    pub async fn try_dispatch(&self, opts: TxOptions, request: Result<TxRequest, ModeError>) -> Execution {
        match request {
            Ok(request) => self.dispatch_tx(opts, request).await,
            Err(err) => Execution::failed(err),
        }
    }

    /// Delivers an already signed transaction, printing it in raw output mode.
    pub async fn send_signed(&self, signed: SignedTx) -> Execution {
        let started_at = SystemTime::now();
        let start = Instant::now();
        if self.dispatch == Dispatch::RawOutput {
            let result = self.raw_sink.write(signed.raw_hex());
            return Execution::timed(started_at, start, Some(signed.hash), result);
        }
        let result = self.client.send_raw_transaction(&signed.raw).await;
        trace!(hash = %signed.hash, ok = result.is_ok(), "Submitted transaction");
        match result {
            Ok(hash) => Execution::timed(started_at, start, Some(hash), Ok(())),
            Err(err) => Execution::timed(started_at, start, Some(signed.hash), Err(err.into())),
        }
    }

    /// Times one `eth_call`.
    pub async fn timed_call(&self, call: &CallRequest, block: BlockNumberOrTag) -> Execution {
        let started_at = SystemTime::now();
        let start = Instant::now();
        let result = self.client.call(call, block).await.map(drop).map_err(ModeError::from);
        Execution::timed(started_at, start, None, result)
    }

    /// Times an arbitrary read against the endpoint.
    pub async fn timed<F, T>(&self, read: F) -> Execution
    where
        F: std::future::Future<Output = Result<T, surge_rpc::RpcError>>,
    {
        let started_at = SystemTime::now();
        let start = Instant::now();
        let result = read.await.map(drop).map_err(ModeError::from);
        Execution::timed(started_at, start, None, result)
    }
}

/// A uniformly random address.
pub fn random_address<R: Rng + ?Sized>(rng: &mut R) -> Address {
    let mut bytes = [0u8; 20];
    rng.fill(&mut bytes[..]);
    Address::from(bytes)
}

/// `eth_call` and `eth_estimateGas` request mirroring the transaction `opts` would sign.
pub fn call_request(opts: &TxOptions, request: &TxRequest) -> CallRequest {
    let mut call = CallRequest {
        from: Some(opts.from()),
        to: request.to.to().copied(),
        value: Some(opts.value),
        input: Some(request.input.clone()),
        ..Default::default()
    };
    if opts.gas_limit > 0 {
        call = call.with_gas(opts.gas_limit);
    }
    match opts.pricing {
        GasPricing::Legacy { gas_price } if gas_price > 0 => call.gas_price = Some(U256::from(gas_price)),
        GasPricing::Legacy { .. } => {}
        GasPricing::Dynamic { max_fee_per_gas, max_priority_fee_per_gas } => {
            call.max_fee_per_gas = Some(U256::from(max_fee_per_gas));
            call.max_priority_fee_per_gas = Some(U256::from(max_priority_fee_per_gas));
        }
    }
    call
}

#[cfg(test)]
pub(crate) mod tests {
    use alloy_consensus::Transaction as _;
    use surge_primitives::{Wallet, gwei};
    use surge_rpc::test_utils::{MOCK_GAS_ESTIMATE, MockNode};

    use super::*;

    /// Context against a mock node with the given configuration tweaks applied.
    pub(crate) fn context_for(node: &MockNode, tweak: impl FnOnce(&mut Config)) -> ModeContext {
        let mut config = Config::default().with_rpc_url(node.url());
        tweak(&mut config);
        let contracts = ContractAddresses::from_config(&config);
        ModeContext::new(node.client(), Arc::new(config), contracts)
    }

    /// Options for a funded sender with dynamic pricing.
    pub(crate) fn funded_opts(node: &MockNode, seed: u8) -> TxOptions {
        let wallet = Wallet::from_seed(seed);
        let sender = wallet.address();
        node.set_balance(sender, U256::from(10u128.pow(21)));
        TxOptions::new(wallet, node.chain_id()).with_nonce(node.nonce(sender)).with_pricing(GasPricing::Dynamic {
            max_fee_per_gas: 2_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
        })
    }

    #[test]
    fn test_dispatch_from_config() {
        let mut config = Config::default();
        assert_eq!(Dispatch::from_config(&config), Dispatch::Send);
        config.transaction.output_raw_tx_only = true;
        assert_eq!(Dispatch::from_config(&config), Dispatch::RawOutput);
        config.call_only = true;
        assert_eq!(Dispatch::from_config(&config), Dispatch::CallOnly);
    }

    #[test]
    fn test_missing_contracts() {
        let contracts = ContractAddresses { erc20: Some(Address::repeat_byte(2)), ..Default::default() };
        assert_eq!(contracts.erc20().expect("erc20"), Address::repeat_byte(2));
        assert!(matches!(contracts.erc721(), Err(ModeError::MissingContract("ERC-721"))));
        assert!(matches!(contracts.load_tester(), Err(ModeError::MissingContract(_))));
    }

    #[test]
    fn test_call_request_mirrors_pricing() {
        let opts = TxOptions::new(Wallet::from_seed(1), 1)
            .with_value(U256::from(5))
            .with_pricing(GasPricing::Legacy { gas_price: 7 });
        let call = call_request(&opts, &TxRequest::create(Bytes::from_static(&[1, 2])));
        assert_eq!(call.to, None);
        assert_eq!(call.gas, None);
        assert_eq!(call.gas_price, Some(U256::from(7)));
        assert_eq!(call.value, Some(U256::from(5)));
        assert_eq!(call.from, Some(Wallet::from_seed(1).address()));

        let dynamic = opts.with_gas_limit(50_000).with_pricing(GasPricing::Dynamic {
            max_fee_per_gas: 10,
            max_priority_fee_per_gas: 1,
        });
        let call = call_request(&dynamic, &TxRequest::call(Address::ZERO, Bytes::new()));
        assert_eq!(call.max_fee_per_gas, Some(U256::from(10)));
        assert_eq!(call.gas_price, None);
        assert!(call.gas.is_some());
    }

    #[test]
    fn test_recipient_is_seeded() {
        let config = Config { seed: 5, ..Config::default() };
        let mut config_random = config.clone();
        config_random.transaction.random_recipients = true;
        let client = RpcClient::new("http://localhost:1").expect("client");
        let fixed = ModeContext::new(client.clone(), Arc::new(config), ContractAddresses::default());
        assert_eq!(fixed.recipient(), fixed.config().transaction.to_address);

        let a = ModeContext::new(client.clone(), Arc::new(config_random.clone()), ContractAddresses::default());
        let b = ModeContext::new(client, Arc::new(config_random), ContractAddresses::default());
        let first = a.recipient();
        assert_eq!(first, b.recipient());
        assert_ne!(first, a.recipient());
    }

    #[tokio::test]
    async fn test_send_estimates_missing_gas() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |_| {});
        let opts = funded_opts(&node, 1);
        let target = Address::repeat_byte(9);
        let execution = ctx.dispatch_tx(opts, TxRequest::call(target, Bytes::from_static(&[0xAA]))).await;
        execution.result.expect("sent");
        assert!(execution.tx_hash.is_some());
        assert_eq!(node.calls("eth_estimateGas"), 1);
        let submitted = node.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].gas_limit(), MOCK_GAS_ESTIMATE);
    }

    #[tokio::test]
    async fn test_explicit_gas_skips_estimate() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |_| {});
        let opts = funded_opts(&node, 1).with_gas_limit(60_000);
        ctx.dispatch_tx(opts, TxRequest::call(Address::ZERO, Bytes::new())).await.result.expect("sent");
        assert_eq!(node.calls("eth_estimateGas"), 0);
        assert_eq!(node.submitted()[0].gas_limit(), 60_000);
    }

    #[tokio::test]
    async fn test_call_only_never_submits() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |c| c.call_only = true);
        let execution = ctx.dispatch_tx(funded_opts(&node, 1), TxRequest::call(Address::ZERO, Bytes::new())).await;
        execution.result.expect("called");
        assert!(execution.tx_hash.is_none());
        assert_eq!(node.calls("eth_call"), 1);
        assert_eq!(node.calls("eth_estimateGas"), 0);
        assert!(node.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_raw_output_prints_instead_of_sending() {
        let node = MockNode::start().await.expect("start");
        let lines = Arc::new(Mutex::new(Vec::new()));
        let ctx = context_for(&node, |c| c.transaction.output_raw_tx_only = true)
            .with_raw_sink(RawSink::Memory(Arc::clone(&lines)));
        let opts = funded_opts(&node, 1).with_gas_limit(21_000).with_value(gwei(1));
        let execution = ctx.dispatch_tx(opts, TxRequest::call(Address::ZERO, Bytes::new())).await;
        execution.result.expect("printed");
        assert!(node.submitted().is_empty());
        let lines = lines.lock();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("0x02"));
    }

    #[tokio::test]
    async fn test_rejected_submission_keeps_hash_and_error() {
        let node = MockNode::start().await.expect("start");
        node.set_send_error(Some("nonce too low".into()));
        let ctx = context_for(&node, |_| {});
        let opts = funded_opts(&node, 1).with_gas_limit(21_000);
        let execution = ctx.dispatch_tx(opts, TxRequest::call(Address::ZERO, Bytes::new())).await;
        assert!(execution.is_error());
        assert!(execution.tx_hash.is_some());
        let sample = execution.to_sample(3, 4, 5);
        assert!(sample.is_error);
        assert_eq!((sample.worker_id, sample.request_id, sample.nonce), (3, 4, 5));
        let err = execution.result.expect_err("rejected");
        assert!(!err.submission_kind().is_reusable());
    }
}
