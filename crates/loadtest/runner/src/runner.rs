//! The run state machine.

use std::{
    io::Write as _,
    sync::Arc,
    time::{Duration, SystemTime},
};

use parking_lot::Mutex;
use surge_accounts::AccountPool;
use surge_config::Config;
use surge_gas::GasOracle;
use surge_modes::{Dispatch, ModeContext, ModeRegistry, RawSink};
use surge_primitives::{Sample, Wallet};
use surge_rate::{AdaptiveController, RateLimiter, TxpoolDepth};
use surge_rpc::RpcClient;
use surge_summary::{
    LightSummary, NonceRanges, PreconfStats, PreconfTracker, RunReport, SummaryRequest, summarize,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    BaseFeeGuard, DRAIN_MAX_TRIES, DRAIN_POLL_INTERVAL, RunState, RunnerError, adaptive_config, client_config,
    gas_oracle_config, pool_config, receipt_policy,
    setup::{deploy_contracts, populate_pool, wait_until_ready},
    wait_for_nonces,
    worker::Workload,
};

/// What a finished run produced.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Head block when the workers started.
    pub start_block: u64,
    /// Head block after draining.
    pub end_block: u64,
    /// Requests made by all workers.
    pub requests: u64,
    /// Statistics over the recorded samples.
    pub light: Option<LightSummary>,
    /// Block report, when summarizing was enabled and found run transactions.
    pub report: Option<RunReport>,
    /// Preconfirmation results, when tracking was enabled.
    pub preconf: Option<PreconfStats>,
}

/// Components built during initialization.
#[derive(Debug)]
struct Session {
    client: RpcClient,
    pool: AccountPool,
    workload: Arc<Workload>,
    start_block: u64,
}

/// Drives one load test through [`RunState`].
#[derive(Debug)]
pub struct Runner {
    config: Arc<Config>,
    state: Mutex<RunState>,
    samples: Arc<Mutex<Vec<Sample>>>,
    raw_sink: RawSink,
    drain_interval: Duration,
    drain_tries: u32,
}

impl Runner {
    /// Validates `config` and creates a runner that has not contacted the endpoint yet.
    pub fn new(config: Config) -> Result<Self, RunnerError> {
        Ok(Self {
            config: Arc::new(config.validate()?),
            state: Mutex::new(RunState::NotStarted),
            samples: Arc::default(),
            raw_sink: RawSink::default(),
            drain_interval: DRAIN_POLL_INTERVAL,
            drain_tries: DRAIN_MAX_TRIES,
        })
    }

    /// Sends raw transaction output somewhere other than stdout.
    #[must_use]
    pub fn with_raw_sink(mut self, raw_sink: RawSink) -> Self {
        self.raw_sink = raw_sink;
        self
    }

    /// Overrides how long draining waits for unmined transactions.
    #[must_use]
    pub const fn with_drain(mut self, interval: Duration, tries: u32) -> Self {
        self.drain_interval = interval;
        self.drain_tries = tries;
        self
    }

    /// The validated configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current phase.
    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    /// Copy of the samples recorded so far.
    pub fn samples(&self) -> Vec<Sample> {
        self.samples.lock().clone()
    }

    fn transition(&self, to: RunState) {
        let mut state = self.state.lock();
        let from = *state;
        if !from.can_move_to(to) {
            warn!(%from, %to, "Ignoring out of order state change");
            return;
        }
        *state = to;
        info!(%from, %to, "Run state changed");
    }

    /// Runs the load test to completion.
    ///
    /// `shutdown` stops the workers early; the run still drains and summarizes. If it fires
    /// before the workers start, the run ends without sending anything.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<RunOutcome, RunnerError> {
        if self.state() != RunState::NotStarted {
            return Err(RunnerError::AlreadyStarted);
        }
        self.transition(RunState::Initializing);
        let session = match self.initialize(&shutdown).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                self.transition(RunState::Done);
                return Ok(RunOutcome::default());
            }
            Err(err) => {
                self.transition(RunState::Done);
                return Err(err);
            }
        };

        self.transition(RunState::Funding);
        if let Err(err) = self.fund(&session).await {
            self.transition(RunState::Done);
            return Err(err);
        }
        if shutdown.is_cancelled() {
            info!("Shutdown requested before the workers started");
            self.refund(&session.pool).await;
            self.transition(RunState::Done);
            return Ok(RunOutcome { start_block: session.start_block, ..Default::default() });
        }

        self.transition(RunState::Running);
        let started = SystemTime::now();
        let background = CancellationToken::new();
        let mut background_tasks = self.spawn_background(&session, &background);
        let requests = self.execute(&session, &shutdown).await;
        let ended = SystemTime::now();

        self.transition(RunState::Draining);
        let end_block = self.drain(&session).await;
        let preconf = match &session.workload.preconf {
            Some(tracker) => {
                tracker.drain().await;
                Some(tracker)
            }
            None => None,
        };
        background.cancel();
        while let Some(result) = background_tasks.join_next().await {
            if let Err(err) = result {
                error!(error = %err, "Background task failed");
            }
        }

        self.transition(RunState::Summarizing);
        let mut outcome = RunOutcome { start_block: session.start_block, end_block, requests, ..Default::default() };
        outcome.light = self.light_summary(&session, started, ended);
        outcome.report = self.report(&session, end_block).await;
        outcome.preconf = preconf.and_then(|tracker| {
            tracker.finish().map_err(|err| error!(error = %err, "Failed to finish preconf tracking")).ok()
        });
        self.refund(&session.pool).await;

        self.transition(RunState::Done);
        Ok(outcome)
    }

    /// Builds every component. `None` when `shutdown` fired while accounts were loading.
    async fn initialize(&self, shutdown: &CancellationToken) -> Result<Option<Session>, RunnerError> {
        let config = &self.config;
        let client = RpcClient::with_config(&config.rpc_url, &client_config(config))?;
        let chain_id = match config.chain_id {
            Some(chain_id) => chain_id,
            None => client.chain_id().await?,
        };
        let funder = Wallet::from_hex(&config.transaction.private_key).map_err(RunnerError::FundingKey)?;
        let gas = Arc::new(GasOracle::detect(client.clone(), gas_oracle_config(config)).await?);
        info!(
            url = %config.rpc_url,
            chain_id,
            funder = %funder.address(),
            base_fee = gas.base_fee_supported(),
            "Connected to endpoint"
        );

        let contracts = deploy_contracts(&client, config, &funder, chain_id, &gas).await?;
        let pool = AccountPool::new(client.clone(), Arc::clone(&gas), funder.clone(), pool_config(config, chain_id));
        populate_pool(&pool, config, &funder)?;
        if !wait_until_ready(&pool, shutdown).await {
            return Ok(None);
        }

        let ctx = ModeContext::new(client.clone(), Arc::clone(config), contracts).with_raw_sink(self.raw_sink.clone());
        let mut registry = ModeRegistry::from_config(config)?;
        registry.init_all(&ctx).await?;

        let limiter = if config.rate.is_limited() {
            RateLimiter::new(config.rate.rate_limit)
        } else {
            RateLimiter::unlimited()
        };
        let base_fee = config
            .gas
            .max_base_fee_wei
            .filter(|limit| *limit > 0)
            .map(|limit| Arc::new(BaseFeeGuard::new(client.clone(), limit)));
        let preconf = (config.preconf.enabled && ctx.dispatch() == Dispatch::Send)
            .then(|| Arc::new(PreconfTracker::new(client.clone(), config.preconf.clone())));
        if let Some(tracker) = &preconf {
            tracker.refresh_head().await;
        }

        let workload = Workload {
            ctx,
            registry,
            pool: pool.clone(),
            gas,
            limiter: Arc::new(limiter),
            base_fee,
            preconf,
            samples: Arc::clone(&self.samples),
            chain_id,
            requests: config.requests,
            gas_limit: config.gas.gas_limit.unwrap_or_default(),
            receipts: receipt_policy(config),
            record_samples: !config.transaction.fire_and_forget,
        };
        let start_block = client.block_number().await?;
        Ok(Some(Session { client, pool, workload: Arc::new(workload), start_block }))
    }

    async fn fund(&self, session: &Session) -> Result<(), RunnerError> {
        if !self.config.accounts.pre_fund {
            debug!("Sending accounts are funded on first use");
            return Ok(());
        }
        session.pool.fund_accounts().await?;
        Ok(())
    }

    /// Starts the adaptive controller and base fee guard. Both stop when `background` fires.
    fn spawn_background(&self, session: &Session, background: &CancellationToken) -> JoinSet<()> {
        let workload = &session.workload;
        let mut tasks = JoinSet::new();
        if let Some(tracker) = &workload.preconf {
            tasks.spawn(Arc::clone(tracker).run(background.clone()));
        }
        if self.config.rate.adaptive {
            let depth = TxpoolDepth::new(session.client.clone(), session.pool.clone());
            let controller =
                AdaptiveController::new(Arc::clone(&workload.limiter), depth, adaptive_config(&self.config.rate));
            tasks.spawn(controller.run(background.clone()));
        }
        if let Some(guard) = &workload.base_fee {
            let guard = Arc::clone(guard);
            let cancel = background.clone();
            tasks.spawn(async move { guard.run(cancel).await });
        }
        tasks
    }

    /// Fans out the workers and waits for all of them. Returns the number of requests made.
    async fn execute(&self, session: &Session, shutdown: &CancellationToken) -> u64 {
        let cancel = shutdown.child_token();
        if let Some(limit) = self.config.time_limit() {
            let timer = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = timer.cancelled() => {}
                    _ = tokio::time::sleep(limit) => {
                        info!(secs = limit.as_secs(), "Time limit reached, stopping workers");
                        timer.cancel();
                    }
                }
            });
        }

        info!(
            workers = self.config.concurrency,
            requests = self.config.requests,
            modes = ?session.workload.registry.modes().collect::<Vec<_>>(),
            "Starting workers"
        );
        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.concurrency {
            workers.spawn(Arc::clone(&session.workload).run(worker_id, cancel.clone()));
        }
        let mut requests = 0;
        while let Some(result) = workers.join_next().await {
            match result {
                Ok(sent) => requests += sent,
                Err(err) => error!(error = %err, "Worker task failed"),
            }
        }
        cancel.cancel();
        info!(requests, "Workers finished");
        requests
    }

    /// Waits for unmined transactions unless nothing lands on chain, then reads the head.
    async fn drain(&self, session: &Session) -> u64 {
        let transaction = &self.config.transaction;
        if !(self.config.call_only || transaction.fire_and_forget || transaction.output_raw_tx_only) {
            let expected = session.pool.nonces(true);
            if !wait_for_nonces(&session.client, &expected, self.drain_interval, self.drain_tries).await {
                warn!(accounts = expected.len(), "Gave up waiting for all transactions to be mined");
            }
        }
        match session.client.block_number().await {
            Ok(block) => block,
            Err(err) => {
                warn!(error = %err, "Failed to read the final block, using the start block");
                session.start_block
            }
        }
    }

    fn light_summary(&self, session: &Session, started: SystemTime, ended: SystemTime) -> Option<LightSummary> {
        let samples = self.samples.lock().clone();
        let summary = LightSummary::from_samples(&samples, started, ended)?;
        let limiter = &session.workload.limiter;
        summary.log(limiter.is_limited().then(|| limiter.rate()));
        Some(summary)
    }

    async fn report(&self, session: &Session, end_block: u64) -> Option<RunReport> {
        let config = &self.config;
        if !config.summary.enabled || config.call_only || config.transaction.output_raw_tx_only {
            return None;
        }
        let ranges: NonceRanges = session
            .pool
            .accounts()
            .iter()
            .filter(|account| account.is_used())
            .map(|account| (account.address(), (account.start_nonce(), account.nonce())))
            .collect();
        let request = SummaryRequest {
            start_block: session.start_block,
            end_block,
            block_batch_size: config.block_batch_size,
            batch_size: config.batch_size as usize,
        };
        let samples = self.samples.lock().clone();
        let report = match summarize(&session.client, request, &samples, &ranges).await {
            Ok(Some(report)) => report,
            Ok(None) => {
                warn!(from = request.start_block, to = request.end_block, "No run transactions found in block range");
                return None;
            }
            Err(err) => {
                error!(error = %err, "Failed to build the block summary");
                return None;
            }
        };
        let mut stdout = std::io::stdout().lock();
        if let Err(err) = report.write(&mut stdout, config.summary.output_mode) {
            error!(error = %err, "Failed to write the block summary");
        }
        if let Err(err) = stdout.flush() {
            warn!(error = %err, "Failed to flush the block summary");
        }
        Some(report)
    }

    async fn refund(&self, pool: &AccountPool) {
        if !pool.config().refund_enabled() {
            return;
        }
        if let Err(err) = pool.return_funds().await {
            error!(error = %err, "Failed to return funds to the funding account");
        }
    }
}
