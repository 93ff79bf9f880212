//! The per-worker request loop.

use std::{sync::Arc, time::Instant};

use parking_lot::Mutex;
use surge_accounts::AccountPool;
use surge_gas::GasOracle;
use surge_modes::{Dispatch, Execution, ModeContext, ModeError, ModeRegistry};
use surge_primitives::{Sample, TxOptions};
use surge_rate::RateLimiter;
use surge_rpc::{ReceiptPolicy, wait_for_receipt};
use surge_summary::PreconfTracker;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::BaseFeeGuard;

/// Everything the workers of one run share.
#[derive(Debug)]
pub(crate) struct Workload {
    pub(crate) ctx: ModeContext,
    pub(crate) registry: ModeRegistry,
    pub(crate) pool: AccountPool,
    pub(crate) gas: Arc<GasOracle>,
    pub(crate) limiter: Arc<RateLimiter>,
    pub(crate) base_fee: Option<Arc<BaseFeeGuard>>,
    pub(crate) preconf: Option<Arc<PreconfTracker>>,
    pub(crate) samples: Arc<Mutex<Vec<Sample>>>,
    pub(crate) chain_id: u64,
    pub(crate) requests: u64,
    pub(crate) gas_limit: u64,
    pub(crate) receipts: Option<ReceiptPolicy>,
    pub(crate) record_samples: bool,
}

impl Workload {
    /// Runs up to `requests` iterations for `worker_id`. Returns how many requests were made.
    pub(crate) async fn run(self: Arc<Self>, worker_id: u64, cancel: CancellationToken) -> u64 {
        let mut sent = 0;
        for request_id in 0..self.requests {
            if cancel.is_cancelled() {
                break;
            }
            if let Err(err) = self.limiter.acquire(&cancel).await {
                trace!(worker_id, error = %err, "Rate limit wait ended");
                break;
            }
            if let Some(guard) = &self.base_fee
                && !guard.wait_until_clear(&cancel).await
            {
                break;
            }
            self.request(worker_id, request_id).await;
            sent += 1;
        }
        debug!(worker_id, sent, "Worker finished");
        sent
    }

    async fn request(&self, worker_id: u64, request_id: u64) {
        let account = match self.pool.next().await {
            Ok(account) => account,
            Err(err) => {
                error!(worker_id, request_id, error = %err, "Failed to get an account");
                return;
            }
        };
        let Some(mode) = self.registry.select(worker_id, request_id) else {
            return;
        };
        let nonce = account.nonce();
        let opts = TxOptions::new(account.wallet().clone(), self.chain_id)
            .with_nonce(nonce)
            .with_gas_limit(self.gas_limit)
            .with_pricing(self.gas.suggest().await);

        let mut execution = mode.execute(&self.ctx, opts).await;
        let sending = self.ctx.dispatch() == Dispatch::Send;
        match &execution.result {
            Err(err) => {
                error!(
                    worker_id,
                    request_id,
                    mode = %mode.mode(),
                    from = %account.address(),
                    nonce,
                    error = %err,
                    "Recorded an error while sending transactions"
                );
                if sending
                    && err.submission_kind().is_reusable()
                    && let Err(err) = self.pool.add_reusable_nonce(account.address(), nonce)
                {
                    warn!(error = %err, "Failed to return nonce to the pool");
                }
            }
            Ok(()) if sending => self.after_send(&mut execution).await,
            Ok(()) => {}
        }

        if self.record_samples {
            self.samples.lock().push(execution.to_sample(worker_id, request_id, nonce));
        }
    }

    async fn after_send(&self, execution: &mut Execution) {
        let Some(hash) = execution.tx_hash else { return };
        if let Some(tracker) = &self.preconf {
            tracker.register(hash);
        }
        let Some(policy) = self.receipts else { return };
        let start = Instant::now();
        let result = wait_for_receipt(self.ctx.client(), hash, policy).await;
        execution.wait += start.elapsed();
        match result {
            Ok(receipt) => trace!(%hash, block = receipt.block_number(), "Receipt received"),
            Err(err) => {
                error!(%hash, error = %err, "Failed to get receipt");
                execution.result = Err(ModeError::from(err));
            }
        }
    }
}
