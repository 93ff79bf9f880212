//! Pauses workers while the base fee is above a ceiling.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use surge_primitives::U256;
use surge_rpc::RpcClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How often the guard reads the latest header.
pub const BASE_FEE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shared pause flag driven by the latest header's base fee.
#[derive(Debug)]
pub struct BaseFeeGuard {
    client: RpcClient,
    limit: U256,
    interval: Duration,
    paused: AtomicBool,
}

impl BaseFeeGuard {
    /// Guard for `limit` wei per gas.
    pub fn new(client: RpcClient, limit: u64) -> Self {
        Self { client, limit: U256::from(limit), interval: BASE_FEE_POLL_INTERVAL, paused: AtomicBool::new(false) }
    }

    /// Overrides the poll and pause-check interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Whether sending is currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Reads the latest header once and updates the flag. A failed read keeps the flag.
    pub async fn check(&self) -> bool {
        let base_fee = match self.client.latest_block().await {
            Ok(block) => block.base_fee_per_gas,
            Err(err) => {
                warn!(error = %err, "Failed to read base fee");
                return self.is_paused();
            }
        };
        let Some(base_fee) = base_fee else {
            return self.is_paused();
        };
        let pause = base_fee > self.limit;
        let was_paused = self.paused.swap(pause, Ordering::AcqRel);
        match (was_paused, pause) {
            (false, true) => warn!(%base_fee, limit = %self.limit, "Base fee above limit, pausing"),
            (true, false) => info!(%base_fee, limit = %self.limit, "Base fee back under limit, resuming"),
            _ => debug!(%base_fee, paused = pause, "Base fee checked"),
        }
        pause
    }

    /// Checks the base fee every interval until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.check().await;
                }
            }
        }
        debug!("Base fee guard stopped");
    }

    /// Sleeps in interval steps while paused. Returns false once `cancel` fires.
    pub async fn wait_until_clear(&self, cancel: &CancellationToken) -> bool {
        while self.is_paused() {
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        !cancel.is_cancelled()
    }
}
