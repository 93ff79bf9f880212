//! Tracks submitted transactions for a preconfirmation and a receipt.

use std::{
    collections::HashMap,
    fs,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use surge_config::PreconfConfig;
use surge_primitives::B256;
use surge_rpc::{BatchRequest, RpcClient, RpcTransactionReceipt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{Percentiles, SummaryError};

/// Preconfirmed and included transactions landing fewer than this many blocks after
/// registration count towards confidence.
pub const CONFIDENT_BLOCK_DELTA: u64 = 10;

/// How often the stats file is rewritten while the tracker runs.
pub const STATS_WRITE_INTERVAL: Duration = Duration::from_secs(2);

/// Final state of one tracked transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreconfRecord {
    /// Transaction hash.
    pub tx_hash: B256,
    /// Whether the endpoint reported a preconfirmation.
    pub preconfirmed: bool,
    /// Whether a receipt was found.
    pub included: bool,
    /// Milliseconds from registration to the preconfirmation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preconf_duration_ms: Option<u64>,
    /// Milliseconds from registration to the receipt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_duration_ms: Option<u64>,
    /// Blocks between registration and inclusion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_diff: Option<u64>,
    /// Gas used by the included transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    /// Receipt status, 1 for success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u64>,
}

impl PreconfRecord {
    /// Included without a preconfirmation, or preconfirmed only after the receipt appeared.
    pub fn is_ineffective(&self) -> bool {
        if !self.included {
            return false;
        }
        match (self.preconfirmed, self.preconf_duration_ms, self.receipt_duration_ms) {
            (false, _, _) => true,
            (true, Some(preconf), Some(receipt)) => preconf > receipt,
            _ => false,
        }
    }

    /// Preconfirmed, included, and included soon after registration.
    pub fn is_confident(&self) -> bool {
        self.preconfirmed && self.included && self.block_diff.is_some_and(|diff| diff < CONFIDENT_BLOCK_DELTA)
    }
}

/// Outcome counts and duration percentiles over all tracked transactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreconfSummary {
    /// Transactions tracked to completion.
    pub total_tasks: u64,
    /// Preconfirmed.
    pub preconf_success: u64,
    /// Not preconfirmed.
    pub preconf_fail: u64,
    /// Included.
    pub receipt_success: u64,
    /// Not included.
    pub receipt_fail: u64,
    /// Preconfirmed and included.
    pub both_confirmed: u64,
    /// Preconfirmed but never included.
    pub preconf_only: u64,
    /// Included without a preconfirmation.
    pub receipt_only: u64,
    /// Neither preconfirmed nor included.
    pub neither_confirmed: u64,
    /// Included with a missing or late preconfirmation.
    pub ineffective_preconf: u64,
    /// Both confirmed within [`CONFIDENT_BLOCK_DELTA`] blocks.
    pub confidence: u64,
    /// Gas used by included transactions.
    pub total_gas_used: u64,
    /// Preconfirmation durations in milliseconds.
    pub preconf: Percentiles,
    /// Receipt durations in milliseconds.
    pub receipt: Percentiles,
}

impl PreconfSummary {
    /// Aggregates completed records.
    pub fn from_records(records: &[PreconfRecord]) -> Self {
        let mut summary = Self { total_tasks: records.len() as u64, ..Default::default() };
        let mut preconf_durations = Vec::new();
        let mut receipt_durations = Vec::new();
        for record in records {
            match (record.preconfirmed, record.included) {
                (true, true) => summary.both_confirmed += 1,
                (true, false) => summary.preconf_only += 1,
                (false, true) => summary.receipt_only += 1,
                (false, false) => summary.neither_confirmed += 1,
            }
            if record.preconfirmed {
                summary.preconf_success += 1;
            } else {
                summary.preconf_fail += 1;
            }
            if record.included {
                summary.receipt_success += 1;
                summary.total_gas_used += record.gas_used.unwrap_or_default();
            } else {
                summary.receipt_fail += 1;
            }
            summary.ineffective_preconf += u64::from(record.is_ineffective());
            summary.confidence += u64::from(record.is_confident());
            preconf_durations.extend(record.preconf_duration_ms.filter(|_| record.preconfirmed).map(|ms| ms as f64));
            receipt_durations.extend(record.receipt_duration_ms.map(|ms| ms as f64));
        }
        summary.preconf = Percentiles::of(&preconf_durations);
        summary.receipt = Percentiles::of(&receipt_durations);
        summary
    }
}

/// Contents of the stats file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreconfStats {
    /// Aggregates.
    pub summary: PreconfSummary,
    /// One record per completed transaction.
    pub transactions: Vec<PreconfRecord>,
}

#[derive(Debug, Clone)]
enum Outcome<T> {
    Pending,
    Resolved { value: T, after: Duration },
    Failed,
}

impl<T> Outcome<T> {
    const fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug)]
struct Tracked {
    registered_at: Instant,
    start_block: Option<u64>,
    receipt: Outcome<RpcTransactionReceipt>,
    preconf: Outcome<bool>,
}

impl Tracked {
    fn record(&self, tx_hash: B256) -> PreconfRecord {
        let mut record = PreconfRecord { tx_hash, ..Default::default() };
        if let Outcome::Resolved { value: true, after } = self.preconf {
            record.preconfirmed = true;
            record.preconf_duration_ms = Some(after.as_millis() as u64);
        }
        if let Outcome::Resolved { value: receipt, after } = &self.receipt {
            record.included = true;
            record.receipt_duration_ms = Some(after.as_millis() as u64);
            record.gas_used = Some(receipt.gas_used());
            record.status = Some(receipt.status.to());
            record.block_diff = self.start_block.map(|start| receipt.block_number().saturating_sub(start));
        }
        record
    }
}

/// Batch-polls registered hashes until each has both a preconfirmation answer and a receipt,
/// or times out.
#[derive(Debug)]
pub struct PreconfTracker {
    client: RpcClient,
    config: PreconfConfig,
    head: Mutex<Option<u64>>,
    pending: Mutex<HashMap<B256, Tracked>>,
    completed: Mutex<Vec<PreconfRecord>>,
}

impl PreconfTracker {
    /// A tracker with nothing registered.
    pub fn new(client: RpcClient, config: PreconfConfig) -> Self {
        Self {
            client,
            config,
            head: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
            completed: Mutex::new(Vec::new()),
        }
    }

    /// Starts tracking `hash` from the last observed head.
    pub fn register(&self, hash: B256) {
        let start_block = *self.head.lock();
        self.pending.lock().insert(
            hash,
            Tracked { registered_at: Instant::now(), start_block, receipt: Outcome::Pending, preconf: Outcome::Pending },
        );
    }

    /// Number of hashes still being polled.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Reloads the head used for new registrations. Failures keep the previous head.
    pub async fn refresh_head(&self) {
        match self.client.block_number().await {
            Ok(number) => *self.head.lock() = Some(number),
            Err(err) => debug!(error = %err, "Failed to refresh head for preconf tracking"),
        }
    }

    /// One polling round over every unresolved hash, then completion of finished hashes.
    pub async fn poll(&self) {
        self.refresh_head().await;
        self.poll_receipts().await;
        self.poll_preconfs().await;
        self.complete();
    }

    /// Polls until `cancel` fires, rewriting the stats file every [`STATS_WRITE_INTERVAL`].
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut poll = tokio::time::interval(self.config.poll_interval().max(Duration::from_millis(1)));
        let mut write = tokio::time::interval(STATS_WRITE_INTERVAL);
        let writes = self.config.stats_file.is_some();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = poll.tick() => self.poll().await,
                _ = write.tick(), if writes => {
                    if let Err(err) = self.write_stats() {
                        error!(error = %err, "Failed to write preconf stats");
                    }
                }
            }
        }
        debug!(pending = self.pending(), "Preconf tracker stopped");
    }

    /// Polls until nothing is pending. Bounded by the timeout, after which every hash completes.
    pub async fn drain(&self) {
        let interval = self.config.poll_interval().max(Duration::from_millis(1));
        while self.pending() > 0 {
            self.poll().await;
            if self.pending() > 0 {
                tokio::time::sleep(interval).await;
            }
        }
    }

    /// Snapshot of completed records and their aggregates.
    pub fn stats(&self) -> PreconfStats {
        let transactions = self.completed.lock().clone();
        PreconfStats { summary: PreconfSummary::from_records(&transactions), transactions }
    }

    /// Completes every pending hash as-is, logs the summary and writes the stats file.
    pub fn finish(&self) -> Result<PreconfStats, SummaryError> {
        let drained: Vec<(B256, Tracked)> = self.pending.lock().drain().collect();
        self.completed.lock().extend(drained.iter().map(|(hash, tracked)| tracked.record(*hash)));
        let stats = self.stats();
        info!(summary = ?stats.summary, "Preconf tracker stats");
        self.write(&stats)?;
        Ok(stats)
    }

    fn write_stats(&self) -> Result<(), SummaryError> {
        self.write(&self.stats())
    }

    fn write(&self, stats: &PreconfStats) -> Result<(), SummaryError> {
        let Some(path) = &self.config.stats_file else {
            return Ok(());
        };
        fs::write(path, serde_json::to_vec_pretty(stats)?)?;
        Ok(())
    }

    fn unresolved(&self, select: impl Fn(&Tracked) -> bool) -> Vec<B256> {
        self.pending.lock().iter().filter(|(_, tracked)| !select(tracked)).map(|(hash, _)| *hash).collect()
    }

    async fn poll_receipts(&self) {
        let hashes = self.unresolved(|tracked| tracked.receipt.is_resolved());
        for chunk in hashes.chunks(self.config.batch_size.max(1)) {
            let requests: Vec<_> =
                chunk.iter().map(|hash| BatchRequest::new("eth_getTransactionReceipt", json!([hash]))).collect();
            let entries = match self.client.batch(&requests).await {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(error = %err, count = chunk.len(), "Batch receipt call failed");
                    continue;
                }
            };
            let mut pending = self.pending.lock();
            for (hash, entry) in chunk.iter().zip(entries) {
                let Some(tracked) = pending.get_mut(hash) else { continue };
                match RpcClient::decode_batch_entry::<Option<RpcTransactionReceipt>>("eth_getTransactionReceipt", entry)
                {
                    Ok(Some(receipt)) => {
                        tracked.receipt = Outcome::Resolved { value: receipt, after: tracked.registered_at.elapsed() }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(error = %err, %hash, "Receipt batch element error");
                        tracked.receipt = Outcome::Failed;
                    }
                }
            }
        }
    }

    async fn poll_preconfs(&self) {
        let hashes = self.unresolved(|tracked| tracked.preconf.is_resolved());
        for chunk in hashes.chunks(self.config.batch_size.max(1)) {
            let requests: Vec<_> =
                chunk.iter().map(|hash| BatchRequest::new("eth_checkPreconfStatus", json!([hash]))).collect();
            let entries = match self.client.batch(&requests).await {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(error = %err, count = chunk.len(), "Batch preconf call failed");
                    continue;
                }
            };
            let mut pending = self.pending.lock();
            for (hash, entry) in chunk.iter().zip(entries) {
                let Some(tracked) = pending.get_mut(hash) else { continue };
                match RpcClient::decode_batch_entry::<bool>("eth_checkPreconfStatus", entry) {
                    Ok(value) => {
                        tracked.preconf = Outcome::Resolved { value, after: tracked.registered_at.elapsed() }
                    }
                    Err(err) => {
                        warn!(error = %err, %hash, "Preconf batch element error");
                        tracked.preconf = Outcome::Failed;
                    }
                }
            }
        }
    }

    fn complete(&self) {
        let timeout = self.config.timeout();
        let mut pending = self.pending.lock();
        let done: Vec<B256> = pending
            .iter()
            .filter(|(_, tracked)| {
                let timed_out = tracked.registered_at.elapsed() >= timeout;
                (tracked.receipt.is_resolved() || timed_out) && (tracked.preconf.is_resolved() || timed_out)
            })
            .map(|(hash, _)| *hash)
            .collect();
        let mut completed = self.completed.lock();
        for hash in done {
            if let Some(tracked) = pending.remove(&hash) {
                completed.push(tracked.record(hash));
            }
        }
    }
}
