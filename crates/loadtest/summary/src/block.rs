//! Per-block receipts and inclusion latencies.

use std::collections::{BTreeMap, HashMap, HashSet};

use surge_primitives::{Address, B256, Sample};
use surge_rpc::{BlockTransactions, RpcBlock, RpcTransaction, RpcTransactionReceipt};
use tracing::{debug, trace, warn};

/// Latencies below this many seconds point at clock skew and trigger a shift.
pub const MIN_EXPECTED_LATENCY: f64 = 0.1;

/// Seconds added on top of the shift that lifts the minimum latency to
/// [`MIN_EXPECTED_LATENCY`].
pub const LATENCY_SHIFT_PAD: f64 = 0.0011;

/// Latencies above this many seconds are logged.
const SUSPICIOUS_LATENCY: f64 = 2.0 * 3600.0;

/// Start and next nonce of every pool account.
pub type NonceRanges = HashMap<Address, (u64, u64)>;

/// One inspected block with its receipts and the latency of each run transaction.
#[derive(Debug, Clone, Default)]
pub struct BlockSummary {
    /// Block with full transactions.
    pub block: RpcBlock,
    /// Receipts by transaction hash.
    pub receipts: HashMap<B256, RpcTransactionReceipt>,
    /// Inclusion latency in seconds by nonce.
    pub latencies: HashMap<u64, f64>,
}

impl BlockSummary {
    /// A summary without receipts or latencies.
    pub fn new(block: RpcBlock) -> Self {
        Self { block, ..Default::default() }
    }

    /// Transactions in the block.
    pub fn transactions(&self) -> &[RpcTransaction] {
        self.block.full_transactions()
    }

    /// Gas used by the receipts kept for this block.
    pub fn gas_used(&self) -> u64 {
        self.receipts.values().map(RpcTransactionReceipt::gas_used).sum()
    }

    /// Number of receipts that report success.
    pub fn successful(&self) -> usize {
        self.receipts.values().filter(|r| r.is_success()).count()
    }
}

/// Groups blocks and receipts by block number. Receipts of unknown blocks are dropped.
pub fn assemble(blocks: Vec<RpcBlock>, receipts: Vec<RpcTransactionReceipt>) -> BTreeMap<u64, BlockSummary> {
    let mut summaries: BTreeMap<u64, BlockSummary> =
        blocks.into_iter().map(|block| (block.number(), BlockSummary::new(block))).collect();
    for receipt in receipts {
        let number = receipt.block_number();
        match summaries.get_mut(&number) {
            Some(summary) => {
                summary.receipts.insert(receipt.transaction_hash, receipt);
            }
            None => warn!(block = number, hash = %receipt.transaction_hash, "Receipt for a block that was not fetched"),
        }
    }
    summaries
}

/// Keeps only transactions sent by pool accounts within their nonce ranges.
///
/// Blocks before the first or after the last block holding such a transaction are removed, as
/// are blocks left without any.
pub fn filter_pool_transactions(summaries: &mut BTreeMap<u64, BlockSummary>, ranges: &NonceRanges) {
    let mut valid = HashSet::new();
    let mut first = u64::MAX;
    let mut last = 0;
    for (number, summary) in summaries.iter() {
        for tx in summary.transactions() {
            let Some((start, end)) = ranges.get(&tx.from) else { continue };
            if (*start..=*end).contains(&tx.nonce()) {
                valid.insert(tx.hash);
                first = first.min(*number);
                last = last.max(*number);
            }
        }
    }

    summaries.retain(|number, summary| {
        if *number < first || *number > last {
            return false;
        }
        let kept: Vec<RpcTransaction> =
            summary.transactions().iter().filter(|tx| valid.contains(&tx.hash)).cloned().collect();
        summary.receipts.retain(|hash, _| valid.contains(hash));
        let keep = !kept.is_empty();
        summary.block.transactions = BlockTransactions::Full(kept);
        keep
    });
    debug!(blocks = summaries.len(), transactions = valid.len(), "Filtered summary to pool transactions");
}

/// Joins transactions to samples by nonce and records `block timestamp - request start`.
///
/// If the smallest latency is below [`MIN_EXPECTED_LATENCY`], every latency is shifted up by
/// the gap plus [`LATENCY_SHIFT_PAD`]. Returns the shift applied.
pub fn record_latencies(summaries: &mut BTreeMap<u64, BlockSummary>, samples: &[Sample]) -> f64 {
    let started: HashMap<u64, f64> = samples.iter().map(|s| (s.nonce, s.started_at_secs())).collect();
    let mut min_latency = MIN_EXPECTED_LATENCY;
    for summary in summaries.values_mut() {
        let mined_at = summary.block.timestamp() as f64;
        let nonces: Vec<u64> = summary.transactions().iter().map(RpcTransaction::nonce).collect();
        for nonce in nonces {
            let Some(request_time) = started.get(&nonce) else { continue };
            let latency = mined_at - request_time;
            if latency > SUSPICIOUS_LATENCY {
                let block = summary.block.number();
                debug!(nonce, block, hours = latency / 3600.0, "Transaction latency above two hours");
            }
            min_latency = min_latency.min(latency);
            summary.latencies.insert(nonce, latency);
        }
    }

    if min_latency >= MIN_EXPECTED_LATENCY {
        return 0.0;
    }
    let shift = (MIN_EXPECTED_LATENCY - min_latency) + LATENCY_SHIFT_PAD;
    trace!(min_latency, shift, "Minimum latency below expected threshold");
    for latency in summaries.values_mut().flat_map(|summary| summary.latencies.values_mut()) {
        *latency += shift;
    }
    shift
}
