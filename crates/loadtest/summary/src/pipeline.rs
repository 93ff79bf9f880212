//! Fetches a run's blocks and receipts and builds its report.

use std::time::Instant;

use surge_primitives::Sample;
use surge_rpc::{BlockNumberOrTag, RpcClient};
use tracing::{info, trace};

use crate::{NonceRanges, RunReport, SummaryError, assemble, filter_pool_transactions, record_latencies};

/// Block range and batching of one summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryRequest {
    /// First block of the run.
    pub start_block: u64,
    /// Last block of the run.
    pub end_block: u64,
    /// Blocks per batched `eth_getBlockByNumber` call.
    pub block_batch_size: u64,
    /// Receipt requests per batch.
    pub batch_size: usize,
}

/// Builds the report for the blocks of a run.
///
/// Only transactions from `ranges` are counted. Returns `None` when none of them were mined in
/// the range.
pub async fn summarize(
    client: &RpcClient,
    request: SummaryRequest,
    samples: &[Sample],
    ranges: &NonceRanges,
) -> Result<Option<RunReport>, SummaryError> {
    let started = Instant::now();
    client
        .block_by_number(BlockNumberOrTag::from(request.start_block), false)
        .await?
        .ok_or(SummaryError::MissingBlock(request.start_block))?;

    trace!(from = request.start_block, to = request.end_block, "Capturing block range");
    let blocks = client.blocks_in_range(request.start_block, request.end_block, request.block_batch_size, true).await?;
    info!(len = blocks.len(), "Block summary");
    let receipts = client.receipts_for_blocks(&blocks, request.batch_size).await?;
    info!(len = receipts.len(), "Receipt summary");

    let mut summaries = assemble(blocks, receipts);
    filter_pool_transactions(&mut summaries, ranges);
    record_latencies(&mut summaries, samples);

    let Some(first) = summaries.keys().next().copied() else {
        return Ok(None);
    };
    let parent_timestamp = match first.checked_sub(1) {
        Some(parent) => client
            .block_by_number(BlockNumberOrTag::from(parent), false)
            .await?
            .ok_or(SummaryError::MissingBlock(parent))?
            .timestamp(),
        None => summaries[&first].block.timestamp(),
    };
    trace!(elapsed = ?started.elapsed(), "Summary built");
    Ok(RunReport::build(&summaries, parent_timestamp))
}
