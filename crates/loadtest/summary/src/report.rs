//! Aggregate run report and its text and JSON renderings.

use std::{collections::BTreeMap, io::Write};

use serde::Serialize;
use surge_config::OutputMode;
use tracing::{debug, error};

use crate::{BlockSummary, Distribution, SummaryError, min_median_max};

/// Minimum, median and maximum latency in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Latency {
    /// Smallest latency.
    pub min: f64,
    /// Median latency.
    pub median: f64,
    /// Largest latency.
    pub max: f64,
}

impl Latency {
    fn of(values: &[f64]) -> Self {
        let (min, median, max) = min_median_max(values);
        Self { min, median, max }
    }
}

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockReport {
    /// Block number.
    pub block_number: u64,
    /// Block timestamp in unix seconds.
    pub time: u64,
    /// Block gas limit.
    pub gas_limit: u64,
    /// Gas used by run transactions.
    pub gas_used: u64,
    /// Run transactions in the block.
    pub num_tx: usize,
    /// `gas_used / gas_limit`.
    pub utilization: f64,
    /// Inclusion latencies of the block's run transactions.
    pub latencies: Latency,
}

impl BlockReport {
    fn from_summary(summary: &BlockSummary) -> Self {
        let gas_limit = summary.block.gas_limit.to::<u64>();
        let gas_used = summary.gas_used();
        let utilization = if gas_used == 0 || gas_limit == 0 { 0.0 } else { gas_used as f64 / gas_limit as f64 };
        let latencies: Vec<f64> = summary.latencies.values().copied().collect();
        Self {
            block_number: summary.block.number(),
            time: summary.block.timestamp(),
            gas_limit,
            gas_used,
            num_tx: summary.transactions().len(),
            utilization,
            latencies: Latency::of(&latencies),
        }
    }
}

/// Inclusion statistics of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Per-block rows in block order.
    pub summaries: Vec<BlockReport>,
    /// Receipts reporting success.
    pub successful_tx: u64,
    /// Receipts found.
    pub total_tx: u64,
    /// Seconds from the parent of the first block to the last block.
    pub total_mining_time: f64,
    /// Run transactions in the inspected blocks.
    pub total_transactions: u64,
    /// Gas used by run transactions.
    pub total_gas_used: u64,
    /// `total_transactions / total_mining_time`.
    pub transactions_per_sec: f64,
    /// `total_gas_used / total_mining_time`.
    pub gas_per_second: f64,
    /// Latencies over all blocks.
    pub latencies: Latency,
    /// Block time statistics; needs at least two blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_time: Option<Distribution>,
}

impl RunReport {
    /// Aggregates the summaries. `parent_timestamp` is the timestamp of the block before the
    /// first summarized block. Returns `None` when there is nothing to report.
    pub fn build(summaries: &BTreeMap<u64, BlockSummary>, parent_timestamp: u64) -> Option<Self> {
        let last = summaries.values().next_back()?;
        let rows: Vec<BlockReport> = summaries.values().map(BlockReport::from_summary).collect();
        let total_transactions = rows.iter().map(|row| row.num_tx as u64).sum();
        let total_gas_used = rows.iter().map(|row| row.gas_used).sum();
        let successful_tx = summaries.values().map(|s| s.successful() as u64).sum();
        let total_tx = summaries.values().map(|s| s.receipts.len() as u64).sum();
        let all_latencies: Vec<f64> = summaries.values().flat_map(|s| s.latencies.values().copied()).collect();

        let total_mining_time = last.block.timestamp().saturating_sub(parent_timestamp) as f64;
        let per_second = |total: u64| if total_mining_time > 0.0 { total as f64 / total_mining_time } else { 0.0 };
        Some(Self {
            summaries: rows,
            successful_tx,
            total_tx,
            total_mining_time,
            total_transactions,
            total_gas_used,
            transactions_per_sec: per_second(total_transactions),
            gas_per_second: per_second(total_gas_used),
            latencies: Latency::of(&all_latencies),
            block_time: Distribution::of(&block_times(summaries)),
        })
    }

    /// Writes the report in the requested format.
    pub fn write<W: Write>(&self, out: &mut W, mode: OutputMode) -> Result<(), SummaryError> {
        match mode {
            OutputMode::Text => self.write_text(out)?,
            OutputMode::Json => {
                serde_json::to_writer_pretty(&mut *out, self)?;
                writeln!(out)?;
            }
        }
        Ok(())
    }

    /// One line per block followed by the aggregates.
    pub fn write_text<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for row in &self.summaries {
            writeln!(
                out,
                "Block number: {}\tTime: {}\tGas Limit: {}\tGas Used: {}\tNum Tx: {}\tUtilization {:.2}%\tLatencies: {:.3}\t{:.3}\t{:.3}",
                row.block_number,
                row.time,
                row.gas_limit,
                row.gas_used,
                row.num_tx,
                row.utilization * 100.0,
                row.latencies.min,
                row.latencies.median,
                row.latencies.max,
            )?;
        }
        if self.successful_tx == 0 {
            error!("No transaction could be retrieved from the receipts");
            return Ok(());
        }
        writeln!(out, "Successful Tx: {}\tTotal Tx: {}", self.successful_tx, self.total_tx)?;
        writeln!(out, "Total Mining Time: {}s", self.total_mining_time)?;
        writeln!(out, "Total Transactions: {}", self.total_transactions)?;
        writeln!(out, "Total Gas Used: {}", self.total_gas_used)?;
        writeln!(out, "Transactions per sec: {:.3}", self.transactions_per_sec)?;
        writeln!(out, "Gas Per Second: {:.3}", self.gas_per_second)?;
        writeln!(
            out,
            "Latencies - Min: {:.3}\tMedian: {:.3}\tMax: {:.3}",
            self.latencies.min, self.latencies.median, self.latencies.max
        )?;
        match &self.block_time {
            Some(block_time) => {
                writeln!(out, "Mean Blocktime: {:.3}s", block_time.mean)?;
                writeln!(out, "Median Blocktime: {:.3}s", block_time.median)?;
                writeln!(out, "Minimum Blocktime: {:.3}s", block_time.min)?;
                writeln!(out, "Maximum Blocktime: {:.3}s", block_time.max)?;
                writeln!(out, "Blocktime Standard Deviation: {:.3}s", block_time.stddev)?;
                writeln!(out, "Blocktime Variance: {:.3}s", block_time.variance)?;
            }
            None => debug!(blocks = self.summaries.len(), "Too few blocks for block time statistics"),
        }
        Ok(())
    }
}

/// Gaps between consecutive increasing block timestamps, in seconds.
pub fn block_times(summaries: &BTreeMap<u64, BlockSummary>) -> Vec<f64> {
    let mut times = Vec::new();
    let mut previous: Option<u64> = None;
    for summary in summaries.values() {
        let current = summary.block.timestamp();
        match previous {
            None => previous = Some(current),
            Some(prev) if current > prev => {
                times.push((current - prev) as f64);
                previous = Some(current);
            }
            Some(_) => {}
        }
    }
    times
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assemble,
        block::tests::{POOL, block, receipt, tx},
    };

    const T: u64 = 1_000;

    fn three_blocks() -> BTreeMap<u64, BlockSummary> {
        let txs = [tx(POOL, 0, 1), tx(POOL, 1, 2), tx(POOL, 2, 3)];
        let receipts =
            vec![receipt(&txs[0], 21_000, true), receipt(&txs[1], 21_000, true), receipt(&txs[2], 50_000, false)];
        let mut summaries = assemble(
            vec![
                block(1, T, vec![txs[0].clone()]),
                block(2, T + 2, vec![txs[1].clone()]),
                block(3, T + 5, vec![txs[2].clone()]),
            ],
            receipts,
        );
        for (number, latency) in [(1, 1.0), (2, 2.0), (3, 4.0)] {
            if let Some(summary) = summaries.get_mut(&number) {
                summary.latencies.insert(number - 1, latency);
            }
        }
        summaries
    }

    #[test]
    fn test_mining_time_and_block_times() {
        let report = RunReport::build(&three_blocks(), T - 3).expect("report");
        assert_eq!(report.total_mining_time, 8.0);
        let block_time = report.block_time.expect("three blocks");
        assert_eq!(block_time.median, 2.5);
        assert_eq!(block_time.min, 2.0);
        assert_eq!(block_time.max, 3.0);
        assert_eq!(report.total_transactions, 3);
        assert_eq!(report.total_gas_used, 92_000);
        assert_eq!(report.successful_tx, 2);
        assert_eq!(report.total_tx, 3);
        assert_eq!(report.transactions_per_sec, 3.0 / 8.0);
        assert_eq!(report.latencies, Latency { min: 1.0, median: 2.0, max: 4.0 });
    }

    #[test]
    fn test_empty_summaries_have_no_report() {
        assert!(RunReport::build(&BTreeMap::new(), 0).is_none());
    }

    #[test]
    fn test_single_block_has_no_block_time() {
        let mut summaries = three_blocks();
        summaries.retain(|number, _| *number == 1);
        let report = RunReport::build(&summaries, T - 2).expect("report");
        assert!(report.block_time.is_none());
        assert_eq!(report.total_mining_time, 2.0);
    }

    #[test]
    fn test_text_output() {
        let report = RunReport::build(&three_blocks(), T - 3).expect("report");
        let mut out = Vec::new();
        report.write(&mut out, OutputMode::Text).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("Block number: 1\tTime: 1000\tGas Limit: 30000000\tGas Used: 21000\tNum Tx: 1\t"));
        assert!(text.contains("Successful Tx: 2\tTotal Tx: 3\n"));
        assert!(text.contains("Total Mining Time: 8s\n"));
        assert!(text.contains("Median Blocktime: 2.500s\n"));
    }

    #[test]
    fn test_json_output() {
        let report = RunReport::build(&three_blocks(), T - 3).expect("report");
        let mut out = Vec::new();
        report.write(&mut out, OutputMode::Json).expect("write");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value["total_mining_time"], 8.0);
        assert_eq!(value["summaries"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["summaries"][2]["gas_used"], 50_000);
        assert_eq!(value["block_time"]["max"], 3.0);
    }
}
