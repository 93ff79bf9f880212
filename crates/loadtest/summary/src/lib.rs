//! Post-run summaries and preconfirmation tracking for surge.
#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/surge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod block;
pub use block::{
    BlockSummary, LATENCY_SHIFT_PAD, MIN_EXPECTED_LATENCY, NonceRanges, assemble, filter_pool_transactions,
    record_latencies,
};

mod error;
pub use error::SummaryError;

mod light;
pub use light::LightSummary;

mod pipeline;
pub use pipeline::{SummaryRequest, summarize};

mod preconf;
pub use preconf::{
    CONFIDENT_BLOCK_DELTA, PreconfRecord, PreconfStats, PreconfSummary, PreconfTracker, STATS_WRITE_INTERVAL,
};

mod report;
pub use report::{BlockReport, Latency, RunReport, block_times};

mod stats;
pub use stats::{Distribution, Percentiles, min_median_max, percentile};
