//! Timed request samples.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// One submitted load-test request.
///
/// Samples are created by workers once a request finishes and are never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Index of the worker that issued the request.
    pub worker_id: u64,
    /// Per-worker request counter.
    pub request_id: u64,
    /// Wall-clock time at which the request started.
    pub started_at: SystemTime,
    /// Time spent between the start of the request and its completion.
    pub wait: Duration,
    /// Hash of the resulting transaction, if any.
    pub tx_hash: Option<B256>,
    /// Whether the request failed.
    pub is_error: bool,
    /// Nonce used for the request.
    pub nonce: u64,
}

impl Sample {
    /// Wall-clock time at which the request completed.
    pub fn finished_at(&self) -> SystemTime {
        self.started_at + self.wait
    }

    /// Request start as fractional seconds since the unix epoch.
    pub fn started_at_secs(&self) -> f64 {
        self.started_at.duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or_default()
    }
}
