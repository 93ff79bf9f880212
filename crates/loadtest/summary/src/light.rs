//! Request statistics computed from samples alone.

use std::time::{Duration, SystemTime};

use surge_primitives::Sample;
use tracing::{error, info};

use crate::Distribution;

/// Throughput and wait-time statistics of the recorded samples.
#[derive(Debug, Clone, PartialEq)]
pub struct LightSummary {
    /// Number of samples.
    pub samples: usize,
    /// Samples marked as errors.
    pub errors: usize,
    /// Time between the start and end of the run.
    pub duration: Duration,
    /// Start of the latest request.
    pub last_request: SystemTime,
    /// Successful requests per second.
    pub tps: f64,
    /// Requests per second.
    pub rps: f64,
    /// Per-request wait in seconds.
    pub wait: Distribution,
}

impl LightSummary {
    /// Summarizes `samples` for a run spanning `started..ended`. `None` without samples.
    pub fn from_samples(samples: &[Sample], started: SystemTime, ended: SystemTime) -> Option<Self> {
        let waits: Vec<f64> = samples.iter().map(|s| s.wait.as_secs_f64()).collect();
        let wait = Distribution::of(&waits)?;
        let errors = samples.iter().filter(|s| s.is_error).count();
        let duration = ended.duration_since(started).unwrap_or_default();
        let secs = duration.as_secs_f64();
        let rate = |count: usize| if secs > 0.0 { count as f64 / secs } else { 0.0 };
        let last_request = samples.iter().map(|s| s.started_at).max().unwrap_or(started);
        Some(Self {
            samples: samples.len(),
            errors,
            duration,
            last_request,
            tps: rate(samples.len() - errors),
            rps: rate(samples.len()),
            wait,
        })
    }

    /// Logs the summary. `final_rate` is the limiter rate at the end of the run, if limited.
    pub fn log(&self, final_rate: Option<f64>) {
        info!(samples = self.samples, "Results");
        info!(
            duration_secs = self.duration.as_secs_f64(),
            last_request = ?self.last_request,
            "Load generation finished"
        );
        info!(tps = self.tps, "Successful requests per second");
        if self.tps != self.rps {
            error!(rps = self.rps, "Total requests per second, including failures");
        }
        info!(
            mean = self.wait.mean,
            median = self.wait.median,
            min = self.wait.min,
            max = self.wait.max,
            stddev = self.wait.stddev,
            "Request wait time in seconds"
        );
        info!(final_rate = final_rate.unwrap_or_default(), errors = self.errors, "Rough test summary");
    }
}
