//! Additive-increase, multiplicative-decrease rate control.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{PendingDepth, RateLimiter};

/// Lowest rate a backoff steps down to, in transactions per second.
pub const MIN_ADAPTIVE_RATE: f64 = 1.0;

/// AIMD tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveConfig {
    /// Depth the controller steers towards.
    pub target_size: u64,
    /// Rate added per cycle while below target.
    pub increment: f64,
    /// Divisor applied per cycle while above target.
    pub backoff_factor: f64,
    /// Time between adjustments.
    pub cycle: Duration,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self { target_size: 1000, increment: 50.0, backoff_factor: 2.0, cycle: Duration::from_secs(10) }
    }
}

/// Rate for the next cycle given the observed depth.
///
/// A backoff never goes below [`MIN_ADAPTIVE_RATE`], and never raises a rate already under it.
pub fn next_rate(current: f64, depth: u64, config: &AdaptiveConfig) -> f64 {
    match depth.cmp(&config.target_size) {
        std::cmp::Ordering::Less => current + config.increment,
        std::cmp::Ordering::Greater => {
            (current / config.backoff_factor).max(MIN_ADAPTIVE_RATE.min(current))
        }
        std::cmp::Ordering::Equal => current,
    }
}

/// Periodically reshapes a [`RateLimiter`] from a [`PendingDepth`] source.
#[derive(Debug)]
pub struct AdaptiveController<D> {
    limiter: Arc<RateLimiter>,
    depth: D,
    config: AdaptiveConfig,
}

impl<D: PendingDepth> AdaptiveController<D> {
    /// Creates a controller.
    pub const fn new(limiter: Arc<RateLimiter>, depth: D, config: AdaptiveConfig) -> Self {
        Self { limiter, depth, config }
    }

    /// Performs one adjustment and returns the resulting rate.
    pub async fn step(&self) -> f64 {
        let current = self.limiter.rate();
        let Some(depth) = self.depth.pending_depth().await else {
            return current;
        };
        let next = next_rate(current, depth, &self.config);
        if next > current {
            self.limiter.set_rate(next);
            info!(rate = next, depth, target = self.config.target_size, "Increased rate limit");
        } else if next < current {
            self.limiter.set_rate(next);
            info!(rate = next, depth, target = self.config.target_size, "Backed off rate limit");
        } else {
            debug!(rate = current, depth, "Rate limit unchanged");
        }
        next
    }

    /// Adjusts the rate every cycle until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.cycle);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.step().await;
                }
            }
        }
        debug!("Adaptive rate controller stopped");
    }
}
