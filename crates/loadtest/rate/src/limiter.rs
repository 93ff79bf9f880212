//! Token bucket shared by the workers.

use std::{num::NonZeroU32, sync::Arc, time::Duration};

use governor::{DefaultDirectRateLimiter, Quota};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::RateLimitError;

/// Longest interval between tokens. Slower positive rates are clamped to it.
const MAX_PERIOD: Duration = Duration::from_secs(60 * 60);

/// Shortest interval between tokens.
const MIN_PERIOD: Duration = Duration::from_nanos(1);

#[derive(Debug)]
struct LimiterState {
    rate: f64,
    bucket: Option<Arc<DefaultDirectRateLimiter>>,
}

/// A token bucket with a burst of one whose rate can change at runtime.
#[derive(Debug)]
pub struct RateLimiter {
    state: RwLock<LimiterState>,
}

impl RateLimiter {
    /// Creates a limiter issuing `rate` tokens per second. A non-positive rate disables it.
    pub fn new(rate: f64) -> Self {
        Self { state: RwLock::new(LimiterState { rate, bucket: bucket(rate) }) }
    }

    /// Creates a limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(0.0)
    }

    /// Current rate in tokens per second.
    pub fn rate(&self) -> f64 {
        self.state.read().rate
    }

    /// Whether `acquire` can wait.
    pub fn is_limited(&self) -> bool {
        self.state.read().bucket.is_some()
    }

    /// Replaces the rate. Waiters on the previous bucket finish at the previous pace.
    ///
    /// Setting the current rate again keeps the existing bucket.
    pub fn set_rate(&self, rate: f64) {
        let mut state = self.state.write();
        if state.rate.to_bits() == rate.to_bits() {
            return;
        }
        state.rate = rate;
        state.bucket = bucket(rate);
    }

    /// Waits for a token.
    ///
    /// Returns [`RateLimitError::Cancelled`] as soon as `cancel` fires, including when it fired
    /// before the call.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), RateLimitError> {
        if cancel.is_cancelled() {
            return Err(RateLimitError::Cancelled);
        }
        let bucket = self.state.read().bucket.clone();
        let Some(bucket) = bucket else {
            return Ok(());
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RateLimitError::Cancelled),
            _ = bucket.until_ready() => Ok(()),
        }
    }
}

/// Builds the bucket for `rate`. Only a non-positive or non-finite rate yields no bucket.
fn bucket(rate: f64) -> Option<Arc<DefaultDirectRateLimiter>> {
    if !rate.is_finite() || rate <= 0.0 {
        return None;
    }
    let quota = Quota::with_period(period(rate))?.allow_burst(NonZeroU32::MIN);
    Some(Arc::new(DefaultDirectRateLimiter::direct(quota)))
}

/// Interval between tokens for a positive finite `rate`, within [`MIN_PERIOD`, `MAX_PERIOD`].
fn period(rate: f64) -> Duration {
    let secs = rate.recip();
    if !secs.is_finite() || secs >= MAX_PERIOD.as_secs_f64() {
        return MAX_PERIOD;
    }
    Duration::from_secs_f64(secs).max(MIN_PERIOD)
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicU64, Ordering},
        time::Instant,
    };

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0.0)]
    #[case(-4.0)]
    #[case(f64::NAN)]
    fn test_non_positive_rate_is_unlimited(#[case] rate: f64) {
        let limiter = RateLimiter::new(rate);
        assert!(!limiter.is_limited());
    }

    #[tokio::test]
    async fn test_unlimited_never_waits() {
        let limiter = RateLimiter::unlimited();
        let cancel = CancellationToken::new();
        let start = Instant::now();
        for _ in 0..1000 {
            limiter.acquire(&cancel).await.expect("acquire");
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_acquisitions_respect_rate() {
        let limiter = Arc::new(RateLimiter::new(20.0));
        let cancel = CancellationToken::new();
        let count = Arc::new(AtomicU64::new(0));
        let window = Duration::from_millis(500);
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = Arc::clone(&limiter);
            let cancel = cancel.clone();
            let count = Arc::clone(&count);
            handles.push(tokio::spawn(async move {
                while limiter.acquire(&cancel).await.is_ok() {
                    if start.elapsed() >= window {
                        break;
                    }
                    count.fetch_add(1, Ordering::Relaxed);
                }
            }));
        }
        tokio::time::sleep(window + Duration::from_millis(100)).await;
        cancel.cancel();
        for handle in handles {
            handle.await.expect("join");
        }
        // 20 per second over half a second, plus the burst token.
        assert!(count.load(Ordering::Relaxed) <= 11, "{}", count.load(Ordering::Relaxed));
        assert!(count.load(Ordering::Relaxed) >= 5);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_wait() {
        let limiter = RateLimiter::new(0.001);
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.expect("burst token");

        let waiter = {
            let cancel = cancel.clone();
            async move { limiter.acquire(&cancel).await }
        };
        let handle = tokio::spawn(waiter);
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        assert_eq!(handle.await.expect("join"), Err(RateLimitError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancelled_before_call() {
        let limiter = RateLimiter::unlimited();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(limiter.acquire(&cancel).await, Err(RateLimitError::Cancelled));
    }

    #[test]
    fn test_set_rate() {
        let limiter = RateLimiter::new(4.0);
        assert_eq!(limiter.rate(), 4.0);
        limiter.set_rate(150.0);
        assert_eq!(limiter.rate(), 150.0);
        assert!(limiter.is_limited());
        limiter.set_rate(0.0);
        assert!(!limiter.is_limited());
    }

    #[test]
    fn test_same_rate_keeps_bucket() {
        let limiter = RateLimiter::new(25.0);
        let before = limiter.state.read().bucket.clone().expect("limited");
        limiter.set_rate(25.0);
        let after = limiter.state.read().bucket.clone().expect("limited");
        assert!(Arc::ptr_eq(&before, &after));
        limiter.set_rate(26.0);
        let changed = limiter.state.read().bucket.clone().expect("limited");
        assert!(!Arc::ptr_eq(&before, &changed));
    }

    #[rstest]
    #[case(1e-300)]
    #[case(f64::MIN_POSITIVE)]
    #[case(5e-324)]
    #[case(1e-9)]
    #[case(1e15)]
    #[case(f64::MAX)]
    fn test_extreme_positive_rates_stay_limited(#[case] rate: f64) {
        let limiter = RateLimiter::new(rate);
        assert!(limiter.is_limited());
        assert!(limiter.rate() > 0.0);
    }

    #[test]
    fn test_period_is_clamped() {
        assert_eq!(period(1e-12), MAX_PERIOD);
        assert_eq!(period(1e18), MIN_PERIOD);
        assert_eq!(period(4.0), Duration::from_millis(250));
    }
}
