//! Receipt polling with exponential backoff.

use std::time::Duration;

use alloy_primitives::B256;
use rand::Rng as _;
use tracing::trace;

use crate::{RpcClient, RpcError, RpcTransactionReceipt};

/// Longest delay between two polls, before jitter.
pub const MAX_RECEIPT_DELAY: Duration = Duration::from_secs(30);

/// How to poll for a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptPolicy {
    /// Attempts before giving up; zero polls until the timeout.
    pub max_retries: u32,
    /// Delay before the second attempt; zero selects 100 ms and values under 10 ms are raised.
    pub initial_delay: Duration,
    /// Overall deadline.
    pub timeout: Duration,
}

impl Default for ReceiptPolicy {
    fn default() -> Self {
        Self { max_retries: 0, initial_delay: Duration::ZERO, timeout: Duration::from_secs(60) }
    }
}

impl ReceiptPolicy {
    /// Sets the attempt budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Sets the overall deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn effective_initial_delay(&self) -> Duration {
        if self.initial_delay.is_zero() {
            Duration::from_millis(100)
        } else {
            self.initial_delay.max(Duration::from_millis(10))
        }
    }

    /// Delay after the given zero-based attempt, without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.effective_initial_delay().saturating_mul(factor).min(MAX_RECEIPT_DELAY)
    }

    /// Delay after the given attempt plus uniform jitter in `[0, delay / 2)`.
    pub fn jittered_backoff(&self, attempt: u32) -> Duration {
        let delay = self.backoff(attempt);
        let max_jitter = (delay / 2).max(Duration::from_millis(1));
        let jitter = rand::thread_rng().gen_range(0..max_jitter.as_nanos() as u64);
        delay + Duration::from_nanos(jitter)
    }
}

/// Polls `eth_getTransactionReceipt` until it returns a receipt.
pub async fn wait_for_receipt(
    client: &RpcClient,
    hash: B256,
    policy: ReceiptPolicy,
) -> Result<RpcTransactionReceipt, RpcError> {
    let poll = async {
        let mut attempt = 0u32;
        loop {
            let last_error = match client.transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => None,
                Err(err) => Some(err),
            };
            if policy.max_retries > 0 && attempt + 1 >= policy.max_retries {
                return Err(last_error.unwrap_or(RpcError::ReceiptNotFound { hash, attempts: policy.max_retries }));
            }
            let delay = policy.jittered_backoff(attempt);
            trace!(%hash, attempt, ?delay, "Receipt not available yet");
            tokio::time::sleep(delay).await;
            attempt = attempt.saturating_add(1);
        }
    };
    tokio::time::timeout(policy.timeout, poll).await.map_err(|_| RpcError::ReceiptTimeout(hash))?
}
