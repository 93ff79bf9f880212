//! Sources of pending transaction depth.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use surge_rpc::RpcClient;
use tracing::{error, warn};

/// Something that can report how many transactions are waiting to be mined.
#[async_trait]
pub trait PendingDepth: Send + Sync {
    /// Current depth, or `None` when it could not be observed.
    async fn pending_depth(&self) -> Option<u64>;
}

/// Reads depth from `txpool_status`, switching permanently to a fallback once that fails.
#[derive(Debug)]
pub struct TxpoolDepth<F> {
    client: RpcClient,
    fallback: F,
    use_txpool: AtomicBool,
}

impl<F> TxpoolDepth<F> {
    /// Creates a source that prefers the node's txpool.
    pub const fn new(client: RpcClient, fallback: F) -> Self {
        Self { client, fallback, use_txpool: AtomicBool::new(true) }
    }

    /// Whether the txpool is still being queried.
    pub fn uses_txpool(&self) -> bool {
        self.use_txpool.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<F: PendingDepth> PendingDepth for TxpoolDepth<F> {
    async fn pending_depth(&self) -> Option<u64> {
        if self.uses_txpool() {
            match self.client.txpool_status().await {
                Ok(status) => return Some(status.depth()),
                Err(err) => {
                    warn!(
                        error = %err,
                        "Error getting txpool size; falling back to account nonces and disabling txpool checks"
                    );
                    self.use_txpool.store(false, Ordering::Relaxed);
                }
            }
        }
        let depth = self.fallback.pending_depth().await;
        if depth.is_none() {
            error!("Unable to get pending transactions to update rate limit");
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U64;
    use surge_rpc::{TxpoolStatus, test_utils::MockNode};

    use super::*;

    struct Fixed(Option<u64>);

    #[async_trait]
    impl PendingDepth for Fixed {
        async fn pending_depth(&self) -> Option<u64> {
            self.0
        }
    }

    #[tokio::test]
    async fn test_txpool_depth_sums_pending_and_queued() {
        let node = MockNode::start().await.expect("start");
        node.set_txpool_status(Some(TxpoolStatus { pending: U64::from(30), queued: U64::from(12) }));
        let source = TxpoolDepth::new(node.client(), Fixed(Some(1)));
        assert_eq!(source.pending_depth().await, Some(42));
        assert!(source.uses_txpool());
    }

    #[tokio::test]
    async fn test_falls_back_once_txpool_fails() {
        let node = MockNode::start().await.expect("start");
        node.set_txpool_status(None);
        let source = TxpoolDepth::new(node.client(), Fixed(Some(7)));
        assert_eq!(source.pending_depth().await, Some(7));
        assert!(!source.uses_txpool());

        node.set_txpool_status(Some(TxpoolStatus::default()));
        assert_eq!(source.pending_depth().await, Some(7));
        assert_eq!(node.calls("txpool_status"), 1);
    }

    #[tokio::test]
    async fn test_missing_fallback_depth() {
        let node = MockNode::start().await.expect("start");
        node.set_txpool_status(None);
        let source = TxpoolDepth::new(node.client(), Fixed(None));
        assert_eq!(source.pending_depth().await, None);
    }
}
