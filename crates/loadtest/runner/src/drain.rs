//! Waiting for the node to mine every vended nonce.

use std::{collections::HashMap, time::Duration};

use surge_primitives::Address;
use surge_rpc::{BlockNumberOrTag, RpcClient};
use tracing::{info, warn};

/// Delay between two rounds of nonce checks.
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Rounds of nonce checks before giving up.
pub const DRAIN_MAX_TRIES: u32 = 30;

/// Polls the mined nonce of every account until each reaches its expected next nonce.
///
/// Returns whether all accounts caught up within `tries` rounds.
pub async fn wait_for_nonces(
    client: &RpcClient,
    expected: &HashMap<Address, u64>,
    interval: Duration,
    tries: u32,
) -> bool {
    for attempt in 1..=tries {
        let mut lagging = 0usize;
        for (address, nonce) in expected {
            match client.transaction_count(*address, BlockNumberOrTag::LATEST).await {
                Ok(mined) if mined >= *nonce => {}
                Ok(mined) => {
                    lagging += 1;
                    info!(%address, mined, expected = nonce, "Waiting for account nonce");
                }
                Err(err) => {
                    lagging += 1;
                    warn!(%address, error = %err, "Failed to read account nonce");
                }
            }
        }
        if lagging == 0 {
            return true;
        }
        info!(attempt, tries, lagging, "Accounts still have unmined transactions");
        if attempt < tries {
            tokio::time::sleep(interval).await;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use surge_primitives::{U256, Wallet};
    use surge_rpc::test_utils::{MOCK_CHAIN_ID, MockNode, sign_transfer};

    use super::*;

    async fn send_one(node: &MockNode, wallet: &Wallet) {
        node.set_balance(wallet.address(), U256::from(10u128.pow(20)));
        let tx = sign_transfer(wallet, MOCK_CHAIN_ID, 0, Address::repeat_byte(1), U256::from(1)).expect("sign");
        node.client().send_raw_transaction(&tx.raw).await.expect("send");
    }

    #[tokio::test]
    async fn test_mined_nonces_finish_at_once() {
        let node = MockNode::start().await.expect("start");
        let wallet = Wallet::from_seed(31);
        send_one(&node, &wallet).await;
        let expected = HashMap::from([(wallet.address(), 1)]);
        assert!(wait_for_nonces(&node.client(), &expected, Duration::from_millis(1), 3).await);
        assert_eq!(node.calls("eth_getTransactionCount"), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_tries() {
        let node = MockNode::start().await.expect("start");
        node.set_auto_mine(false);
        let wallet = Wallet::from_seed(32);
        send_one(&node, &wallet).await;
        let expected = HashMap::from([(wallet.address(), 1)]);
        assert!(!wait_for_nonces(&node.client(), &expected, Duration::from_millis(1), 3).await);
        assert_eq!(node.calls("eth_getTransactionCount"), 3);
    }

    #[tokio::test]
    async fn test_nothing_expected() {
        let node = MockNode::start().await.expect("start");
        assert!(wait_for_nonces(&node.client(), &HashMap::new(), Duration::from_millis(1), 1).await);
    }
}
