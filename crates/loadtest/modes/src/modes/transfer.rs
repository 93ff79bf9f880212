use async_trait::async_trait;
use surge_config::Mode;
use surge_primitives::{Bytes, TRANSFER_GAS, TxOptions};

use crate::{Execution, LoadMode, ModeContext, TxRequest};

/// Plain value transfers to the configured or a random recipient.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferMode;

#[async_trait]
impl LoadMode for TransferMode {
    fn mode(&self) -> Mode {
        Mode::Transaction
    }

    async fn execute(&self, ctx: &ModeContext, opts: TxOptions) -> Execution {
        let opts = opts.with_gas_limit(TRANSFER_GAS).with_value(ctx.config().transaction.eth_amount_in_wei);
        ctx.dispatch_tx(opts, TxRequest::call(ctx.recipient(), Bytes::new())).await
    }
}

#[cfg(test)]
mod tests {
    use alloy_consensus::Transaction as _;
    use surge_primitives::{Address, U256};
    use surge_rpc::test_utils::MockNode;

    use super::*;
    use crate::context::tests::{context_for, funded_opts};

    #[tokio::test]
    async fn test_transfer_to_configured_recipient() {
        let node = MockNode::start().await.expect("start");
        let to = Address::repeat_byte(0xAB);
        let ctx = context_for(&node, |c| {
            c.transaction.to_address = to;
            c.transaction.eth_amount_in_wei = U256::from(1_000);
        });
        TransferMode.execute(&ctx, funded_opts(&node, 1)).await.result.expect("sent");

        let submitted = node.submitted();
        assert_eq!(submitted[0].gas_limit(), TRANSFER_GAS);
        assert_eq!(submitted[0].to(), Some(to));
        assert_eq!(submitted[0].value(), U256::from(1_000));
        assert!(submitted[0].input().is_empty());
        assert_eq!(node.balance(to), U256::from(1_000));
        assert_eq!(node.calls("eth_estimateGas"), 0);
    }

    #[tokio::test]
    async fn test_random_recipients_differ() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |c| c.transaction.random_recipients = true);
        for _ in 0..2 {
            TransferMode.execute(&ctx, funded_opts(&node, 1)).await.result.expect("sent");
        }
        let submitted = node.submitted();
        assert_ne!(submitted[0].to(), submitted[1].to());
    }
}
