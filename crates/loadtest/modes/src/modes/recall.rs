use async_trait::async_trait;
use surge_config::Mode;
use surge_primitives::{GasPricing, TxOptions};
use surge_rpc::{BlockNumberOrTag, CallRequest, RpcTransaction};
use tracing::warn;

use crate::{Dispatch, Execution, LoadMode, ModeContext, ModeError, TxRequest, fetch_tape};

/// Re-targets a recorded transaction at the sender in `opts`.
///
/// Target, value, input, and gas limit are kept. Recorded EIP-1559 or chain-bound transactions
/// replay as EIP-1559 and the rest as legacy, priced from `opts`.
pub fn replay_request(original: &RpcTransaction, opts: TxOptions) -> (TxOptions, TxRequest) {
    let fee = opts.pricing.max_fee();
    let pricing = if original.max_fee_per_gas.is_some() || original.chain_id.is_some() {
        match opts.pricing {
            dynamic @ GasPricing::Dynamic { .. } => dynamic,
            GasPricing::Legacy { gas_price } => {
                GasPricing::Dynamic { max_fee_per_gas: gas_price, max_priority_fee_per_gas: gas_price }
            }
        }
    } else {
        GasPricing::Legacy { gas_price: fee }
    };
    let opts = opts.with_pricing(pricing).with_gas_limit(original.gas()).with_value(original.value);
    let request = TxRequest { to: original.to.into(), input: original.input.clone() };
    (opts, request)
}

/// `eth_call` reproducing a recorded transaction as its original sender.
///
/// With `latest` the call runs against the latest block without fee fields. Otherwise it runs
/// at the block the transaction was mined in with the recorded fees.
pub fn replay_call(original: &RpcTransaction, latest: bool) -> (CallRequest, BlockNumberOrTag) {
    let mut call = CallRequest {
        from: Some(original.from),
        to: original.to,
        value: Some(original.value),
        input: Some(original.input.clone()),
        ..Default::default()
    }
    .with_gas(original.gas());
    if latest {
        return (call, BlockNumberOrTag::LATEST);
    }
    let fee_cap = original.max_fee_per_gas.unwrap_or_default();
    let tip = original.max_priority_fee_per_gas.unwrap_or_default();
    if fee_cap.is_zero() && tip.is_zero() {
        call.gas_price = original.gas_price;
    } else {
        call.max_fee_per_gas = Some(fee_cap);
        call.max_priority_fee_per_gas = Some(tip);
    }
    let block = original.block_number.map_or(BlockNumberOrTag::LATEST, |n| BlockNumberOrTag::from(n.to::<u64>()));
    (call, block)
}

/// Replays recently mined transactions, picking the recording by nonce.
#[derive(Debug, Clone, Default)]
pub struct RecallMode {
    tape: Vec<RpcTransaction>,
}

impl RecallMode {
    /// Uses an already recorded tape.
    pub const fn with_tape(tape: Vec<RpcTransaction>) -> Self {
        Self { tape }
    }

    /// The recorded transactions.
    pub fn tape(&self) -> &[RpcTransaction] {
        &self.tape
    }

    fn pick(&self, nonce: u64) -> Option<&RpcTransaction> {
        let len = self.tape.len() as u64;
        if len == 0 {
            return None;
        }
        self.tape.get((nonce % len) as usize)
    }
}

#[async_trait]
impl LoadMode for RecallMode {
    fn mode(&self) -> Mode {
        Mode::Recall
    }

    async fn init(&mut self, ctx: &ModeContext) -> Result<(), ModeError> {
        if self.tape.is_empty() {
            let config = ctx.config();
            self.tape = fetch_tape(ctx.client(), config.workload.recall_blocks, config.block_batch_size).await?;
        }
        Ok(())
    }

    async fn execute(&self, ctx: &ModeContext, opts: TxOptions) -> Execution {
        let Some(original) = self.pick(opts.nonce) else {
            return Execution::failed(ModeError::EmptyTape(ctx.config().workload.recall_blocks));
        };
        if ctx.dispatch() == Dispatch::CallOnly {
            let (call, block) = replay_call(original, ctx.config().call_only_latest_block);
            let mut execution = ctx.timed_call(&call, block).await;
            if let Err(err) = &execution.result {
                warn!(hash = %original.hash, error = %err, "Recalled call failed");
                execution.result = Ok(());
            }
            return execution;
        }
        let (opts, request) = replay_request(original, opts);
        ctx.dispatch_tx(opts, request).await
    }
}

#[cfg(test)]
mod tests {
    use alloy_consensus::Transaction as _;
    use surge_primitives::{Address, B256, Bytes, TxKind, U64, U256, Wallet};
    use surge_rpc::test_utils::MockNode;

    use super::*;
    use crate::context::tests::{context_for, funded_opts};

    fn recorded(dynamic: bool) -> RpcTransaction {
        RpcTransaction {
            hash: B256::repeat_byte(1),
            from: Address::repeat_byte(2),
            to: Some(Address::repeat_byte(3)),
            value: U256::from(11),
            gas: U64::from(50_000),
            gas_price: (!dynamic).then(|| U256::from(5)),
            max_fee_per_gas: dynamic.then(|| U256::from(9)),
            max_priority_fee_per_gas: dynamic.then(|| U256::from(1)),
            input: Bytes::from_static(&[0xAB, 0xCD]),
            block_number: Some(U64::from(4)),
            ..Default::default()
        }
    }

    fn legacy_opts() -> TxOptions {
        TxOptions::new(Wallet::from_seed(1), 1).with_nonce(3).with_pricing(GasPricing::Legacy { gas_price: 7 })
    }

    #[test]
    fn test_replay_request_keeps_payload() {
        let (opts, request) = replay_request(&recorded(true), legacy_opts());
        assert_eq!(request.to, TxKind::Call(Address::repeat_byte(3)));
        assert_eq!(request.input, Bytes::from_static(&[0xAB, 0xCD]));
        assert_eq!(opts.gas_limit, 50_000);
        assert_eq!(opts.value, U256::from(11));
        assert_eq!(opts.nonce, 3);
        assert_eq!(opts.pricing, GasPricing::Dynamic { max_fee_per_gas: 7, max_priority_fee_per_gas: 7 });

        let (opts, _) = replay_request(&recorded(false), legacy_opts());
        assert_eq!(opts.pricing, GasPricing::Legacy { gas_price: 7 });
    }

    #[test]
    fn test_replay_request_for_creation() {
        let original = RpcTransaction { to: None, ..recorded(false) };
        let (_, request) = replay_request(&original, legacy_opts());
        assert_eq!(request.to, TxKind::Create);
    }

    #[test]
    fn test_replay_call_at_original_block() {
        let (call, block) = replay_call(&recorded(true), false);
        assert_eq!(block, BlockNumberOrTag::from(4u64));
        assert_eq!(call.from, Some(Address::repeat_byte(2)));
        assert_eq!(call.max_fee_per_gas, Some(U256::from(9)));
        assert_eq!(call.gas_price, None);

        let (call, _) = replay_call(&recorded(false), false);
        assert_eq!(call.gas_price, Some(U256::from(5)));
        assert_eq!(call.max_fee_per_gas, None);

        let (call, block) = replay_call(&recorded(true), true);
        assert_eq!(block, BlockNumberOrTag::LATEST);
        assert_eq!(call.max_fee_per_gas, None);
        assert_eq!(call.gas, Some(U64::from(50_000)));
    }

    #[tokio::test]
    async fn test_recall_picks_by_nonce() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |_| {});
        let first = RpcTransaction { to: Some(Address::repeat_byte(0xA1)), ..recorded(true) };
        let second = RpcTransaction { to: Some(Address::repeat_byte(0xA2)), ..recorded(true) };
        let mode = RecallMode::with_tape(vec![first, second]);

        let opts = funded_opts(&node, 9);
        assert_eq!(opts.nonce, 0);
        mode.execute(&ctx, opts).await.result.expect("sent");
        mode.execute(&ctx, funded_opts(&node, 9)).await.result.expect("sent");
        mode.execute(&ctx, funded_opts(&node, 9)).await.result.expect("sent");

        let targets: Vec<_> = node.submitted().iter().map(|tx| tx.to()).collect();
        assert_eq!(targets, vec![
            Some(Address::repeat_byte(0xA1)),
            Some(Address::repeat_byte(0xA2)),
            Some(Address::repeat_byte(0xA1)),
        ]);
    }

    #[tokio::test]
    async fn test_init_records_tape_and_fails_on_empty_chain() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |c| c.workload.recall_blocks = 5);
        let mut mode = RecallMode::default();
        assert!(matches!(mode.init(&ctx).await, Err(ModeError::EmptyTape(5))));

        let sender = funded_opts(&node, 9).with_gas_limit(21_000);
        ctx.dispatch_tx(sender, TxRequest::call(Address::repeat_byte(4), Bytes::new())).await.result.expect("sent");
        mode.init(&ctx).await.expect("init");
        assert_eq!(mode.tape().len(), 1);
    }

    #[tokio::test]
    async fn test_call_only_recall_never_submits() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |c| c.call_only = true);
        let mode = RecallMode::with_tape(vec![recorded(true)]);
        let execution = mode.execute(&ctx, funded_opts(&node, 9)).await;
        execution.result.expect("ok");
        assert_eq!(node.calls("eth_call"), 1);
        assert!(node.submitted().is_empty());
    }
}
