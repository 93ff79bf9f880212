//! Modes driving the load test contract.

use async_trait::async_trait;
use rand::Rng as _;
use surge_config::Mode;
use surge_primitives::TxOptions;

use crate::{
    Execution, LoadMode, ModeContext, ModeError, TxRequest,
    bindings::{Precompile, filler, inc_call, opcode_call, opcode_name, random_opcode, store_call},
};

/// `store(bytes)` with seeded filler of the configured size.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreMode;

#[async_trait]
impl LoadMode for StoreMode {
    fn mode(&self) -> Mode {
        Mode::Store
    }

    async fn execute(&self, ctx: &ModeContext, opts: TxOptions) -> Execution {
        let size = ctx.config().workload.store_data_size as usize;
        let request = ctx.contracts().load_tester().and_then(|to| {
            let data = ctx.with_rng(|rng| filler(rng, size));
            Ok(TxRequest::call(to, store_call(data)?))
        });
        ctx.try_dispatch(opts, request).await
    }
}

/// Counter increments.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncrementMode;

#[async_trait]
impl LoadMode for IncrementMode {
    fn mode(&self) -> Mode {
        Mode::Increment
    }

    async fn execute(&self, ctx: &ModeContext, opts: TxOptions) -> Execution {
        let request = ctx.contracts().load_tester().and_then(|to| Ok(TxRequest::call(to, inc_call()?)));
        ctx.try_dispatch(opts, request).await
    }
}

/// Opcode loops, either one fixed opcode or a fresh draw per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpcodeMode {
    opcode: Option<u64>,
}

impl OpcodeMode {
    /// Pins the opcode when `opcode` is set. Unknown opcodes are rejected.
    pub fn new(opcode: Option<u64>) -> Result<Self, ModeError> {
        if let Some(code) = opcode
            && opcode_name(code).is_none()
        {
            return Err(ModeError::UnknownOpcode(code));
        }
        Ok(Self { opcode })
    }
}

#[async_trait]
impl LoadMode for OpcodeMode {
    fn mode(&self) -> Mode {
        Mode::Opcode
    }

    async fn execute(&self, ctx: &ModeContext, opts: TxOptions) -> Execution {
        let opcode = self.opcode.unwrap_or_else(|| ctx.with_rng(random_opcode));
        let iterations = ctx.config().workload.iterations;
        let request =
            ctx.contracts().load_tester().and_then(|to| Ok(TxRequest::call(to, opcode_call(opcode, iterations)?)));
        ctx.try_dispatch(opts, request).await
    }
}

/// Precompile calls, either one fixed precompile or a fresh draw per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecompileMode {
    precompile: Option<Precompile>,
}

impl PrecompileMode {
    /// Pins the precompile at `address` when set. Unknown addresses are rejected.
    pub fn new(address: Option<u64>) -> Result<Self, ModeError> {
        let precompile = address
            .map(|address| Precompile::from_address(address).ok_or(ModeError::UnknownPrecompile(address)))
            .transpose()?;
        Ok(Self { precompile })
    }
}

#[async_trait]
impl LoadMode for PrecompileMode {
    fn mode(&self) -> Mode {
        Mode::Precompile
    }

    async fn execute(&self, ctx: &ModeContext, opts: TxOptions) -> Execution {
        let precompile = self.precompile.unwrap_or_else(|| {
            ctx.with_rng(|rng| Precompile::RANDOM_POOL[rng.gen_range(0..Precompile::RANDOM_POOL.len())])
        });
        let request = ctx
            .contracts()
            .load_tester()
            .and_then(|to| Ok(TxRequest::call(to, precompile.call(&opts.wallet)?)));
        ctx.try_dispatch(opts, request).await
    }
}

#[cfg(test)]
mod tests {
    use alloy_consensus::Transaction as _;
    use surge_abi::{AbiValue, Function, selector};
    use surge_primitives::{Address, U256};
    use surge_rpc::test_utils::MockNode;

    use super::*;
    use crate::context::tests::{context_for, funded_opts};

    const LOAD_TESTER: Address = Address::repeat_byte(0x10);

    async fn run(mode: &dyn LoadMode, tweak: impl FnOnce(&mut surge_config::Config)) -> (MockNode, Execution) {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |c| {
            c.contracts.load_tester_address = Some(LOAD_TESTER);
            tweak(c);
        });
        let execution = mode.execute(&ctx, funded_opts(&node, 3)).await;
        (node, execution)
    }

    #[tokio::test]
    async fn test_store_writes_configured_size() {
        let (node, execution) = run(&StoreMode, |c| c.workload.store_data_size = 100).await;
        execution.result.expect("sent");
        let submitted = node.submitted();
        let tx = &submitted[0];
        assert_eq!(tx.to(), Some(LOAD_TESTER));
        let decoded = Function::parse("store(bytes)").expect("parse").decode_input(tx.input()).expect("decode");
        let [AbiValue::Bytes(data)] = decoded.as_slice() else { panic!("unexpected {decoded:?}") };
        assert_eq!(data.len(), 100);
    }

    #[tokio::test]
    async fn test_store_without_contract_fails_before_sending() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |_| {});
        let execution = StoreMode.execute(&ctx, funded_opts(&node, 3)).await;
        assert!(matches!(execution.result, Err(ModeError::MissingContract(_))));
        assert!(node.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_increment() {
        let (node, execution) = run(&IncrementMode, |_| {}).await;
        execution.result.expect("sent");
        assert_eq!(node.submitted()[0].input().as_ref(), selector("inc()").expect("selector"));
    }

    #[tokio::test]
    async fn test_fixed_opcode_uses_iterations() {
        let mode = OpcodeMode::new(Some(0x54)).expect("known opcode");
        let (node, execution) = run(&mode, |c| c.workload.iterations = 7).await;
        execution.result.expect("sent");
        let input = node.submitted()[0].input().clone();
        assert_eq!(input[..4], selector("testSLOAD(uint256)").expect("selector"));
        assert_eq!(U256::from_be_slice(&input[4..]), U256::from(7));
    }

    #[test]
    fn test_unknown_precompile_rejected() {
        assert!(matches!(PrecompileMode::new(Some(10)), Err(ModeError::UnknownPrecompile(10))));
        assert!(PrecompileMode::new(None).is_ok());
    }

    #[tokio::test]
    async fn test_fixed_precompile() {
        let mode = PrecompileMode::new(Some(2)).expect("sha256");
        let (node, execution) = run(&mode, |_| {}).await;
        execution.result.expect("sent");
        assert_eq!(node.submitted()[0].input()[..4], selector("testSHA256(bytes)").expect("selector"));
    }

    #[tokio::test]
    async fn test_random_precompile_stays_in_pool() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |c| c.contracts.load_tester_address = Some(LOAD_TESTER));
        let mode = PrecompileMode::default();
        for _ in 0..10 {
            mode.execute(&ctx, funded_opts(&node, 3)).await.result.expect("sent");
        }
        let allowed: Vec<[u8; 4]> = Precompile::RANDOM_POOL
            .iter()
            .map(|p| selector(&format!("{}(bytes)", p.method())).expect("selector"))
            .collect();
        for tx in node.submitted() {
            assert!(allowed.iter().any(|s| tx.input()[..4] == s[..]));
        }
    }
}
