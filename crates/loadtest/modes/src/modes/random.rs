use async_trait::async_trait;
use rand::Rng as _;
use surge_config::{Config, Mode};
use surge_primitives::TxOptions;
use tracing::warn;

use crate::{
    Execution, LoadMode, ModeContext, ModeError, build_mode,
    modes::{OpcodeMode, PrecompileMode},
};

/// A uniform draw from [`Mode::RANDOM_POOL`] for every request.
#[derive(Debug)]
pub struct RandomMode {
    pool: Vec<Box<dyn LoadMode>>,
}

impl RandomMode {
    /// Builds every pool member. Opcode and precompile members always draw their target.
    pub fn new(config: &Config) -> Result<Self, ModeError> {
        let pool = Mode::RANDOM_POOL
            .iter()
            .map(|mode| -> Result<Box<dyn LoadMode>, ModeError> {
                Ok(match mode {
                    Mode::Opcode => Box::new(OpcodeMode::default()),
                    Mode::Precompile => Box::new(PrecompileMode::default()),
                    other => build_mode(*other, config)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { pool })
    }

    /// Modes still eligible for a draw.
    pub fn pool(&self) -> impl Iterator<Item = Mode> + '_ {
        self.pool.iter().map(|mode| mode.mode())
    }
}

#[async_trait]
impl LoadMode for RandomMode {
    fn mode(&self) -> Mode {
        Mode::Random
    }

    /// Members that cannot be prepared leave the pool. An empty pool is an error.
    async fn init(&mut self, ctx: &ModeContext) -> Result<(), ModeError> {
        let mut ready = Vec::with_capacity(self.pool.len());
        let mut last_err = None;
        for mut mode in self.pool.drain(..) {
            match mode.init(ctx).await {
                Ok(()) => ready.push(mode),
                Err(err) => {
                    warn!(mode = %mode.mode(), error = %err, "Dropping mode from random pool");
                    last_err = Some(err);
                }
            }
        }
        self.pool = ready;
        match last_err {
            Some(err) if self.pool.is_empty() => Err(err),
            _ => Ok(()),
        }
    }

    async fn execute(&self, ctx: &ModeContext, opts: TxOptions) -> Execution {
        let index = ctx.with_rng(|rng| rng.gen_range(0..self.pool.len().max(1)));
        match self.pool.get(index) {
            Some(mode) => mode.execute(ctx, opts).await,
            None => Execution::failed(ModeError::EmptyRandomPool),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use alloy_consensus::Transaction as _;
    use surge_primitives::Address;
    use surge_rpc::test_utils::MockNode;

    use super::*;
    use crate::context::tests::{context_for, funded_opts};

    #[test]
    fn test_pool_ignores_fixed_function() {
        let mut config = Config::default();
        config.workload.function = Some(0x54);
        let mode = RandomMode::new(&config).expect("pool");
        assert_eq!(mode.pool().collect::<Vec<_>>(), Mode::RANDOM_POOL.to_vec());
    }

    #[tokio::test]
    async fn test_init_drops_unprepared_members() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |_| {});
        let mut mode = RandomMode::new(ctx.config()).expect("pool");
        mode.init(&ctx).await.expect("init");
        assert!(!mode.pool().any(|m| m == Mode::Deploy));
        assert!(mode.pool().any(|m| m == Mode::Transaction));
    }

    #[tokio::test]
    async fn test_draws_vary() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |c| {
            c.contracts.load_tester_address = Some(Address::repeat_byte(0x10));
            c.contracts.erc20_address = Some(Address::repeat_byte(0x20));
            c.contracts.erc721_address = Some(Address::repeat_byte(0x21));
        });
        let mut mode = RandomMode::new(ctx.config()).expect("pool");
        mode.init(&ctx).await.expect("init");
        for _ in 0..30 {
            mode.execute(&ctx, funded_opts(&node, 14)).await.result.expect("sent");
        }
        let targets: HashSet<_> = node.submitted().iter().map(|tx| tx.to()).collect();
        assert!(targets.len() > 1);
    }

    #[tokio::test]
    async fn test_empty_pool_fails() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |_| {});
        let mode = RandomMode { pool: Vec::new() };
        let execution = mode.execute(&ctx, funded_opts(&node, 14)).await;
        assert!(matches!(execution.result, Err(ModeError::EmptyRandomPool)));
    }
}
