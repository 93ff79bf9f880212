use async_trait::async_trait;
use surge_config::{Mode, load_bytecode};
use surge_primitives::{Bytes, TxOptions};

use crate::{Execution, LoadMode, ModeContext, ModeError, TxRequest};

/// Deploys a fresh copy of the load test contract per request.
#[derive(Debug, Clone, Default)]
pub struct DeployMode {
    bytecode: Option<Bytes>,
}

impl DeployMode {
    /// Uses `bytecode` instead of reading the configured artifact.
    pub const fn with_bytecode(bytecode: Bytes) -> Self {
        Self { bytecode: Some(bytecode) }
    }
}

#[async_trait]
impl LoadMode for DeployMode {
    fn mode(&self) -> Mode {
        Mode::Deploy
    }

    async fn init(&mut self, ctx: &ModeContext) -> Result<(), ModeError> {
        if self.bytecode.is_none() {
            let path = ctx
                .config()
                .contracts
                .artifacts
                .load_tester
                .as_deref()
                .ok_or(ModeError::MissingBytecode("load test"))?;
            self.bytecode = Some(load_bytecode(path)?);
        }
        Ok(())
    }

    async fn execute(&self, ctx: &ModeContext, opts: TxOptions) -> Execution {
        let request = self.bytecode.clone().map(TxRequest::create).ok_or(ModeError::MissingBytecode("load test"));
        ctx.try_dispatch(opts, request).await
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use alloy_consensus::Transaction as _;
    use surge_rpc::test_utils::MockNode;

    use super::*;
    use crate::context::tests::{context_for, funded_opts};

    #[tokio::test]
    async fn test_init_reads_artifact() {
        let node = MockNode::start().await.expect("start");
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "0x6080604052").expect("write");
        let path = file.path().to_path_buf();
        let ctx = context_for(&node, |c| c.contracts.artifacts.load_tester = Some(path));

        let mut mode = DeployMode::default();
        mode.init(&ctx).await.expect("init");
        mode.execute(&ctx, funded_opts(&node, 2)).await.result.expect("deployed");

        let submitted = node.submitted();
        assert_eq!(submitted[0].to(), None);
        assert_eq!(submitted[0].input().as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
    }

    #[tokio::test]
    async fn test_init_without_artifact_fails() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |_| {});
        let err = DeployMode::default().init(&ctx).await.expect_err("no artifact");
        assert!(matches!(err, ModeError::MissingBytecode(_)));
    }

    #[tokio::test]
    async fn test_call_only_deploy_uses_create_call() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |c| c.call_only = true);
        let mode = DeployMode::with_bytecode(Bytes::from_static(&[0x60, 0x00]));
        let execution = mode.execute(&ctx, funded_opts(&node, 2)).await;
        execution.result.expect("called");
        assert_eq!(node.calls("eth_call"), 1);
        assert!(node.submitted().is_empty());
    }
}
