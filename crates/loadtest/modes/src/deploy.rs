//! One-off contract deployments ahead of a run.

use surge_primitives::{Address, Bytes, TxKind, TxOptions};
use surge_rpc::{CallRequest, ReceiptPolicy, RpcClient, wait_for_receipt};
use tracing::{debug, info};

use crate::ModeError;

/// Deploys `bytecode` from `opts`' sender and returns the created address once mined.
///
/// A zero gas limit in `opts` is estimated first.
pub async fn deploy_contract(
    client: &RpcClient,
    mut opts: TxOptions,
    bytecode: Bytes,
    policy: ReceiptPolicy,
) -> Result<Address, ModeError> {
    if opts.gas_limit == 0 {
        let request = CallRequest { from: Some(opts.from()), input: Some(bytecode.clone()), ..Default::default() };
        opts.gas_limit = client.estimate_gas(&request).await?;
        debug!(gas = opts.gas_limit, "Estimated deployment gas");
    }
    let signed = opts.sign(TxKind::Create, bytecode)?;
    let hash = client.send_raw_transaction(&signed.raw).await?;
    let receipt = wait_for_receipt(client, hash, policy).await?;
    if !receipt.is_success() {
        return Err(ModeError::DeploymentReverted(hash));
    }
    let address = receipt.contract_address.ok_or(ModeError::NoContractAddress(hash))?;
    info!(%address, %hash, block = receipt.block_number(), "Deployed contract");
    Ok(address)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use surge_rpc::test_utils::MockNode;

    use super::*;
    use crate::context::tests::funded_opts;

    fn policy() -> ReceiptPolicy {
        ReceiptPolicy::default().with_max_retries(3).with_initial_delay(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_deploy_returns_created_address() {
        let node = MockNode::start().await.expect("start");
        let opts = funded_opts(&node, 4);
        let expected = opts.from().create(opts.nonce);
        let code = Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]);
        let address = deploy_contract(&node.client(), opts, code.clone(), policy()).await.expect("deploy");
        assert_eq!(address, expected);
        assert_eq!(node.client().code(address).await.expect("code"), code);
    }

    #[tokio::test]
    async fn test_reverted_deployment() {
        let node = MockNode::start().await.expect("start");
        node.set_revert(true);
        let err = deploy_contract(&node.client(), funded_opts(&node, 4), Bytes::from_static(&[0x00]), policy())
            .await
            .expect_err("reverted");
        assert!(matches!(err, ModeError::DeploymentReverted(_)));
    }
}
