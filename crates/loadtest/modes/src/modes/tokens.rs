use async_trait::async_trait;
use surge_config::Mode;
use surge_primitives::TxOptions;

use crate::{
    Execution, LoadMode, ModeContext, TxRequest,
    bindings::{erc20_transfer_call, erc721_mint_batch_call},
};

/// ERC-20 transfers of `eth_amount_in_wei` token units.
#[derive(Debug, Clone, Copy, Default)]
pub struct Erc20Mode;

#[async_trait]
impl LoadMode for Erc20Mode {
    fn mode(&self) -> Mode {
        Mode::Erc20
    }

    async fn execute(&self, ctx: &ModeContext, opts: TxOptions) -> Execution {
        let amount = ctx.config().transaction.eth_amount_in_wei;
        let request = ctx
            .contracts()
            .erc20()
            .and_then(|token| Ok(TxRequest::call(token, erc20_transfer_call(ctx.recipient(), amount)?)));
        ctx.try_dispatch(opts, request).await
    }
}

/// ERC-721 batch mints of `iterations` tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct Erc721Mode;

#[async_trait]
impl LoadMode for Erc721Mode {
    fn mode(&self) -> Mode {
        Mode::Erc721
    }

    async fn execute(&self, ctx: &ModeContext, opts: TxOptions) -> Execution {
        let amount = ctx.config().workload.iterations;
        let request = ctx
            .contracts()
            .erc721()
            .and_then(|collection| Ok(TxRequest::call(collection, erc721_mint_batch_call(ctx.recipient(), amount)?)));
        ctx.try_dispatch(opts, request).await
    }
}

#[cfg(test)]
mod tests {
    use alloy_consensus::Transaction as _;
    use surge_abi::{AbiValue, Function};
    use surge_primitives::{Address, U256};
    use surge_rpc::test_utils::MockNode;

    use super::*;
    use crate::{
        ModeError,
        bindings::{ERC20_TRANSFER_SIGNATURE, ERC721_MINT_BATCH_SIGNATURE},
        context::tests::{context_for, funded_opts},
    };

    const TOKEN: Address = Address::repeat_byte(0x20);
    const COLLECTION: Address = Address::repeat_byte(0x21);
    const RECIPIENT: Address = Address::repeat_byte(0x22);

    #[tokio::test]
    async fn test_erc20_transfer() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |c| {
            c.contracts.erc20_address = Some(TOKEN);
            c.transaction.to_address = RECIPIENT;
            c.transaction.eth_amount_in_wei = U256::from(42);
        });
        Erc20Mode.execute(&ctx, funded_opts(&node, 5)).await.result.expect("sent");
        let submitted = node.submitted();
        let tx = &submitted[0];
        assert_eq!(tx.to(), Some(TOKEN));
        assert_eq!(tx.value(), U256::ZERO);
        let args = Function::parse(ERC20_TRANSFER_SIGNATURE).expect("parse").decode_input(tx.input()).expect("decode");
        assert_eq!(args, vec![AbiValue::Address(RECIPIENT), AbiValue::Uint(U256::from(42))]);
    }

    #[tokio::test]
    async fn test_erc721_mints_iterations() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |c| {
            c.contracts.erc721_address = Some(COLLECTION);
            c.transaction.to_address = RECIPIENT;
            c.workload.iterations = 3;
        });
        Erc721Mode.execute(&ctx, funded_opts(&node, 5)).await.result.expect("sent");
        let submitted = node.submitted();
        let tx = &submitted[0];
        assert_eq!(tx.to(), Some(COLLECTION));
        let args =
            Function::parse(ERC721_MINT_BATCH_SIGNATURE).expect("parse").decode_input(tx.input()).expect("decode");
        assert_eq!(args, vec![AbiValue::Address(RECIPIENT), AbiValue::uint(3)]);
    }

    #[tokio::test]
    async fn test_missing_token_is_an_error_sample() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |_| {});
        let execution = Erc721Mode.execute(&ctx, funded_opts(&node, 5)).await;
        assert!(matches!(execution.result, Err(ModeError::MissingContract("ERC-721"))));
        assert!(execution.to_sample(0, 0, 0).is_error);
    }
}
