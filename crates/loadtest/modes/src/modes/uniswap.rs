use async_trait::async_trait;
use surge_config::{Mode, UniswapV3Config};
use surge_primitives::{TxOptions, U256};

use crate::{Execution, LoadMode, ModeContext, TxRequest, bindings::ExactInputSingle};

/// `exactInputSingle` swaps through a SwapRouter02 deployment.
///
/// Even nonces sell `token_in` for `token_out` and odd nonces swap back, so balances on both
/// sides of the pool are drawn down evenly. The sender receives the output.
#[derive(Debug, Clone)]
pub struct UniswapV3Mode {
    swap: UniswapV3Config,
}

impl UniswapV3Mode {
    /// Swaps using the given router and pair.
    pub const fn new(swap: UniswapV3Config) -> Self {
        Self { swap }
    }

    /// Swap parameters for the request with `nonce`.
    pub fn params(&self, opts: &TxOptions) -> ExactInputSingle {
        let (token_in, token_out) = if opts.nonce % 2 == 0 {
            (self.swap.token_in, self.swap.token_out)
        } else {
            (self.swap.token_out, self.swap.token_in)
        };
        ExactInputSingle {
            token_in,
            token_out,
            fee: self.swap.fee,
            recipient: opts.from(),
            amount_in: self.swap.amount_in,
            amount_out_minimum: U256::ZERO,
        }
    }
}

#[async_trait]
impl LoadMode for UniswapV3Mode {
    fn mode(&self) -> Mode {
        Mode::UniswapV3
    }

    async fn execute(&self, ctx: &ModeContext, opts: TxOptions) -> Execution {
        let request = self.params(&opts).call().map(|input| TxRequest::call(self.swap.swap_router, input));
        ctx.try_dispatch(opts, request).await
    }
}

#[cfg(test)]
mod tests {
    use alloy_consensus::Transaction as _;
    use surge_abi::{AbiValue, Function};
    use surge_primitives::Address;
    use surge_rpc::test_utils::MockNode;

    use super::*;
    use crate::{
        bindings::EXACT_INPUT_SINGLE_SIGNATURE,
        context::tests::{context_for, funded_opts},
    };

    const ROUTER: Address = Address::repeat_byte(0x30);
    const TOKEN_A: Address = Address::repeat_byte(0x31);
    const TOKEN_B: Address = Address::repeat_byte(0x32);

    fn swap() -> UniswapV3Config {
        UniswapV3Config {
            swap_router: ROUTER,
            token_in: TOKEN_A,
            token_out: TOKEN_B,
            fee: 3000,
            amount_in: U256::from(1_000),
        }
    }

    #[tokio::test]
    async fn test_swaps_alternate_direction() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |_| {});
        let mode = UniswapV3Mode::new(swap());
        let sender = funded_opts(&node, 15).from();
        for _ in 0..2 {
            mode.execute(&ctx, funded_opts(&node, 15)).await.result.expect("sent");
        }

        let function = Function::parse(EXACT_INPUT_SINGLE_SIGNATURE).expect("parse");
        let submitted = node.submitted();
        let pairs: Vec<_> = submitted
            .iter()
            .map(|tx| {
                assert_eq!(tx.to(), Some(ROUTER));
                let decoded = function.decode_input(tx.input()).expect("decode");
                let [AbiValue::Tuple(fields)] = decoded.as_slice() else { panic!("unexpected {decoded:?}") };
                assert_eq!(fields[3], AbiValue::Address(sender));
                assert_eq!(fields[4], AbiValue::Uint(U256::from(1_000)));
                assert_eq!(fields[5], AbiValue::Uint(U256::ZERO));
                (fields[0].clone(), fields[1].clone())
            })
            .collect();
        assert_eq!(pairs, vec![
            (AbiValue::Address(TOKEN_A), AbiValue::Address(TOKEN_B)),
            (AbiValue::Address(TOKEN_B), AbiValue::Address(TOKEN_A)),
        ]);
    }
}
