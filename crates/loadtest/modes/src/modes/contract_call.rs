use async_trait::async_trait;
use surge_abi::encode_function_call;
use surge_config::{Config, Mode};
use surge_primitives::{Address, Bytes, TxOptions, U256};
use tracing::{info, warn};

use crate::{Execution, LoadMode, ModeContext, ModeError, TxRequest};

/// A resolved user call: target, calldata, and attached value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCall {
    /// Contract called.
    pub to: Address,
    /// Calldata sent on every request.
    pub input: Bytes,
    /// Value attached to every request.
    pub value: U256,
}

impl PreparedCall {
    /// Resolves the call from the workload settings.
    ///
    /// Raw calldata wins over a function signature. Value is attached only for payable calls.
    pub fn from_config(config: &Config) -> Result<Self, ModeError> {
        let workload = &config.workload;
        let to = workload.contract_address.ok_or(ModeError::MissingContract("contract-call target"))?;
        let encoded = match (&workload.calldata, &workload.function_signature) {
            (Some(calldata), _) => calldata.trim().to_string(),
            (None, Some(signature)) => encode_function_call(signature, workload.function_args.as_slice())?,
            (None, None) => return Err(ModeError::MissingCalldata),
        };
        let input = hex::decode(encoded.strip_prefix("0x").unwrap_or(&encoded))?;
        let value = if workload.contract_call_payable { config.transaction.eth_amount_in_wei } else { U256::ZERO };
        Ok(Self { to, input: input.into(), value })
    }
}

/// Repeated calls of one user supplied contract function.
#[derive(Debug, Clone, Default)]
pub struct ContractCallMode {
    call: Option<PreparedCall>,
}

#[async_trait]
impl LoadMode for ContractCallMode {
    fn mode(&self) -> Mode {
        Mode::ContractCall
    }

    /// Resolves the call once. A call that cannot be encoded fails each request instead of the run.
    async fn init(&mut self, ctx: &ModeContext) -> Result<(), ModeError> {
        match PreparedCall::from_config(ctx.config()) {
            Ok(call) => {
                info!(to = %call.to, input_len = call.input.len(), value = %call.value, "Prepared contract call");
                self.call = Some(call);
            }
            Err(err) => warn!(error = %err, "Failed to prepare contract call, every request will fail"),
        }
        Ok(())
    }

    async fn execute(&self, ctx: &ModeContext, opts: TxOptions) -> Execution {
        let call = match &self.call {
            Some(call) => call.clone(),
            None => match PreparedCall::from_config(ctx.config()) {
                Ok(call) => call,
                Err(err) => return Execution::failed(err),
            },
        };
        let opts = opts.with_value(call.value);
        ctx.dispatch_tx(opts, TxRequest::call(call.to, call.input)).await
    }
}

#[cfg(test)]
mod tests {
    use alloy_consensus::Transaction as _;
    use rstest::rstest;
    use surge_abi::selector;
    use surge_rpc::test_utils::{MOCK_GAS_ESTIMATE, MockNode};

    use super::*;
    use crate::context::tests::{context_for, funded_opts};

    const TARGET: Address = Address::repeat_byte(0x30);

    fn config(calldata: Option<&str>, signature: Option<&str>, args: &[&str]) -> Config {
        let mut config = Config::default();
        config.workload.contract_address = Some(TARGET);
        config.workload.calldata = calldata.map(str::to_string);
        config.workload.function_signature = signature.map(str::to_string);
        config.workload.function_args = args.iter().map(|a| a.to_string()).collect();
        config
    }

    #[rstest]
    #[case("0xa9059cbb", vec![0xa9, 0x05, 0x9c, 0xbb])]
    #[case("a9059cbb", vec![0xa9, 0x05, 0x9c, 0xbb])]
    #[case("0x", vec![])]
    fn test_raw_calldata(#[case] calldata: &str, #[case] expected: Vec<u8>) {
        let call = PreparedCall::from_config(&config(Some(calldata), None, &[])).expect("prepared");
        assert_eq!(call.input.to_vec(), expected);
        assert_eq!(call.value, U256::ZERO);
    }

    #[test]
    fn test_signature_is_encoded() {
        let call = PreparedCall::from_config(&config(None, Some("approve(address,uint256)"), &[
            "0x0000000000000000000000000000000000000001",
            "5",
        ]))
        .expect("prepared");
        assert_eq!(call.input[..4], selector("approve(address,uint256)").expect("selector"));
        assert_eq!(call.input.len(), 68);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(PreparedCall::from_config(&config(None, None, &[])), Err(ModeError::MissingCalldata)));
        assert!(matches!(
            PreparedCall::from_config(&config(Some("0xzz"), None, &[])),
            Err(ModeError::InvalidCalldata(_))
        ));
        let mut no_target = config(Some("0x"), None, &[]);
        no_target.workload.contract_address = None;
        assert!(matches!(PreparedCall::from_config(&no_target), Err(ModeError::MissingContract(_))));
    }

    #[tokio::test]
    async fn test_unencodable_call_fails_each_request() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |c| {
            c.workload.contract_address = Some(TARGET);
            c.workload.function_signature = Some("approve(address,uint256)".to_string());
            c.workload.function_args = vec!["not-an-address".to_string(), "5".to_string()];
        });
        let mut mode = ContractCallMode::default();
        mode.init(&ctx).await.expect("init");
        for seed in 1..4 {
            let execution = mode.execute(&ctx, funded_opts(&node, seed)).await;
            assert!(matches!(execution.result, Err(ModeError::Abi(_))));
            assert!(execution.result.as_ref().unwrap_err().submission_kind().is_reusable());
        }
        assert!(node.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_payable_call_estimates_gas() {
        let node = MockNode::start().await.expect("start");
        let ctx = context_for(&node, |c| {
            *c = config(Some("0xd09de08a"), None, &[]);
            c.workload.contract_call_payable = true;
            c.transaction.eth_amount_in_wei = U256::from(9);
        });
        let mut mode = ContractCallMode::default();
        mode.init(&ctx).await.expect("init");
        mode.execute(&ctx, funded_opts(&node, 8)).await.result.expect("sent");
        let submitted = node.submitted();
        let tx = &submitted[0];
        assert_eq!(tx.to(), Some(TARGET));
        assert_eq!(tx.value(), U256::from(9));
        assert_eq!(tx.gas_limit(), MOCK_GAS_ESTIMATE);
    }
}
