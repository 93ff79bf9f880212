//! Batched native-token funding through Multicall3.

use surge_abi::{AbiError, AbiValue, Function};
use surge_primitives::{Address, Bytes, MULTICALL3_ADDRESS, U256};
use surge_rpc::RpcClient;
use tracing::warn;

/// Gas budgeted per recipient of an `aggregate3Value` call.
pub const GAS_PER_FUNDED_ACCOUNT: u64 = 40_000;

/// Upper bound on recipients per funding transaction.
pub const MAX_ACCOUNTS_PER_FUNDING_TX: u64 = 700;

/// Recipients per funding transaction when the block gas limit is unknown.
pub const DEFAULT_ACCOUNTS_PER_FUNDING_TX: u64 = 400;

const AGGREGATE3_VALUE: &str = "aggregate3Value((address,bool,uint256,bytes)[])";

/// Whether Multicall3 is deployed at its canonical address.
pub async fn multicall3_available(client: &RpcClient) -> bool {
    match client.code(MULTICALL3_ADDRESS).await {
        Ok(code) => !code.is_empty(),
        Err(err) => {
            warn!(error = %err, "Unable to check for Multicall3");
            false
        }
    }
}

/// Recipients that fit in one funding transaction under the latest block gas limit.
pub async fn accounts_per_funding_tx(client: &RpcClient) -> u64 {
    match client.latest_block().await {
        Ok(block) => {
            let gas_limit = block.gas_limit.to::<u64>();
            (gas_limit / GAS_PER_FUNDED_ACCOUNT).clamp(1, MAX_ACCOUNTS_PER_FUNDING_TX)
        }
        Err(err) => {
            warn!(
                error = %err,
                fallback = DEFAULT_ACCOUNTS_PER_FUNDING_TX,
                "Failed to get block gas limit, using the default funding batch size"
            );
            DEFAULT_ACCOUNTS_PER_FUNDING_TX
        }
    }
}

/// Calldata paying `amount` to each recipient; none of the inner calls may fail.
pub fn aggregate3_value_calldata(recipients: &[Address], amount: U256) -> Result<Bytes, AbiError> {
    let calls = recipients
        .iter()
        .map(|recipient| {
            AbiValue::Tuple(vec![
                AbiValue::Address(*recipient),
                AbiValue::Bool(false),
                AbiValue::Uint(amount),
                AbiValue::Bytes(Vec::new()),
            ])
        })
        .collect();
    let function = Function::parse(AGGREGATE3_VALUE)?;
    Ok(Bytes::from(function.encode(&[AbiValue::Array(calls)])?))
}
