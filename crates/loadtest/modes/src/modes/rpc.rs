//! Weighted read-only JSON-RPC traffic against recently seen chain data.

use async_trait::async_trait;
use rand::{Rng, seq::SliceRandom as _};
use surge_config::Mode;
use surge_primitives::{Address, TxOptions};
use surge_rpc::{BlockNumberOrTag, CallRequest, LogFilter, RpcError};

use crate::{ActivityIndex, Execution, LoadMode, ModeContext, ModeError, bindings::balance_of_call};

/// Upper bound of the draw that selects an [`RpcCall`].
pub const RPC_WEIGHT_TOTAL: u64 = 300;

/// One read issued by rpc mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcCall {
    /// `eth_gasPrice`.
    GasPrice,
    /// `eth_estimateGas` of a seen transaction.
    EstimateGas,
    /// `eth_getTransactionCount` of a seen address.
    TransactionCount,
    /// `eth_getCode` of a seen contract.
    Code,
    /// `eth_getBlockByNumber` below the head.
    BlockByNumber,
    /// `eth_getTransactionByHash`.
    TransactionByHash,
    /// `eth_getBalance`.
    Balance,
    /// `eth_getTransactionReceipt`.
    TransactionReceipt,
    /// `eth_getLogs` over one seen block.
    Logs,
    /// `balanceOf` calls against a token and a collection.
    TokenBalances,
}

impl RpcCall {
    /// Maps a draw in `[0, RPC_WEIGHT_TOTAL)` to a call.
    pub const fn from_draw(draw: u64) -> Self {
        match draw {
            0..10 => Self::GasPrice,
            10..21 => Self::EstimateGas,
            21..33 => Self::TransactionCount,
            33..47 => Self::Code,
            47..64 => Self::BlockByNumber,
            64..84 => Self::TransactionByHash,
            84..109 => Self::Balance,
            109..142 => Self::TransactionReceipt,
            142..192 => Self::Logs,
            _ => Self::TokenBalances,
        }
    }
}

/// Read-only mix of JSON-RPC calls. Never sends transactions.
#[derive(Debug, Clone, Default)]
pub struct RpcMode {
    index: ActivityIndex,
}

impl RpcMode {
    /// Uses an already built index.
    pub const fn with_index(index: ActivityIndex) -> Self {
        Self { index }
    }

    /// The index calls draw from.
    pub const fn index(&self) -> &ActivityIndex {
        &self.index
    }

    fn random_address<R: Rng>(&self, rng: &mut R) -> Address {
        self.index.addresses.choose(rng).copied().unwrap_or_default()
    }

    /// Token and collection to query, preferring ones seen on chain.
    fn token_targets<R: Rng>(&self, ctx: &ModeContext, rng: &mut R) -> Vec<Address> {
        let erc20 = self.index.erc20s.choose(rng).copied().or(ctx.contracts().erc20);
        let erc721 = self.index.erc721s.choose(rng).copied().or(ctx.contracts().erc721);
        erc20.into_iter().chain(erc721).collect()
    }
}

#[async_trait]
impl LoadMode for RpcMode {
    fn mode(&self) -> Mode {
        Mode::Rpc
    }

    async fn init(&mut self, ctx: &ModeContext) -> Result<(), ModeError> {
        let config = ctx.config();
        let index = ActivityIndex::fetch(ctx.client(), config.workload.recall_blocks, config.block_batch_size).await?;
        index.ensure_sufficient()?;
        self.index = index;
        Ok(())
    }

    async fn execute(&self, ctx: &ModeContext, _opts: TxOptions) -> Execution {
        let client = ctx.client();
        let index = &self.index;
        if let Err(err) = index.ensure_sufficient() {
            return Execution::failed(err);
        }
        let call = ctx.with_rng(|rng| RpcCall::from_draw(rng.gen_range(0..RPC_WEIGHT_TOTAL)));
        match call {
            RpcCall::GasPrice => ctx.timed(client.gas_price()).await,
            RpcCall::EstimateGas => {
                let tx = ctx.with_rng(|rng| index.transactions.choose(rng).cloned().unwrap_or_default());
                let request = CallRequest {
                    from: Some(tx.from),
                    to: tx.to,
                    value: Some(tx.value),
                    input: Some(tx.input),
                    ..Default::default()
                };
                ctx.timed(client.estimate_gas(&request)).await
            }
            RpcCall::TransactionCount => {
                let address = ctx.with_rng(|rng| self.random_address(rng));
                ctx.timed(client.transaction_count(address, BlockNumberOrTag::LATEST)).await
            }
            RpcCall::Code => {
                let address = ctx.with_rng(|rng| {
                    index.contracts.choose(rng).copied().unwrap_or_else(|| self.random_address(rng))
                });
                ctx.timed(client.code(address)).await
            }
            RpcCall::BlockByNumber => {
                let number = ctx.with_rng(|rng| rng.gen_range(0..index.head));
                ctx.timed(client.block_by_number(BlockNumberOrTag::from(number), false)).await
            }
            RpcCall::TransactionByHash => {
                let hash = ctx.with_rng(|rng| index.tx_hashes.choose(rng).copied().unwrap_or_default());
                ctx.timed(client.transaction_by_hash(hash)).await
            }
            RpcCall::Balance => {
                let address = ctx.with_rng(|rng| self.random_address(rng));
                ctx.timed(client.balance(address, BlockNumberOrTag::LATEST)).await
            }
            RpcCall::TransactionReceipt => {
                let hash = ctx.with_rng(|rng| index.tx_hashes.choose(rng).copied().unwrap_or_default());
                ctx.timed(client.transaction_receipt(hash)).await
            }
            RpcCall::Logs => {
                let number = ctx.with_rng(|rng| index.block_numbers.choose(rng).copied().unwrap_or(index.head));
                ctx.timed(client.logs(&LogFilter::range(number, number))).await
            }
            RpcCall::TokenBalances => {
                let (owner, targets) = ctx.with_rng(|rng| (self.random_address(rng), self.token_targets(ctx, rng)));
                if targets.is_empty() {
                    return Execution::failed(ModeError::MissingContract("ERC-20"));
                }
                let input = match balance_of_call(owner) {
                    Ok(input) => input,
                    Err(err) => return Execution::failed(err),
                };
                ctx.timed(async {
                    for target in targets {
                        let request = CallRequest::new(target, input.clone()).with_from(owner);
                        client.call(&request, BlockNumberOrTag::LATEST).await?;
                    }
                    Ok::<_, RpcError>(())
                })
                .await
            }
        }
    }
}
