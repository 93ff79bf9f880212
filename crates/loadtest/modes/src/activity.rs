//! Recent chain history used by recall and rpc modes.

use std::collections::HashSet;

use surge_primitives::{Address, B256};
use surge_rpc::{RpcBlock, RpcClient, RpcTransaction};
use tracing::info;

use crate::{
    ModeError,
    bindings::{BALANCE_OF_SELECTOR, TOKEN_URI_SELECTOR},
};

/// Fetches the last `recall_blocks` blocks up to the head with full transactions.
async fn recent_blocks(client: &RpcClient, recall_blocks: u64, page_size: u64) -> Result<(u64, Vec<RpcBlock>), ModeError> {
    let head = client.block_number().await?;
    let from = head.saturating_sub(recall_blocks);
    let blocks = client.blocks_in_range(from, head, page_size, true).await?;
    Ok((head, blocks))
}

/// Every transaction in the last `recall_blocks` blocks, oldest first.
pub async fn fetch_tape(
    client: &RpcClient,
    recall_blocks: u64,
    page_size: u64,
) -> Result<Vec<RpcTransaction>, ModeError> {
    let (head, blocks) = recent_blocks(client, recall_blocks, page_size).await?;
    let tape: Vec<_> = blocks.iter().flat_map(|block| block.full_transactions().iter().cloned()).collect();
    if tape.is_empty() {
        return Err(ModeError::EmptyTape(recall_blocks));
    }
    info!(transactions = tape.len(), blocks = blocks.len(), head, "Recorded transaction tape");
    Ok(tape)
}

/// Deduplicated identifiers seen in recent blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityIndex {
    /// Head block when the index was built.
    pub head: u64,
    /// Block numbers.
    pub block_numbers: Vec<u64>,
    /// Block hashes.
    pub block_hashes: Vec<B256>,
    /// Transactions, in block order.
    pub transactions: Vec<RpcTransaction>,
    /// Transaction hashes.
    pub tx_hashes: Vec<B256>,
    /// Senders and recipients.
    pub addresses: Vec<Address>,
    /// Contracts called with more than a selector.
    pub contracts: Vec<Address>,
    /// Targets of `balanceOf` calls.
    pub erc20s: Vec<Address>,
    /// Targets of `tokenURI` calls.
    pub erc721s: Vec<Address>,
}

fn push_unique<T: Copy + Eq + std::hash::Hash>(seen: &mut HashSet<T>, list: &mut Vec<T>, value: T) {
    if seen.insert(value) {
        list.push(value);
    }
}

impl ActivityIndex {
    /// Indexes already fetched blocks.
    pub fn from_blocks(head: u64, blocks: &[RpcBlock]) -> Self {
        let mut index = Self { head, ..Default::default() };
        let mut seen_blocks = HashSet::new();
        let mut seen_txs = HashSet::new();
        let mut seen_addresses = HashSet::new();
        let mut seen_contracts = HashSet::new();
        let mut seen_erc20s = HashSet::new();
        let mut seen_erc721s = HashSet::new();

        for block in blocks {
            if !seen_blocks.insert(block.hash) {
                continue;
            }
            index.block_numbers.push(block.number());
            index.block_hashes.push(block.hash);
            for tx in block.full_transactions() {
                if !seen_txs.insert(tx.hash) {
                    continue;
                }
                index.tx_hashes.push(tx.hash);
                index.transactions.push(tx.clone());
                push_unique(&mut seen_addresses, &mut index.addresses, tx.from);
                let Some(to) = tx.to else { continue };
                push_unique(&mut seen_addresses, &mut index.addresses, to);
                if tx.input.len() > 4 {
                    push_unique(&mut seen_contracts, &mut index.contracts, to);
                }
                if tx.input.starts_with(&BALANCE_OF_SELECTOR) {
                    push_unique(&mut seen_erc20s, &mut index.erc20s, to);
                }
                if tx.input.starts_with(&TOKEN_URI_SELECTOR) {
                    push_unique(&mut seen_erc721s, &mut index.erc721s, to);
                }
            }
        }
        index
    }

    /// Fetches and indexes the last `recall_blocks` blocks.
    pub async fn fetch(client: &RpcClient, recall_blocks: u64, page_size: u64) -> Result<Self, ModeError> {
        let (head, blocks) = recent_blocks(client, recall_blocks, page_size).await?;
        let index = Self::from_blocks(head, &blocks);
        info!(
            head,
            blocks = index.block_numbers.len(),
            transactions = index.transactions.len(),
            addresses = index.addresses.len(),
            contracts = index.contracts.len(),
            "Indexed chain activity"
        );
        Ok(index)
    }

    /// Fails with [`ModeError::InsufficientActivity`] when there is nothing to query.
    pub fn ensure_sufficient(&self) -> Result<(), ModeError> {
        if self.transactions.is_empty() || self.addresses.is_empty() || self.block_numbers.is_empty() || self.head == 0 {
            return Err(ModeError::InsufficientActivity {
                transactions: self.transactions.len(),
                addresses: self.addresses.len(),
                blocks: self.block_numbers.len(),
                head: self.head,
            });
        }
        Ok(())
    }
}
