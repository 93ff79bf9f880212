//! The shared pool of sending accounts.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use async_trait::async_trait;
use futures::{StreamExt as _, stream::FuturesUnordered};
use parking_lot::Mutex;
use rand::{CryptoRng, RngCore};
use surge_gas::GasOracle;
use surge_primitives::{Address, Wallet};
use surge_rate::{PendingDepth, RateLimiter};
use surge_rpc::{BlockNumberOrTag, RpcClient};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{Account, AccountError, AccountPoolConfig};

#[derive(Debug, Default)]
pub(crate) struct PoolState {
    pub(crate) accounts: Vec<Account>,
    pub(crate) positions: HashMap<Address, usize>,
    cursor: usize,
    pending_cache: Option<(u64, u64)>,
}

impl PoolState {
    pub(crate) fn get_mut(&mut self, address: Address) -> Option<&mut Account> {
        let position = *self.positions.get(&address)?;
        self.accounts.get_mut(position)
    }
}

#[derive(Debug)]
pub(crate) struct PoolInner {
    pub(crate) client: RpcClient,
    pub(crate) gas: Arc<GasOracle>,
    pub(crate) funder: Wallet,
    pub(crate) config: AccountPoolConfig,
    pub(crate) state: Mutex<PoolState>,
    /// Serializes every transaction sent from the funder.
    pub(crate) funding: tokio::sync::Mutex<()>,
    throttle: RateLimiter,
    shutdown: CancellationToken,
}

impl PoolInner {
    /// Waits for the pool's own request throttle.
    pub(crate) async fn throttle(&self) -> Result<(), AccountError> {
        Ok(self.throttle.acquire(&self.shutdown).await?)
    }

    pub(crate) async fn pending_nonce(&self, address: Address) -> Result<u64, AccountError> {
        self.throttle().await?;
        Ok(self.client.transaction_count(address, BlockNumberOrTag::PENDING).await?)
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Sending accounts shared by all workers.
///
/// Cloning is cheap and every clone refers to the same accounts. Every mutation goes through a
/// single lock that is never held across a request to the endpoint.
#[derive(Debug, Clone)]
pub struct AccountPool {
    pub(crate) inner: Arc<PoolInner>,
}

impl AccountPool {
    /// Creates an empty pool funded by `funder`.
    pub fn new(client: RpcClient, gas: Arc<GasOracle>, funder: Wallet, config: AccountPoolConfig) -> Self {
        let throttle = RateLimiter::new(config.rpc_rate);
        Self {
            inner: Arc::new(PoolInner {
                client,
                gas,
                funder,
                config,
                state: Mutex::new(PoolState::default()),
                funding: tokio::sync::Mutex::new(()),
                throttle,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Pool settings.
    pub fn config(&self) -> &AccountPoolConfig {
        &self.inner.config
    }

    /// Address of the funding account.
    pub fn funder(&self) -> Address {
        self.inner.funder.address()
    }

    /// Registers a sender.
    ///
    /// With `start_nonce` the account is ready at once. Without it the pending nonce is loaded in
    /// the background, retrying until it succeeds, and the account stays not ready until then.
    /// Must be called from within a tokio runtime. Adding a known address is a no-op.
    pub fn add(&self, wallet: Wallet, start_nonce: Option<u64>) {
        let address = wallet.address();
        {
            let mut state = self.inner.state.lock();
            if state.positions.contains_key(&address) {
                debug!(%address, "Account already in pool");
                return;
            }
            let position = state.accounts.len();
            state.accounts.push(Account::new(wallet, start_nonce));
            state.positions.insert(address, position);
        }
        if start_nonce.is_none() {
            self.spawn_nonce_loader(address);
        }
    }

    /// Registers every wallet, loading their nonces in the background.
    pub fn add_all(&self, wallets: impl IntoIterator<Item = Wallet>) {
        for wallet in wallets {
            self.add(wallet, None);
        }
    }

    /// Generates `n` fresh senders. Their nonce starts at zero.
    pub fn add_random_n<R: RngCore + CryptoRng>(&self, n: u64, rng: &mut R) -> Vec<Wallet> {
        let wallets: Vec<Wallet> = (0..n).map(|_| Wallet::random(rng)).collect();
        for wallet in &wallets {
            self.add(wallet.clone(), Some(0));
        }
        debug!(accounts = n, "Added random sending accounts");
        wallets
    }

    fn spawn_nonce_loader(&self, address: Address) {
        let pool: Weak<PoolInner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                let Some(inner) = pool.upgrade() else { return };
                trace!(%address, "Loading nonce for account in background");
                match inner.pending_nonce(address).await {
                    Ok(nonce) => {
                        if let Some(account) = inner.state.lock().get_mut(address) {
                            account.set_loaded_nonce(nonce);
                        }
                        debug!(%address, nonce, "Account ready");
                        return;
                    }
                    Err(err) => {
                        warn!(%address, error = %err, "Failed to get nonce for account, retrying");
                    }
                }
                let delay = inner.config.nonce_retry_interval;
                drop(inner);
                tokio::time::sleep(delay).await;
            }
        });
    }

    /// Returns whether every account is ready, how many are, and how many there are.
    pub fn all_ready(&self) -> (bool, usize, usize) {
        let state = self.inner.state.lock();
        let total = state.accounts.len();
        let ready = state.accounts.iter().filter(|a| a.is_ready()).count();
        (ready == total, ready, total)
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.inner.state.lock().accounts.len()
    }

    /// Whether the pool has no accounts.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies of every account.
    pub fn accounts(&self) -> Vec<Account> {
        self.inner.state.lock().accounts.clone()
    }

    /// Copy of one account.
    pub fn account(&self, address: Address) -> Option<Account> {
        let mut state = self.inner.state.lock();
        state.get_mut(address).map(|a| a.clone())
    }

    /// Start and next nonce of an account, or zeros when it is unknown.
    pub fn nonces_of(&self, address: Address) -> (u64, u64) {
        self.account(address).map(|a| (a.start_nonce(), a.nonce())).unwrap_or_default()
    }

    /// Next nonce of every account, or only of those that sent something.
    pub fn nonces(&self, only_used: bool) -> HashMap<Address, u64> {
        let state = self.inner.state.lock();
        state
            .accounts
            .iter()
            .filter(|a| !only_used || a.is_used())
            .map(|a| (a.address(), a.reusable_nonces().last().copied().unwrap_or(a.nonce())))
            .collect()
    }

    /// Hands out the next account round-robin with a reserved nonce.
    ///
    /// Unfunded accounts are funded first, waiting for the transfer to be mined.
    pub async fn next(&self) -> Result<Account, AccountError> {
        let (position, needs_funding) = {
            let mut state = self.inner.state.lock();
            if state.accounts.is_empty() {
                return Err(AccountError::NoAccounts);
            }
            let position = state.cursor;
            state.cursor = (state.cursor + 1) % state.accounts.len();
            let account = &state.accounts[position];
            if !account.is_ready() {
                return Err(AccountError::NotReady(account.address()));
            }
            (position, self.inner.config.funding_enabled() && !account.is_funded())
        };

        if needs_funding {
            self.fund_position(position).await?;
        }

        let mut state = self.inner.state.lock();
        let account = &mut state.accounts[position];
        let nonce = account.reserve_nonce();
        Ok(account.vended(nonce))
    }

    /// Queues a nonce whose transaction never reached the chain.
    pub fn add_reusable_nonce(&self, address: Address, nonce: u64) -> Result<(), AccountError> {
        let mut state = self.inner.state.lock();
        let account = state.get_mut(address).ok_or(AccountError::UnknownAccount(address))?;
        if account.push_reusable(nonce) {
            trace!(%address, nonce, "Reusable nonce added");
        } else {
            debug!(%address, nonce, "Ignoring nonce that is not reusable");
        }
        Ok(())
    }

    /// Replaces an account's next nonce with its on-chain value.
    pub async fn refresh_nonce(&self, address: Address) -> Result<(), AccountError> {
        if !self.inner.state.lock().positions.contains_key(&address) {
            return Err(AccountError::UnknownAccount(address));
        }
        self.inner.throttle().await?;
        let nonce = self.inner.client.transaction_count(address, BlockNumberOrTag::LATEST).await?;
        if let Some(account) = self.inner.state.lock().get_mut(address) {
            account.set_nonce(nonce);
        }
        debug!(%address, nonce, "Nonce refreshed");
        Ok(())
    }

    /// Transactions the pool has vended that the node does not yet agree on.
    ///
    /// Sums, per account, the distance between the pool's next nonce and the node's pending
    /// nonce. The result is cached until the head block changes.
    pub async fn number_of_pending_txs(&self) -> Result<u64, AccountError> {
        self.inner.throttle().await?;
        let head = self.inner.client.block_number().await?;
        let snapshot: Vec<(Address, u64)> = {
            let state = self.inner.state.lock();
            if let Some((block, pending)) = state.pending_cache
                && block == head
            {
                debug!(pending, "Returning cached pending transactions");
                return Ok(pending);
            }
            state.accounts.iter().map(|a| (a.address(), a.nonce())).collect()
        };

        let mut lookups: FuturesUnordered<_> = snapshot
            .into_iter()
            .map(|(address, nonce)| async move {
                self.inner.pending_nonce(address).await.map(|pending| pending.abs_diff(nonce))
            })
            .collect();
        let mut pending = 0u64;
        while let Some(result) = lookups.next().await {
            pending = pending.saturating_add(result?);
        }

        debug!(pending, "Number of pending transactions");
        self.inner.state.lock().pending_cache = Some((head, pending));
        Ok(pending)
    }
}

#[async_trait]
impl PendingDepth for AccountPool {
    async fn pending_depth(&self) -> Option<u64> {
        match self.number_of_pending_txs().await {
            Ok(depth) => Some(depth),
            Err(err) => {
                warn!(error = %err, "Failed to count pending transactions");
                None
            }
        }
    }
}
