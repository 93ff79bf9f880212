//! A single sending account and its nonce bookkeeping.

use surge_primitives::{Address, Wallet};

/// A sender owned by the pool.
///
/// [`crate::AccountPool::next`] returns a copy whose [`Account::nonce`] is the nonce reserved for
/// the caller.
#[derive(Debug, Clone)]
pub struct Account {
    wallet: Wallet,
    start_nonce: u64,
    nonce: u64,
    funded: bool,
    ready: bool,
    reusable: Vec<u64>,
}

impl Account {
    /// A sender starting at `nonce`, or not ready until the nonce is loaded.
    pub(crate) fn new(wallet: Wallet, nonce: Option<u64>) -> Self {
        Self {
            wallet,
            start_nonce: nonce.unwrap_or_default(),
            nonce: nonce.unwrap_or_default(),
            funded: false,
            ready: nonce.is_some(),
            reusable: Vec::new(),
        }
    }

    /// Sender address.
    pub const fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Signing identity.
    pub const fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Nonce the account had when the run started.
    pub const fn start_nonce(&self) -> u64 {
        self.start_nonce
    }

    /// Next nonce to hand out, or the reserved nonce on a vended copy.
    pub const fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Whether the funder already paid this account.
    pub const fn is_funded(&self) -> bool {
        self.funded
    }

    /// Whether the starting nonce is known.
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Nonces waiting to be handed out again, ascending.
    pub fn reusable_nonces(&self) -> &[u64] {
        &self.reusable
    }

    /// Whether any nonce was handed out during this run.
    pub const fn is_used(&self) -> bool {
        self.nonce != self.start_nonce
    }

    /// Highest nonce handed out so far, if any.
    pub const fn last_nonce(&self) -> Option<u64> {
        if self.is_used() { Some(self.nonce - 1) } else { None }
    }

    pub(crate) fn set_loaded_nonce(&mut self, nonce: u64) {
        self.start_nonce = nonce;
        self.nonce = nonce;
        self.ready = true;
    }

    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
        self.start_nonce = self.start_nonce.min(nonce);
        self.reusable.retain(|n| *n < nonce);
    }

    pub(crate) const fn mark_funded(&mut self) {
        self.funded = true;
    }

    /// Takes the lowest reusable nonce, or the counter value which then advances.
    pub(crate) fn reserve_nonce(&mut self) -> u64 {
        if self.reusable.is_empty() {
            let nonce = self.nonce;
            self.nonce += 1;
            nonce
        } else {
            self.reusable.remove(0)
        }
    }

    /// Queues a nonce for reuse. Returns false when it was never handed out or is already queued.
    pub(crate) fn push_reusable(&mut self, nonce: u64) -> bool {
        if nonce >= self.nonce || nonce < self.start_nonce {
            return false;
        }
        match self.reusable.binary_search(&nonce) {
            Ok(_) => false,
            Err(position) => {
                self.reusable.insert(position, nonce);
                true
            }
        }
    }

    /// Copy handed to a worker, carrying the reserved nonce.
    pub(crate) fn vended(&self, nonce: u64) -> Self {
        Self { nonce, reusable: Vec::new(), ..self.clone() }
    }
}
