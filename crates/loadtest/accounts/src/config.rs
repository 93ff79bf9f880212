//! Account pool settings.

use std::time::Duration;

use surge_primitives::U256;

/// Requests per second the pool itself issues against the endpoint.
pub const DEFAULT_POOL_RPC_RATE: f64 = 20.0;

/// Behaviour of an [`crate::AccountPool`].
#[derive(Debug, Clone, PartialEq)]
pub struct AccountPoolConfig {
    /// Chain id used to sign funding and refund transfers.
    pub chain_id: u64,
    /// Wei sent to each sender; zero disables funding.
    pub funding_amount: U256,
    /// The run only issues `eth_call`, so nothing is funded.
    pub call_only: bool,
    /// Send leftover balances back to the funder at the end.
    pub refund_remaining_funds: bool,
    /// Skip senders whose balance already covers `funding_amount`.
    pub check_balance_before_funding: bool,
    /// Override for the Multicall3 batch size.
    pub accounts_per_funding_tx: Option<u64>,
    /// Throttle for the pool's own RPC traffic; zero disables it.
    pub rpc_rate: f64,
    /// Delay between attempts to load a sender's nonce.
    pub nonce_retry_interval: Duration,
    /// Deadline for each funding or refund receipt.
    pub receipt_timeout: Duration,
}

impl AccountPoolConfig {
    /// Settings for the given chain with funding disabled.
    pub const fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            funding_amount: U256::ZERO,
            call_only: false,
            refund_remaining_funds: false,
            check_balance_before_funding: false,
            accounts_per_funding_tx: None,
            rpc_rate: DEFAULT_POOL_RPC_RATE,
            nonce_retry_interval: Duration::from_secs(1),
            receipt_timeout: Duration::from_secs(60),
        }
    }

    /// Sets the amount sent to every sender.
    #[must_use]
    pub const fn with_funding_amount(mut self, funding_amount: U256) -> Self {
        self.funding_amount = funding_amount;
        self
    }

    /// Marks the run as call-only.
    #[must_use]
    pub const fn with_call_only(mut self, call_only: bool) -> Self {
        self.call_only = call_only;
        self
    }

    /// Enables refunds at the end of the run.
    #[must_use]
    pub const fn with_refund_remaining_funds(mut self, refund: bool) -> Self {
        self.refund_remaining_funds = refund;
        self
    }

    /// Enables the balance check before funding.
    #[must_use]
    pub const fn with_check_balance_before_funding(mut self, check: bool) -> Self {
        self.check_balance_before_funding = check;
        self
    }

    /// Overrides the Multicall3 batch size.
    #[must_use]
    pub const fn with_accounts_per_funding_tx(mut self, accounts: Option<u64>) -> Self {
        self.accounts_per_funding_tx = accounts;
        self
    }

    /// Sets the pool's own request rate.
    #[must_use]
    pub const fn with_rpc_rate(mut self, rpc_rate: f64) -> Self {
        self.rpc_rate = rpc_rate;
        self
    }

    /// Sets the nonce loading retry interval.
    #[must_use]
    pub const fn with_nonce_retry_interval(mut self, interval: Duration) -> Self {
        self.nonce_retry_interval = interval;
        self
    }

    /// Sets the per-receipt deadline.
    #[must_use]
    pub const fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Whether senders are funded at all.
    pub fn funding_enabled(&self) -> bool {
        !self.call_only && !self.funding_amount.is_zero()
    }

    /// Whether leftover balances go back to the funder.
    pub fn refund_enabled(&self) -> bool {
        self.funding_enabled() && self.refund_remaining_funds
    }
}
