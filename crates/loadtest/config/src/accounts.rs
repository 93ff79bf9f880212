//! Sending account pool options.

use std::path::PathBuf;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// How sending accounts are created, funded, and drained.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountsConfig {
    /// Number of random sending accounts; zero sends from the funding account.
    #[serde(default)]
    pub sending_accounts_count: u64,

    /// Amount given to every sending account; zero disables funding.
    #[serde(default)]
    pub funding_amount: U256,

    /// Fund every account before the run instead of on first use.
    #[serde(default)]
    pub pre_fund: bool,

    /// Send leftover balances back to the funding account after the run.
    #[serde(default)]
    pub refund_remaining_funds: bool,

    /// File with one hex private key per line to use as sending accounts.
    #[serde(default)]
    pub sending_accounts_file: Option<PathBuf>,

    /// File to write generated sending keys to.
    #[serde(default)]
    pub dump_sending_accounts_file: Option<PathBuf>,

    /// Skip accounts whose balance already covers the funding amount.
    #[serde(default)]
    pub check_balance_before_funding: bool,

    /// Recipients per aggregated funding transaction; derived from the block gas limit when unset.
    #[serde(default)]
    pub accounts_per_funding_tx: Option<u64>,
}

impl AccountsConfig {
    /// Whether sending accounts receive funds.
    pub fn funding_enabled(&self) -> bool {
        !self.funding_amount.is_zero()
    }

    /// Whether the pool holds keys other than the funding key.
    pub const fn uses_sending_accounts(&self) -> bool {
        self.sending_accounts_count > 0 || self.sending_accounts_file.is_some()
    }
}
