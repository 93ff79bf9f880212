//! Funding senders from the funder and returning what is left.

use futures::{StreamExt as _, stream::FuturesUnordered};
use surge_primitives::{
    Address, B256, Bytes, GWEI, GasPricing, MULTICALL3_ADDRESS, SignedTx, TRANSFER_GAS, TxKind,
    TxOptions, U256, Wallet,
};
use surge_rpc::{BlockNumberOrTag, CallRequest, ReceiptPolicy, wait_for_receipt};
use tracing::{debug, error, info, warn};

use crate::{
    AccountError, AccountPool, accounts_per_funding_tx, aggregate3_value_calldata, multicall3_available,
};

/// Funder balance needed to pay `amount` to `accounts` senders with one transfer each, plus one
/// gwei of slack per sender.
pub(crate) fn required_funding(accounts: usize, amount: U256, gas_price: u128) -> U256 {
    let n = U256::from(accounts);
    let fees = U256::from(TRANSFER_GAS) * U256::from(gas_price);
    n * amount + n * fees + n * U256::from(GWEI)
}

/// Refund amount after an `overshot` rejection, or `None` once nothing is left to send.
pub(crate) fn reduce_for_overshot(amount: U256, overshot: U256, fee: U256) -> Option<U256> {
    amount.checked_sub(overshot)?.checked_sub(fee).filter(|left| !left.is_zero())
}

/// A funding transaction and the account positions it pays.
type SentFunding = (B256, Vec<usize>);

impl AccountPool {
    /// Sends `funding_amount` to every sender that still needs it and waits until all transfers
    /// are mined.
    ///
    /// Uses Multicall3 batches when the contract is deployed, plain transfers otherwise. When any
    /// transfer fails the senders that were paid are refunded, if refunds are enabled, before
    /// [`AccountError::FundingFailed`] is returned.
    pub async fn fund_accounts(&self) -> Result<(), AccountError> {
        let inner = &self.inner;
        if !inner.config.funding_enabled() {
            info!(
                amount = %inner.config.funding_amount,
                "Account funding is disabled, skipping funding of sending accounts"
            );
            return Ok(());
        }
        let _funding = inner.funding.lock().await;

        let recipients = self.recipients_to_fund().await?;
        if recipients.is_empty() {
            info!("All sending accounts are already funded");
            return Ok(());
        }

        let pricing = inner.gas.suggest().await;
        let funder = inner.funder.address();
        inner.throttle().await?;
        let balance = inner.client.balance(funder, BlockNumberOrTag::LATEST).await?;
        let needed = required_funding(recipients.len(), inner.config.funding_amount, pricing.max_fee());
        if balance < needed {
            error!(
                address = %funder,
                %balance,
                %needed,
                "Funding account balance can't cover the funding amount for all accounts"
            );
            return Err(AccountError::InsufficientFunder { address: funder, balance, needed });
        }

        let outcome = if multicall3_available(&inner.client).await {
            info!(address = %MULTICALL3_ADDRESS, "Multicall3 is supported and will be used to fund accounts");
            self.fund_with_multicall(&recipients, pricing).await
        } else {
            info!("Multicall3 is not supported, will use EOA transfers to fund accounts");
            self.fund_with_transfers(&recipients, pricing).await
        };

        match outcome {
            Ok(()) => {
                info!(accounts = recipients.len(), "All sending accounts funded");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Funding failed, returning funds from funded accounts");
                if let Err(refund) = self.refund_locked().await {
                    error!(error = %refund, "Failed to return funds after funding failure");
                }
                Err(err)
            }
        }
    }

    /// Positions and addresses of senders that still need funding.
    async fn recipients_to_fund(&self) -> Result<Vec<(usize, Address)>, AccountError> {
        let funder = self.inner.funder.address();
        let candidates: Vec<(usize, Address)> = {
            let state = self.inner.state.lock();
            state
                .accounts
                .iter()
                .enumerate()
                .filter(|(_, account)| !account.is_funded() && account.address() != funder)
                .map(|(position, account)| (position, account.address()))
                .collect()
        };

        let mut recipients = Vec::with_capacity(candidates.len());
        for (position, address) in candidates {
            if self.already_funded(address).await? {
                self.inner.state.lock().accounts[position].mark_funded();
            } else {
                recipients.push((position, address));
            }
        }
        Ok(recipients)
    }

    /// Whether the balance check is on and the sender already holds the funding amount.
    async fn already_funded(&self, address: Address) -> Result<bool, AccountError> {
        if !self.inner.config.check_balance_before_funding {
            return Ok(false);
        }
        self.inner.throttle().await?;
        let balance = self.inner.client.balance(address, BlockNumberOrTag::LATEST).await?;
        Ok(balance >= self.inner.config.funding_amount)
    }

    fn transfer(
        &self,
        wallet: &Wallet,
        nonce: u64,
        to: Address,
        value: U256,
        pricing: GasPricing,
    ) -> Result<SignedTx, AccountError> {
        Ok(TxOptions::new(wallet.clone(), self.inner.config.chain_id)
            .with_nonce(nonce)
            .with_gas_limit(TRANSFER_GAS)
            .with_pricing(pricing)
            .with_value(value)
            .sign(TxKind::Call(to), Bytes::new())?)
    }

    async fn fund_with_multicall(
        &self,
        recipients: &[(usize, Address)],
        pricing: GasPricing,
    ) -> Result<(), AccountError> {
        let inner = &self.inner;
        let per_tx = match inner.config.accounts_per_funding_tx.filter(|n| *n > 0) {
            Some(n) => n,
            None => accounts_per_funding_tx(&inner.client).await,
        };
        debug!(per_tx, "Funding sending accounts with Multicall3");

        let amount = inner.config.funding_amount;
        let funder = inner.funder.address();
        let mut nonce = inner.pending_nonce(funder).await?;
        let mut sent: Vec<SentFunding> = Vec::new();
        let mut failed = 0usize;
        let chunks: Vec<&[(usize, Address)]> = recipients.chunks(per_tx as usize).collect();
        let total = chunks.len();

        for (index, chunk) in chunks.into_iter().enumerate() {
            let addresses: Vec<Address> = chunk.iter().map(|(_, address)| *address).collect();
            let input = aggregate3_value_calldata(&addresses, amount)?;
            let value = amount * U256::from(chunk.len());
            let request =
                CallRequest::new(MULTICALL3_ADDRESS, input.clone()).with_from(funder).with_value(value);
            inner.throttle().await?;
            let gas_limit = inner.client.estimate_gas(&request).await?;
            let tx = TxOptions::new(inner.funder.clone(), inner.config.chain_id)
                .with_nonce(nonce)
                .with_gas_limit(gas_limit)
                .with_pricing(pricing)
                .with_value(value)
                .sign(TxKind::Call(MULTICALL3_ADDRESS), input)?;

            inner.throttle().await?;
            match inner.client.send_raw_transaction(&tx.raw).await {
                Ok(_) => {
                    nonce += 1;
                    info!(
                        tx_hash = %tx.hash,
                        done = index + 1,
                        of = total,
                        "Multicall3 transaction to fund accounts sent"
                    );
                    sent.push((tx.hash, chunk.iter().map(|(position, _)| *position).collect()));
                }
                Err(err) => {
                    error!(error = %err, "Failed to fund accounts with Multicall3");
                    failed += 1;
                }
            }
        }

        info!("All funding transactions sent, waiting for confirmation");
        self.confirm_funding(sent, failed, total).await
    }

    async fn fund_with_transfers(
        &self,
        recipients: &[(usize, Address)],
        pricing: GasPricing,
    ) -> Result<(), AccountError> {
        debug!(accounts = recipients.len(), "Funding sending accounts with EOA transfers");
        let inner = &*self.inner;
        let start = inner.pending_nonce(inner.funder.address()).await?;
        let mut transfers = Vec::with_capacity(recipients.len());
        for (nonce, (position, address)) in (start..).zip(recipients) {
            let tx = self.transfer(&inner.funder, nonce, *address, inner.config.funding_amount, pricing)?;
            transfers.push((nonce, *position, *address, tx));
        }

        let mut sends: FuturesUnordered<_> = transfers
            .into_iter()
            .map(|(nonce, position, address, tx)| async move {
                let result = match inner.throttle().await {
                    Ok(()) => inner.client.send_raw_transaction(&tx.raw).await.map_err(AccountError::from),
                    Err(err) => Err(err),
                };
                (nonce, position, address, tx.hash, result)
            })
            .collect();

        let mut accepted = Vec::with_capacity(recipients.len());
        let mut first_gap = None::<u64>;
        let mut failed = 0usize;
        while let Some((nonce, position, address, hash, result)) = sends.next().await {
            match result {
                Ok(_) => {
                    debug!(%address, tx_hash = %hash, "Transaction to fund account sent");
                    accepted.push((nonce, hash, position));
                }
                Err(err) => {
                    error!(%address, nonce, error = %err, "Failed to fund account");
                    first_gap = Some(first_gap.map_or(nonce, |gap| gap.min(nonce)));
                    failed += 1;
                }
            }
        }

        // Transfers above a rejected nonce cannot be mined.
        let mut sent: Vec<SentFunding> = Vec::with_capacity(accepted.len());
        for (nonce, hash, position) in accepted {
            if first_gap.is_some_and(|gap| nonce > gap) {
                warn!(tx_hash = %hash, nonce, "Funding transfer is stuck behind a rejected nonce");
                failed += 1;
            } else {
                sent.push((hash, vec![position]));
            }
        }

        info!(sent = sent.len(), failed, "All funding transactions sent, waiting for confirmation");
        self.confirm_funding(sent, failed, recipients.len()).await
    }

    /// Waits for every funding receipt and marks the paid accounts.
    async fn confirm_funding(
        &self,
        sent: Vec<SentFunding>,
        mut failed: usize,
        total: usize,
    ) -> Result<(), AccountError> {
        let inner = &*self.inner;
        let policy = ReceiptPolicy::default().with_timeout(inner.config.receipt_timeout);
        let mut waits: FuturesUnordered<_> = sent
            .into_iter()
            .map(|(hash, positions)| async move {
                (hash, positions, wait_for_receipt(&inner.client, hash, policy).await)
            })
            .collect();

        while let Some((hash, positions, outcome)) = waits.next().await {
            match outcome {
                Ok(receipt) if receipt.is_success() => {
                    let mut state = inner.state.lock();
                    for position in positions {
                        state.accounts[position].mark_funded();
                    }
                    debug!(tx_hash = %hash, "Transaction to fund accounts confirmed");
                }
                Ok(_) => {
                    error!(tx_hash = %hash, "Transaction to fund accounts has failed");
                    failed += 1;
                }
                Err(err) => {
                    error!(tx_hash = %hash, error = %err, "Failed to wait for transaction to fund accounts");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(AccountError::FundingFailed { failed, total });
        }
        Ok(())
    }

    /// Funds one sender and waits for the transfer to be mined.
    pub(crate) async fn fund_position(&self, position: usize) -> Result<(), AccountError> {
        let inner = &self.inner;
        let _funding = inner.funding.lock().await;
        let address = {
            let state = inner.state.lock();
            let account = &state.accounts[position];
            if account.is_funded() {
                return Ok(());
            }
            account.address()
        };
        if address == inner.funder.address() || self.already_funded(address).await? {
            inner.state.lock().accounts[position].mark_funded();
            return Ok(());
        }

        let pricing = inner.gas.suggest().await;
        let nonce = inner.pending_nonce(inner.funder.address()).await?;
        let tx = self.transfer(&inner.funder, nonce, address, inner.config.funding_amount, pricing)?;
        inner.throttle().await?;
        inner.client.send_raw_transaction(&tx.raw).await?;
        debug!(%address, amount = %inner.config.funding_amount, "Waiting for account to get funded");

        let policy = ReceiptPolicy::default().with_timeout(inner.config.receipt_timeout);
        let receipt = wait_for_receipt(&inner.client, tx.hash, policy).await?;
        if !receipt.is_success() {
            error!(%address, tx_hash = %tx.hash, "Transaction to fund account has failed");
            return Err(AccountError::Reverted(tx.hash));
        }
        inner.state.lock().accounts[position].mark_funded();
        debug!(%address, "Account funded");
        Ok(())
    }

    /// Sends every funded sender's balance, minus three transfer fees, back to the funder.
    ///
    /// A no-op unless both funding and refunds are enabled. Rejections that report an `overshot`
    /// amount are retried with the amount lowered accordingly.
    pub async fn return_funds(&self) -> Result<(), AccountError> {
        if !self.inner.config.refund_enabled() {
            debug!(
                refund = self.inner.config.refund_remaining_funds,
                "Account refunding is disabled, skipping returning funds from sending accounts"
            );
            return Ok(());
        }
        let _funding = self.inner.funding.lock().await;
        self.refund_locked().await
    }

    async fn refund_locked(&self) -> Result<(), AccountError> {
        let inner = &self.inner;
        if !inner.config.refund_enabled() {
            return Ok(());
        }
        info!("Returning funds from sending accounts back to the funding account");

        let pricing = inner.gas.suggest().await;
        let fee = U256::from(TRANSFER_GAS) * U256::from(pricing.max_fee());
        let funder = inner.funder.address();
        inner.throttle().await?;
        let balance_before = inner.client.balance(funder, BlockNumberOrTag::LATEST).await?;
        debug!(address = %funder, balance = %balance_before, "Funding account balance before funds returned");

        let senders: Vec<Wallet> = {
            let state = inner.state.lock();
            state
                .accounts
                .iter()
                .filter(|account| account.is_funded() && account.address() != funder)
                .map(|account| account.wallet().clone())
                .collect()
        };

        let mut first_error = None;
        let mut refunds: FuturesUnordered<_> =
            senders.iter().map(|wallet| self.refund_one(wallet, pricing, fee)).collect();
        let mut sent = Vec::new();
        while let Some(result) = refunds.next().await {
            match result {
                Ok(Some(hash)) => sent.push(hash),
                Ok(None) => {}
                Err(err) => {
                    error!(error = %err, "Unable to return funds");
                    first_error.get_or_insert(err);
                }
            }
        }
        drop(refunds);

        let policy = ReceiptPolicy::default().with_timeout(inner.config.receipt_timeout);
        let mut waits: FuturesUnordered<_> = sent
            .into_iter()
            .map(|hash| async move { (hash, wait_for_receipt(&inner.client, hash, policy).await) })
            .collect();
        while let Some((hash, outcome)) = waits.next().await {
            match outcome {
                Ok(_) => debug!(tx_hash = %hash, "Transaction to return funds confirmed"),
                Err(err) => {
                    error!(tx_hash = %hash, error = %err, "Transaction to return funds failed");
                    first_error.get_or_insert(err.into());
                }
            }
        }
        drop(waits);

        inner.throttle().await?;
        let balance_after = inner.client.balance(funder, BlockNumberOrTag::LATEST).await?;
        info!(
            address = %funder,
            previous_balance = %balance_before,
            current_balance = %balance_after,
            "Funds returned from sending accounts"
        );
        first_error.map_or(Ok(()), Err)
    }

    /// Sends one sender's balance back, returning the refund hash if anything was sent.
    async fn refund_one(
        &self,
        wallet: &Wallet,
        pricing: GasPricing,
        fee: U256,
    ) -> Result<Option<B256>, AccountError> {
        let inner = &self.inner;
        let address = wallet.address();
        let reserve = fee * U256::from(3);
        inner.throttle().await?;
        let balance = inner.client.balance(address, BlockNumberOrTag::LATEST).await?;
        if balance <= reserve {
            debug!(%address, %balance, "Balance does not cover the refund fee, skipping");
            return Ok(None);
        }
        let mut amount = balance - reserve;
        let nonce = inner.pending_nonce(address).await?;

        loop {
            let tx = self.transfer(wallet, nonce, inner.funder.address(), amount, pricing)?;
            debug!(from = %address, %amount, %balance, tx_hash = %tx.hash, "Returning funds");
            inner.throttle().await?;
            match inner.client.send_raw_transaction(&tx.raw).await {
                Ok(_) => return Ok(Some(tx.hash)),
                Err(err) => {
                    let Some(overshot) = err.overshot() else {
                        return Err(err.into());
                    };
                    info!(
                        from = %address,
                        %amount,
                        %overshot,
                        "Transaction amount overshot, adjusting amount and retrying"
                    );
                    amount = reduce_for_overshot(amount, overshot, fee)
                        .ok_or(AccountError::RefundUnderflow(address))?;
                }
            }
        }
    }
}
