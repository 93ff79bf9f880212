//! The gas price oracle.

use std::time::{Duration, Instant};

use surge_primitives::GasPricing;
use surge_rpc::{BlockNumberOrTag, RpcClient};
use tokio::sync::Mutex;
use tracing::{debug, error, trace};

use crate::GasError;

/// How long a fetched head block number is reused.
pub const DEFAULT_HEAD_TTL: Duration = Duration::from_secs(1);

/// Blocks of fee history used to derive the fee cap.
pub const FEE_HISTORY_BLOCKS: u64 = 5;

/// Blocks a fee cap must hold before it may decrease.
pub const DECREASE_CONFIRMATIONS: u64 = 5;

/// Reward percentile read from fee history.
const TIP_PERCENTILE: f64 = 50.0;

/// Pricing inputs for a [`GasOracle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasOracleConfig {
    /// Produce legacy pricing.
    pub legacy: bool,
    /// Factor applied to suggested gas prices and tips.
    pub multiplier: f64,
    /// Replaces the gas price or fee cap.
    pub gas_price: Option<u128>,
    /// Replaces the tip.
    pub priority_gas_price: Option<u128>,
    /// Lifetime of the cached head block number.
    pub head_ttl: Duration,
}

impl Default for GasOracleConfig {
    fn default() -> Self {
        Self {
            legacy: false,
            multiplier: 1.0,
            gas_price: None,
            priority_gas_price: None,
            head_ttl: DEFAULT_HEAD_TTL,
        }
    }
}

impl GasOracleConfig {
    /// Selects legacy pricing.
    #[must_use]
    pub const fn with_legacy(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    /// Sets the multiplier.
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Forces the gas price or fee cap.
    #[must_use]
    pub const fn with_gas_price(mut self, gas_price: Option<u128>) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Forces the tip.
    #[must_use]
    pub const fn with_priority_gas_price(mut self, priority_gas_price: Option<u128>) -> Self {
        self.priority_gas_price = priority_gas_price;
        self
    }

    /// Sets the head block number cache lifetime.
    #[must_use]
    pub const fn with_head_ttl(mut self, head_ttl: Duration) -> Self {
        self.head_ttl = head_ttl;
        self
    }

    fn bias(&self, price: u128) -> u128 {
        (price as f64 * self.multiplier) as u128
    }
}

/// Last computed prices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasCache {
    /// Block the prices were computed at.
    pub block: Option<u64>,
    /// Gas price (legacy) or fee cap (dynamic).
    pub gas_price: u128,
    /// Tip; zero for legacy pricing.
    pub tip: u128,
    /// Block at which the current fee cap was adopted.
    pub fee_cap_block: u64,
}

#[derive(Debug, Default)]
struct OracleState {
    head: Option<(u64, Instant)>,
    cache: GasCache,
}

/// Shared, block-cached source of transaction fee fields.
#[derive(Debug)]
pub struct GasOracle {
    client: RpcClient,
    config: GasOracleConfig,
    base_fee_supported: bool,
    state: Mutex<OracleState>,
}

impl GasOracle {
    /// Creates an oracle for a chain whose base fee support is already known.
    pub fn new(
        client: RpcClient,
        config: GasOracleConfig,
        base_fee_supported: bool,
    ) -> Result<Self, GasError> {
        let forced = config.gas_price.is_some() && config.priority_gas_price.is_some();
        if !config.legacy && !base_fee_supported && !forced {
            return Err(GasError::Eip1559Unavailable);
        }
        Ok(Self { client, config, base_fee_supported, state: Mutex::new(OracleState::default()) })
    }

    /// Creates an oracle after checking the latest header for a base fee.
    pub async fn detect(client: RpcClient, config: GasOracleConfig) -> Result<Self, GasError> {
        let head = client.latest_block().await?;
        let supported = head.base_fee_per_gas.is_some();
        debug!(supported, "Detected base fee support");
        Self::new(client, config, supported)
    }

    /// Whether the chain reports a base fee.
    pub const fn base_fee_supported(&self) -> bool {
        self.base_fee_supported
    }

    /// Current cache contents.
    pub async fn cached(&self) -> GasCache {
        self.state.lock().await.cache
    }

    /// Fee fields for the next transaction.
    ///
    /// At most one refresh happens per new head block. A failed refresh keeps and returns the
    /// previous values.
    pub async fn suggest(&self) -> GasPricing {
        let mut state = self.state.lock().await;
        let block = self.head_number(&mut state).await;
        if state.cache.block.is_some_and(|cached| block <= cached) {
            return self.pricing(&state.cache);
        }

        let refreshed = if self.config.legacy {
            self.refresh_legacy().await.map(|price| (price, 0))
        } else {
            self.refresh_dynamic(block, &state.cache).await
        };
        let Some((gas_price, tip)) = refreshed else {
            return self.pricing(&state.cache);
        };

        if gas_price != state.cache.gas_price || state.cache.block.is_none() {
            state.cache.fee_cap_block = block;
        }
        state.cache.block = Some(block);
        state.cache.gas_price = gas_price;
        state.cache.tip = tip;
        debug!(block, gas_price, tip, "Updated gas prices");
        self.pricing(&state.cache)
    }

    async fn head_number(&self, state: &mut OracleState) -> u64 {
        if let Some((number, at)) = state.head
            && at.elapsed() < self.config.head_ttl
        {
            return number;
        }
        match self.client.block_number().await {
            Ok(number) => {
                state.head = Some((number, Instant::now()));
                number
            }
            Err(err) => {
                error!(error = %err, "Unable to get block number while checking gas prices");
                state.head.map(|(number, _)| number).unwrap_or_default()
            }
        }
    }

    async fn refresh_legacy(&self) -> Option<u128> {
        if let Some(price) = self.config.gas_price {
            return Some(price);
        }
        match self.client.gas_price().await {
            Ok(price) => Some(self.config.bias(price)),
            Err(err) => {
                error!(error = %err, "Unable to suggest gas price");
                None
            }
        }
    }

    async fn refresh_dynamic(&self, block: u64, cache: &GasCache) -> Option<(u128, u128)> {
        let tip = match self.config.priority_gas_price {
            Some(tip) => tip,
            None => match self.client.max_priority_fee_per_gas().await {
                Ok(tip) => self.config.bias(tip),
                Err(err) => {
                    error!(error = %err, "Unable to suggest gas tip cap");
                    return None;
                }
            },
        };
        let fee_cap = match self.config.gas_price {
            Some(price) => price,
            None => self.suggest_fee_cap(block, cache).await?,
        };
        Some((fee_cap, tip))
    }

    async fn suggest_fee_cap(&self, block: u64, cache: &GasCache) -> Option<u128> {
        let history = match self
            .client
            .fee_history(FEE_HISTORY_BLOCKS, BlockNumberOrTag::LATEST, &[TIP_PERCENTILE])
            .await
        {
            Ok(history) => history,
            Err(err) => {
                error!(error = %err, "Unable to get fee history while checking max fee per gas");
                return None;
            }
        };
        let base_fee: u128 = history.latest_base_fee().unwrap_or_default().saturating_to();
        let tip = match self.config.priority_gas_price {
            Some(tip) => tip,
            None => history
                .reward
                .as_ref()
                .and_then(|rewards| rewards.last())
                .and_then(|row| row.first())
                .map(|reward| reward.saturating_to())
                .unwrap_or_default(),
        };
        let fee_cap = base_fee.saturating_mul(2).saturating_add(tip);

        let decreasing = cache.block.is_some() && fee_cap < cache.gas_price;
        let can_decrease = block >= cache.fee_cap_block.saturating_add(DECREASE_CONFIRMATIONS);
        if decreasing && !can_decrease {
            trace!(block, fee_cap, held = cache.gas_price, "Holding fee cap");
            return Some(cache.gas_price);
        }
        trace!(block, base_fee, tip, fee_cap, "Fee cap updated");
        Some(fee_cap)
    }

    fn pricing(&self, cache: &GasCache) -> GasPricing {
        if self.config.legacy {
            return GasPricing::Legacy { gas_price: cache.gas_price };
        }
        GasPricing::Dynamic {
            max_fee_per_gas: cache.gas_price,
            max_priority_fee_per_gas: cache.tip.min(cache.gas_price),
        }
    }
}
