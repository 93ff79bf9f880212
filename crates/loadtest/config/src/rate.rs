//! Rate limiting options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default request rate, in requests per second.
pub const DEFAULT_RATE_LIMIT: f64 = 4.0;

/// Token bucket and adaptive controller settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateConfig {
    /// Requests per second; zero or less disables limiting.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,

    /// Adjust the rate from the observed pending depth.
    #[serde(default)]
    pub adaptive: bool,

    /// Pending depth the controller steers towards.
    #[serde(default = "default_target_size")]
    pub adaptive_target_size: u64,

    /// Additive increase per cycle.
    #[serde(default = "default_increment")]
    pub adaptive_increment: u64,

    /// Seconds between two adjustments.
    #[serde(default = "default_cycle_secs")]
    pub adaptive_cycle_secs: u64,

    /// Divisor applied when the depth is above target.
    #[serde(default = "default_backoff_factor")]
    pub adaptive_backoff_factor: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            rate_limit: DEFAULT_RATE_LIMIT,
            adaptive: false,
            adaptive_target_size: default_target_size(),
            adaptive_increment: default_increment(),
            adaptive_cycle_secs: default_cycle_secs(),
            adaptive_backoff_factor: default_backoff_factor(),
        }
    }
}

impl RateConfig {
    /// Whether a token bucket is in front of the workers.
    pub fn is_limited(&self) -> bool {
        self.rate_limit > 0.0
    }

    /// Interval between two adaptive adjustments.
    pub const fn adaptive_cycle(&self) -> Duration {
        Duration::from_secs(self.adaptive_cycle_secs)
    }
}

const fn default_rate_limit() -> f64 {
    DEFAULT_RATE_LIMIT
}

const fn default_target_size() -> u64 {
    1000
}

const fn default_increment() -> u64 {
    50
}

const fn default_cycle_secs() -> u64 {
    10
}

const fn default_backoff_factor() -> f64 {
    2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RateConfig::default();
        assert!(config.is_limited());
        assert_eq!(config.adaptive_target_size, 1000);
        assert_eq!(config.adaptive_increment, 50);
        assert_eq!(config.adaptive_cycle(), Duration::from_secs(10));
        assert_eq!(config.adaptive_backoff_factor, 2.0);
    }

    #[test]
    fn test_non_positive_rate_disables_limiting() {
        let config: RateConfig = toml::from_str("rate_limit = -1.0").expect("deserialize");
        assert!(!config.is_limited());
        let config: RateConfig = toml::from_str("rate_limit = 0.0").expect("deserialize");
        assert!(!config.is_limited());
    }
}
