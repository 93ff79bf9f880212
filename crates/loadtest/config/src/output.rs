//! Summary and preconfirmation tracking options.

use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Format of the post-run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Human readable lines.
    #[default]
    Text,
    /// A single JSON document.
    Json,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::OutOfRange { name: "output mode", reason: "expected text or json" }),
        }
    }
}

/// Post-run block summary.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryConfig {
    /// Fetch the run's blocks and receipts and report inclusion statistics.
    #[serde(default)]
    pub enabled: bool,
    /// Report format.
    #[serde(default)]
    pub output_mode: OutputMode,
}

/// Preconfirmation tracking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreconfConfig {
    /// Track every submitted hash for a preconfirmation and a receipt.
    #[serde(default)]
    pub enabled: bool,

    /// Hashes per batched status request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Milliseconds between polling rounds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Seconds after which an unresolved hash is recorded as failed.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// JSON file that receives the tracker's summary and per-transaction records.
    #[serde(default)]
    pub stats_file: Option<PathBuf>,
}

impl Default for PreconfConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            batch_size: default_batch_size(),
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_timeout_secs(),
            stats_file: None,
        }
    }
}

impl PreconfConfig {
    /// Interval between polling rounds.
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-hash deadline.
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

const fn default_batch_size() -> usize {
    100
}

const fn default_poll_interval_ms() -> u64 {
    500
}

const fn default_timeout_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("text", OutputMode::Text)]
    #[case("json", OutputMode::Json)]
    fn test_output_mode_parse(#[case] input: &str, #[case] expected: OutputMode) {
        assert_eq!(input.parse::<OutputMode>().expect("parse"), expected);
        assert_eq!(expected.to_string(), input);
    }

    #[test]
    fn test_output_mode_rejects_unknown() {
        assert!("yaml".parse::<OutputMode>().is_err());
    }

    #[test]
    fn test_preconf_defaults() {
        let config: PreconfConfig = toml::from_str("enabled = true").expect("deserialize");
        assert!(config.enabled);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_summary_toml() {
        let config: SummaryConfig =
            toml::from_str("enabled = true\noutput_mode = \"json\"").expect("deserialize");
        assert!(config.enabled);
        assert_eq!(config.output_mode, OutputMode::Json);
    }
}
