//! Global `tracing` subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LEVEL: &str = "info";

/// Filter used when `RUST_LOG` is unset and verbose output was requested.
pub const VERBOSE_LEVEL: &str = "debug";

/// Logging options for the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logging {
    verbose: bool,
}

impl Logging {
    /// Logging at the default level, or the verbose level when `verbose` is set.
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// The directive used when `RUST_LOG` is absent.
    pub const fn fallback_level(&self) -> &'static str {
        if self.verbose { VERBOSE_LEVEL } else { DEFAULT_LEVEL }
    }

    /// Builds the filter, preferring `RUST_LOG`.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.fallback_level()))
    }

    /// Installs the `fmt` layer and filter as the global subscriber.
    ///
    /// Does nothing if a subscriber is already installed.
    pub fn init(self) {
        let _ = tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(self.filter()).try_init();
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(false, "info")]
    #[case(true, "debug")]
    fn test_fallback_level(#[case] verbose: bool, #[case] expected: &str) {
        assert_eq!(Logging::new(verbose).fallback_level(), expected);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        Logging::new(false).init();
        Logging::new(true).init();
        tracing::info!("still logging");
    }
}
