//! Token bucket rate limiting and AIMD control for surge.
#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/refcell/surge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod adaptive;
pub use adaptive::{AdaptiveConfig, AdaptiveController, MIN_ADAPTIVE_RATE, next_rate};

mod depth;
pub use depth::{PendingDepth, TxpoolDepth};

mod error;
pub use error::RateLimitError;

mod limiter;
pub use limiter::RateLimiter;
