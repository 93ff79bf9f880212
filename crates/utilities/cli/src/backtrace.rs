//! Backtrace defaults.

const RUST_BACKTRACE: &str = "RUST_BACKTRACE";

/// Enables backtraces on panic.
#[derive(Debug, Clone, Copy)]
pub struct Backtracing;

impl Backtracing {
    /// Sets `RUST_BACKTRACE=1` unless a value is already present.
    ///
    /// Call before the async runtime starts any threads.
    pub fn enable() {
        if std::env::var_os(RUST_BACKTRACE).is_none() {
            // SAFETY: called from `main` before the runtime or any other thread exists, so nothing
            // reads the environment concurrently.
            unsafe { std::env::set_var(RUST_BACKTRACE, "1") };
        }
    }
}
