//! Tracing/logging setup and the slow-operation timer.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize with an explicit configuration.
pub fn init_with(config: TracingConfig) {
    tracing::init_with(config);
}

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Timers that report operations exceeding a latency budget.
pub mod slow;

pub use slow::SlowOperation;
pub use self::tracing::{LogFormat, TracingConfig};
