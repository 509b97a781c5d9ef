use std::time::{Duration, Instant};

use tracing::warn;

/// Default latency budget before an operation is reported as slow.
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_secs(2);

/// Guard that logs a warning on drop when the operation ran past its budget.
#[derive(Debug)]
pub struct SlowOperation {
    label: &'static str,
    started: Instant,
    threshold: Duration,
}

impl SlowOperation {
    pub fn start(label: &'static str) -> Self {
        Self::with_threshold(label, DEFAULT_SLOW_THRESHOLD)
    }

    pub fn with_threshold(label: &'static str, threshold: Duration) -> Self {
        Self {
            label,
            started: Instant::now(),
            threshold,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_slow(&self) -> bool {
        self.elapsed() > self.threshold
    }
}

impl Drop for SlowOperation {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        if elapsed > self.threshold {
            warn!(
                operation = self.label,
                elapsed_ms = elapsed.as_millis() as u64,
                threshold_ms = self.threshold.as_millis() as u64,
                "slow operation"
            );
        }
    }
}
