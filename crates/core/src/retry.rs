//! Retry engine: bounded backoff around a single fallible async operation.
//!
//! The contract is strictly "succeed or raise". No fallback value is ever
//! substituted; after the last attempt the caller receives a [`RetryError`]
//! naming the operation label and wrapping the last underlying error.
//!
//! The engine knows nothing about queues or caches. The job queue reuses
//! [`RetryPolicy::delay_for_attempt`] so both follow the same schedule.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Exponential backoff: base * 2^(attempt-1)
    #[default]
    Exponential,
    /// Linear backoff: base * attempt
    Linear,
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    /// Backoff strategy
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
            strategy: BackoffStrategy::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Default schedule with a different attempt budget.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Create a policy with fixed delays.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    /// Create a policy with exponential backoff.
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            strategy: BackoffStrategy::Exponential,
        }
    }

    /// Delay to wait after the given failed attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Exponential => {
                let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt),
        };

        delay.min(self.max_delay)
    }

    /// Whether another attempt is allowed after `attempt` attempts have run.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.effective_attempts()
    }

    fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Run `operation` under this policy.
    pub async fn retry<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let max_attempts = self.effective_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(label, attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt >= max_attempts => {
                    error!(label, attempts = attempt, error = %err, "retries exhausted");
                    return Err(RetryError {
                        label: label.to_string(),
                        attempts: attempt,
                        source: err,
                    });
                }
                Err(err) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        label,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Exhausted-retry failure: carries the label and the last cause.
#[derive(Debug)]
pub struct RetryError<E> {
    pub label: String,
    pub attempts: u32,
    pub source: E,
}

impl<E> RetryError<E> {
    /// The last underlying error.
    pub fn into_source(self) -> E {
        self.source
    }

    pub fn map_source<U>(self, f: impl FnOnce(E) -> U) -> RetryError<U> {
        RetryError {
            label: self.label,
            attempts: self.attempts,
            source: f(self.source),
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} attempt(s): {}",
            self.label, self.attempts, self.source
        )
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// A fallible operation bundled with its label and retry policy.
///
/// Makes the wrapping visible at the call site:
///
/// ```ignore
/// let summary = Retryable::new("enrich.summary", || client.complete(request.clone()))
///     .with_policy(policy)
///     .run()
///     .await?;
/// ```
pub struct Retryable<F> {
    label: String,
    policy: RetryPolicy,
    operation: F,
}

impl<F> Retryable<F> {
    pub fn new(label: impl Into<String>, operation: F) -> Self {
        Self {
            label: label.into(),
            policy: RetryPolicy::default(),
            operation,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.policy.max_attempts = max_attempts;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub async fn run<T, E, Fut>(self) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let Retryable {
            label,
            policy,
            operation,
        } = self;
        policy.retry(&label, operation).await
    }
}

/// Run `operation` with the default exponential schedule and `max_retries` attempts.
pub async fn run_with_retry<T, E, F, Fut>(
    operation: F,
    label: &str,
    max_retries: u32,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    RetryPolicy::with_max_attempts(max_retries)
        .retry(label, operation)
        .await
}
