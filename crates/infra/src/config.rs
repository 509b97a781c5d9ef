//! Environment-driven infrastructure configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use talentflow_core::RetryPolicy;

use crate::jobs::{DEFAULT_MAX_ATTEMPTS, QueueConfig, QueueName};

pub const ENV_REDIS_URL: &str = "TALENTFLOW_REDIS_URL";
pub const ENV_CACHE_PREFIX: &str = "TALENTFLOW_CACHE_PREFIX";
pub const ENV_QUEUE_CONCURRENCY: &str = "TALENTFLOW_QUEUE_CONCURRENCY";
pub const ENV_QUEUE_MAX_ATTEMPTS: &str = "TALENTFLOW_QUEUE_MAX_ATTEMPTS";
pub const ENV_QUEUE_BACKOFF_MS: &str = "TALENTFLOW_QUEUE_BACKOFF_MS";
pub const ENV_RETAIN_COMPLETED: &str = "TALENTFLOW_RETAIN_COMPLETED";
pub const ENV_RETAIN_FAILED: &str = "TALENTFLOW_RETAIN_FAILED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfraConfig {
    /// Cache backend; in-memory when absent
    pub redis_url: Option<String>,
    pub cache_prefix: String,
    /// Overrides every queue's default concurrency when set
    pub queue_concurrency: Option<usize>,
    /// Default attempt budget for enqueued jobs
    pub queue_max_attempts: u32,
    /// Base delay of the exponential retry schedule
    pub queue_backoff_ms: u64,
    pub retain_completed: usize,
    pub retain_failed: usize,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            cache_prefix: "talentflow:".to_string(),
            queue_concurrency: None,
            queue_max_attempts: DEFAULT_MAX_ATTEMPTS,
            queue_backoff_ms: 1000,
            retain_completed: 100,
            retain_failed: 500,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "invalid config value, using default");
                default
            }
        },
    }
}

impl InfraConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            redis_url: get(ENV_REDIS_URL),
            cache_prefix: get(ENV_CACHE_PREFIX).unwrap_or(defaults.cache_prefix),
            queue_concurrency: get(ENV_QUEUE_CONCURRENCY).and_then(|raw| {
                match raw.trim().parse::<usize>() {
                    Ok(n) if n > 0 => Some(n),
                    _ => {
                        warn!(key = ENV_QUEUE_CONCURRENCY, value = %raw, "invalid config value, using per-queue defaults");
                        None
                    }
                }
            }),
            queue_max_attempts: parse_or(ENV_QUEUE_MAX_ATTEMPTS, get(ENV_QUEUE_MAX_ATTEMPTS), defaults.queue_max_attempts)
                .max(1),
            queue_backoff_ms: parse_or(ENV_QUEUE_BACKOFF_MS, get(ENV_QUEUE_BACKOFF_MS), defaults.queue_backoff_ms),
            retain_completed: parse_or(ENV_RETAIN_COMPLETED, get(ENV_RETAIN_COMPLETED), defaults.retain_completed),
            retain_failed: parse_or(ENV_RETAIN_FAILED, get(ENV_RETAIN_FAILED), defaults.retain_failed),
        }
    }

    pub fn backoff(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.queue_max_attempts,
            Duration::from_millis(self.queue_backoff_ms),
            RetryPolicy::default().max_delay,
        )
    }

    pub fn queue_config(&self, queue: QueueName) -> QueueConfig {
        QueueConfig::for_queue(queue)
            .with_concurrency(self.queue_concurrency.unwrap_or(queue.default_concurrency()))
            .with_backoff(self.backoff())
            .with_max_attempts(self.queue_max_attempts)
            .with_retention(self.retain_completed, self.retain_failed)
    }
}
