//! Read-through caching as a value: `Cached<T>` wraps one query operation.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::key::query_key;
use super::store::CacheStore;
use super::ttl::CacheTtl;

/// Hit/miss/error counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
}

impl CacheStatsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 { 0.0 } else { self.hits as f64 / lookups as f64 }
    }
}

impl CacheStats {
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// One cached operation. The key is derived from the operation name and the
/// normalized parameters; cache failures never fail the call.
pub struct Cached<T> {
    store: Arc<CacheStore>,
    operation: &'static str,
    ttl: Duration,
    stats: Arc<CacheStats>,
    _value: PhantomData<fn() -> T>,
}

impl<T> Cached<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<CacheStore>, operation: &'static str, ttl: CacheTtl) -> Self {
        Self {
            store,
            operation,
            ttl: ttl.duration(),
            stats: Arc::new(CacheStats::default()),
            _value: PhantomData,
        }
    }

    pub fn with_stats(mut self, stats: Arc<CacheStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Cache key for `params`, or `None` if they cannot be serialized.
    pub fn key_for<P: Serialize + ?Sized>(&self, params: &P) -> Option<String> {
        serde_json::to_value(params).ok().map(|v| query_key(self.operation, &v))
    }

    /// Return the cached value for `params`, or run `compute`, store its
    /// result under `tags` and return it.
    pub async fn get_or_compute<P, F, Fut, E>(&self, params: &P, tags: &[String], compute: F) -> Result<T, E>
    where
        P: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_compute_tagged(params, |_| tags.to_vec(), compute).await
    }

    /// Like [`Cached::get_or_compute`], with tags derived from the computed value.
    pub async fn get_or_compute_tagged<P, G, F, Fut, E>(&self, params: &P, tags: G, compute: F) -> Result<T, E>
    where
        P: Serialize + ?Sized,
        G: FnOnce(&T) -> Vec<String>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(key) = self.key_for(params) else {
            warn!(operation = self.operation, "query parameters not serializable, bypassing cache");
            self.stats.error();
            return compute().await;
        };

        match self.store.get_json::<T>(&key).await {
            Ok(Some(value)) => {
                self.stats.hit();
                debug!(operation = self.operation, key = %key, "cache hit");
                return Ok(value);
            }
            Ok(None) => {
                self.stats.miss();
                debug!(operation = self.operation, key = %key, "cache miss");
            }
            Err(e) => {
                self.stats.error();
                self.stats.miss();
                warn!(operation = self.operation, key = %key, error = %e, "cache read failed, recomputing");
            }
        }

        let value = compute().await?;
        let tags = tags(&value);

        if let Err(e) = self.store.set_json(&key, &value, &tags, self.ttl).await {
            self.stats.error();
            warn!(operation = self.operation, key = %key, error = %e, "cache write failed");
        }
        Ok(value)
    }
}
