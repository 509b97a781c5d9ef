//! Cache store adapter and the cached query service.
//!
//! - [`CacheBackend`]: primitive operations (in-memory, or Redis behind the
//!   `redis` feature)
//! - [`CacheStore`]: prefixed keys, tag indexes, bulk invalidation
//! - [`Cached`]: one read-through cached operation
//! - [`QueryService`]: search/pipeline/profile reads plus write-side invalidation
//!
//! Cache failures are soft: a failed read is a miss, a failed write is logged.

use std::sync::Arc;

use tracing::info;

pub mod backend;
pub mod cached;
pub mod error;
pub mod key;
pub mod query;
#[cfg(feature = "redis")]
pub mod redis;
pub mod store;
pub mod ttl;

pub use backend::{CacheBackend, InMemoryBackend, glob_to_regex};
pub use cached::{CacheStats, CacheStatsSnapshot, Cached};
pub use error::CacheError;
pub use key::{canonical_json, query_key};
pub use query::{CandidateSummary, PipelineEntry, QueryService, SearchFilters, SearchRepository};
pub use store::CacheStore;
pub use ttl::CacheTtl;

use crate::config::InfraConfig;

/// Backend selected by configuration: Redis when a URL is set and the
/// `redis` feature is compiled in, in-memory otherwise.
pub fn backend_from_config(config: &InfraConfig) -> Result<Arc<dyn CacheBackend>, CacheError> {
    match config.redis_url.as_deref() {
        #[cfg(feature = "redis")]
        Some(url) => {
            info!("using redis cache backend");
            Ok(Arc::new(redis::RedisBackend::new(url)?))
        }
        #[cfg(not(feature = "redis"))]
        Some(_) => {
            tracing::warn!("redis url configured but the redis feature is disabled, using in-memory cache");
            Ok(Arc::new(InMemoryBackend::new()))
        }
        None => {
            info!("using in-memory cache backend");
            Ok(Arc::new(InMemoryBackend::new()))
        }
    }
}

/// Cache store configured from [`InfraConfig`].
pub fn store_from_config(config: &InfraConfig) -> Result<CacheStore, CacheError> {
    Ok(CacheStore::new(backend_from_config(config)?, config.cache_prefix.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_config_uses_in_memory_store() {
        let store = store_from_config(&InfraConfig::default()).unwrap();
        assert_eq!(store.prefix(), "talentflow:");
        store.set("k", "v", CacheTtl::Session.duration()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
