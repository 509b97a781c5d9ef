//! Cache store adapter: the six cache operations over any backend.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use talentflow_observability::SlowOperation;

use super::backend::CacheBackend;
use super::error::CacheError;

/// Prefixes every key and keeps a `tag:{tag}` set of member keys per tag.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    prefix: String,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").field("prefix", &self.prefix).finish_non_exhaustive()
    }
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    fn tag_key(&self, tag: &str) -> String {
        format!("{}tag:{tag}", self.prefix)
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let _timer = SlowOperation::start("cache.get");
        self.backend.get(&self.full_key(key)).await
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.backend.set(&self.full_key(key), value, ttl).await
    }

    /// Returns whether the key existed.
    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.backend.delete(&[self.full_key(key)]).await? > 0)
    }

    /// Delete every key matching `pattern` (relative to the prefix).
    pub async fn delete_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        let _timer = SlowOperation::start("cache.delete_pattern");
        let keys = self.backend.scan(&self.full_key(pattern)).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let removed = self.backend.delete(&keys).await?;
        debug!(pattern, removed, "cache keys deleted by pattern");
        Ok(removed)
    }

    /// Store a value and index it under every tag. A tag index never expires
    /// before any key it references.
    pub async fn set_with_tags(&self, key: &str, value: &str, tags: &[String], ttl: Duration) -> Result<(), CacheError> {
        let full_key = self.full_key(key);
        self.backend.set(&full_key, value, ttl).await?;
        let member = [full_key];
        for tag in tags {
            self.backend.set_add(&self.tag_key(tag), &member, ttl).await?;
        }
        Ok(())
    }

    /// Remove every key ever tagged with any of `tags`, then the tag indexes.
    pub async fn invalidate_by_tags(&self, tags: &[String]) -> Result<usize, CacheError> {
        let _timer = SlowOperation::start("cache.invalidate_by_tags");
        let mut removed = 0;
        for tag in tags {
            let tag_key = self.tag_key(tag);
            let members = self.backend.set_members(&tag_key).await?;
            if !members.is_empty() {
                removed += self.backend.delete(&members).await?;
            }
            self.backend.delete(&[tag_key]).await?;
        }
        debug!(?tags, removed, "cache invalidated by tags");
        Ok(removed)
    }

    /// `get` decoded from JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// `set`/`set_with_tags` encoded as JSON.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        tags: &[String],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        if tags.is_empty() {
            self.set(key, &raw, ttl).await
        } else {
            self.set_with_tags(key, &raw, tags, ttl).await
        }
    }
}
