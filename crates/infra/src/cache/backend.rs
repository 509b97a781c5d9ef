//! Primitive key-value operations a cache store needs from its backend.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::error::CacheError;

/// Key-value store with expiry, glob scans and set membership.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Whole-value replacement with a fresh ttl.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Delete keys, returning how many existed. Missing keys are not an error.
    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError>;

    /// Keys matching a glob pattern (`*`, `?`, `[...]`, `\` escapes).
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Add members to a set, extending its ttl to at least `ttl`.
    async fn set_add(&self, key: &str, members: &[String], ttl: Duration) -> Result<(), CacheError>;

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError>;
}

/// Translate a glob pattern into an anchored regex.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, CacheError> {
    let invalid = |reason: &str| CacheError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let mut out = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                let escaped = chars.next().ok_or_else(|| invalid("trailing escape"))?;
                out.push_str(&regex::escape(&escaped.to_string()));
            }
            '[' => {
                out.push('[');
                let mut closed = false;
                let mut first = true;
                while let Some(c) = chars.next() {
                    match c {
                        ']' if !first => {
                            closed = true;
                            break;
                        }
                        '^' if first => out.push('^'),
                        '\\' => {
                            let escaped = chars.next().ok_or_else(|| invalid("trailing escape"))?;
                            out.push_str(&regex::escape(&escaped.to_string()));
                        }
                        '[' | '&' | '~' | ']' => {
                            out.push('\\');
                            out.push(c);
                        }
                        _ => out.push(c),
                    }
                    first = false;
                }
                if !closed {
                    return Err(invalid("unclosed character class"));
                }
                out.push(']');
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');

    Regex::new(&format!("(?s){out}")).map_err(|e| invalid(&e.to_string()))
}

#[derive(Debug, Clone)]
enum Stored {
    Text(String),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    stored: Stored,
    expires_at: Instant,
}

impl Entry {
    fn new(stored: Stored, ttl: Duration) -> Self {
        Self {
            stored,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::Backend(format!("WRONGTYPE operation against key {key:?} holding the wrong kind of value"))
}

/// Process-local backend. Expiry follows tokio's clock, so paused-time tests
/// can advance past a ttl.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live (unexpired) entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.values().filter(|e| !e.is_expired()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop expired entries.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired());
        before - entries.len()
    }

    /// Remaining ttl of a live key.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| !e.is_expired())
            .map(|e| e.expires_at.saturating_duration_since(Instant::now()))
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        match entries.get(key).filter(|e| !e.is_expired()) {
            None => Ok(None),
            Some(Entry { stored: Stored::Text(value), .. }) => Ok(Some(value.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry::new(Stored::Text(value.to_string()), ttl));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().await;
        let removed = keys
            .iter()
            .filter_map(|k| entries.remove(k))
            .filter(|e| !e.is_expired())
            .count();
        Ok(removed)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let matcher = glob_to_regex(pattern)?;
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(k, e)| !e.is_expired() && matcher.is_match(k))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn set_add(&self, key: &str, members: &[String], ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        let wanted = Instant::now() + ttl;

        match entries.get_mut(key).filter(|e| !e.is_expired()) {
            Some(Entry { stored: Stored::Set(set), expires_at }) => {
                set.extend(members.iter().cloned());
                if *expires_at < wanted {
                    *expires_at = wanted;
                }
            }
            Some(_) => return Err(wrong_type(key)),
            None => {
                let set = members.iter().cloned().collect();
                entries.insert(key.to_string(), Entry::new(Stored::Set(set), ttl));
            }
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let entries = self.entries.read().await;
        match entries.get(key).filter(|e| !e.is_expired()) {
            None => Ok(Vec::new()),
            Some(Entry { stored: Stored::Set(set), .. }) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }
}
