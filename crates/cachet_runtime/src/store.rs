//! Backing response cache.
//!
//! Hosts persist whole responses through the [`KeyValueCache`] put/get
//! contract. [`InMemoryLruCache`] is the default in-process implementation.

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// A string key/value store with optional per-entry expiry.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Gets a live entry.
    async fn get(&self, key: &str) -> Option<String>;

    /// Stores an entry, expiring after `ttl` if given.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>);

    /// Removes an entry, returning whether it existed.
    async fn delete(&self, key: &str) -> bool;
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// An in-memory LRU cache.
pub struct InMemoryLruCache {
    entries: Mutex<LruCache<String, Entry>>,
}

impl InMemoryLruCache {
    /// Creates a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the number of stored entries, including expired ones not yet
    /// evicted.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl Default for InMemoryLruCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl KeyValueCache for InMemoryLruCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().await;
        let expired = entries.get(key)?.is_expired(Instant::now());
        if expired {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .lock()
            .await
            .put(key.to_string(), Entry { value, expires_at });
    }

    async fn delete(&self, key: &str) -> bool {
        self.entries.lock().await.pop(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get() {
        let cache = InMemoryLruCache::new(4);
        cache.set("a", "1".to_string(), None).await;

        assert_eq!(cache.get("a").await.as_deref(), Some("1"));
        assert_eq!(cache.get("b").await, None);
        assert!(cache.delete("a").await);
        assert!(!cache.delete("a").await);
    }

    #[tokio::test]
    async fn test_expired_entries_are_dropped() {
        let cache = InMemoryLruCache::new(4);
        cache.set("gone", "x".to_string(), Some(Duration::ZERO)).await;
        cache
            .set("kept", "y".to_string(), Some(Duration::from_secs(60)))
            .await;

        assert_eq!(cache.get("gone").await, None);
        assert_eq!(cache.get("kept").await.as_deref(), Some("y"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_least_recently_used_is_evicted() {
        let cache = InMemoryLruCache::new(2);
        cache.set("a", "1".to_string(), None).await;
        cache.set("b", "2".to_string(), None).await;
        cache.get("a").await;
        cache.set("c", "3".to_string(), None).await;

        assert_eq!(cache.get("b").await, None);
        assert_eq!(cache.get("a").await.as_deref(), Some("1"));
        assert_eq!(cache.get("c").await.as_deref(), Some("3"));
    }
}
