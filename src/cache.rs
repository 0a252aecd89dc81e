//! In-memory caches shared across request handlers.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct CacheValue<V> {
    value: V,
    expires_at: Option<Instant>,
}

/// Async key-value cache with optional per-entry TTL.
#[derive(Clone)]
pub struct Cache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, CacheValue<V>>>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.inner.lock().await;
        let expired = cache
            .get(key)
            .and_then(|entry| entry.expires_at)
            .is_some_and(|expiry| expiry < Instant::now());
        if expired {
            debug!("Cache entry expired, evicting");
            cache.remove(key);
            return None;
        }
        if let Some(entry) = cache.get(key) {
            debug!("Cache HIT");
            return Some(entry.value.clone());
        }
        debug!("Cache MISS");
        None
    }

    pub async fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        let expires_at = ttl.map(|duration| Instant::now() + duration);
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT");
        cache.insert(key, CacheValue { value, expires_at });
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A single cached value with a fixed TTL, replaced wholesale on refresh.
///
/// Used for the bulk ETF listing where all handlers share one
/// `{data, last_fetched}` pair.
pub struct TtlCell<T: Clone + Send + 'static> {
    inner: Mutex<Option<(Instant, T)>>,
    ttl: Duration,
}

impl<T: Clone + Send> TtlCell<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(None),
            ttl,
        }
    }

    /// Returns the cached value if present and within TTL.
    pub async fn get(&self) -> Option<T> {
        let cell = self.inner.lock().await;
        match cell.as_ref() {
            Some((fetched_at, value)) if fetched_at.elapsed() < self.ttl => Some(value.clone()),
            _ => None,
        }
    }

    /// Returns the cached value even if stale. Used by endpoints that
    /// prefer old data over none.
    pub async fn get_stale(&self) -> Option<T> {
        let cell = self.inner.lock().await;
        cell.as_ref().map(|(_, value)| value.clone())
    }

    /// Replaces the cached value and resets its age.
    pub async fn replace(&self, value: T) {
        let mut cell = self.inner.lock().await;
        *cell = Some((Instant::now(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_cache_get_put() {
        let cache = Cache::<String, i32>::new();

        assert!(cache.get(&"key1".to_string()).await.is_none());

        cache.put("key1".to_string(), 123, None).await;
        assert_eq!(cache.get(&"key1".to_string()).await, Some(123));

        assert!(cache.get(&"key2".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_ttl_expiration() {
        let cache = Cache::<String, i32>::new();

        cache
            .put("key1".to_string(), 123, Some(Duration::from_millis(10)))
            .await;
        assert_eq!(cache.get(&"key1".to_string()).await, Some(123));

        sleep(Duration::from_millis(20)).await;
        assert!(cache.get(&"key1".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_evicted_on_get() {
        let cache = Cache::<String, i32>::new();

        cache
            .put("key1".to_string(), 1, Some(Duration::from_millis(10)))
            .await;
        cache
            .put("key2".to_string(), 2, Some(Duration::from_millis(10)))
            .await;
        cache.put("key3".to_string(), 3, None).await;
        assert_eq!(cache.len().await, 3);

        sleep(Duration::from_millis(20)).await;
        assert!(cache.get(&"key1".to_string()).await.is_none());
        assert!(cache.get(&"key2".to_string()).await.is_none());
        // Expired entries are dropped, the unexpiring one stays
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&"key3".to_string()).await, Some(3));
    }

    #[tokio::test]
    async fn test_ttl_cell_fresh_and_stale() {
        let cell = TtlCell::new(Duration::from_millis(10));
        assert!(cell.get().await.is_none());
        assert!(cell.get_stale().await.is_none());

        cell.replace(vec![1, 2, 3]).await;
        assert_eq!(cell.get().await, Some(vec![1, 2, 3]));

        sleep(Duration::from_millis(20)).await;
        assert!(cell.get().await.is_none());
        // Stale reads still see the last value
        assert_eq!(cell.get_stale().await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_ttl_cell_replace_resets_age() {
        let cell = TtlCell::new(Duration::from_millis(30));
        cell.replace(1).await;
        sleep(Duration::from_millis(20)).await;
        cell.replace(2).await;
        sleep(Duration::from_millis(20)).await;
        assert_eq!(cell.get().await, Some(2));
    }
}
