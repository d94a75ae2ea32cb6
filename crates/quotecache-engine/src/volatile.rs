//! In-process TTL cache.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// Default time-to-live for volatile entries.
pub const DEFAULT_VOLATILE_TTL: Duration = Duration::from_secs(3600);

struct Entry<V> {
    value: V,
    // None when the TTL runs past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Whole-value TTL cache with no persistence and no range awareness.
///
/// Expired entries are removed when touched, by [`VolatileCache::purge_expired`],
/// or by a sweeper task started with [`VolatileCache::spawn_sweeper`].
pub struct VolatileCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    default_ttl: Duration,
}

impl<K, V> VolatileCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create a cache with the given default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Default TTL applied by `put(.., None)`.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get a live value.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert a value. `ttl` of `None` (or zero) uses the default TTL.
    pub fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        let ttl = ttl.filter(|t| !t.is_zero()).unwrap_or(self.default_ttl);
        let expires_at = Instant::now().checked_add(ttl);
        self.entries.lock().insert(key, Entry { value, expires_at });
    }

    /// Remove a value. Returns whether one was present.
    pub fn delete(&self, key: &K) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Remove every value.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}

impl<K, V> VolatileCache<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Sweep expired entries every `interval` on the tokio runtime.
    ///
    /// The task holds only a weak reference and exits once the cache is
    /// dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                let removed = cache.purge_expired();
                if removed > 0 {
                    debug!(removed, remaining = cache.len(), "Swept volatile cache");
                }
            }
        })
    }
}

impl<K, V> Default for VolatileCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_VOLATILE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let cache: VolatileCache<String, u32> = VolatileCache::default();
        cache.put("a".to_string(), 1, None);
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        assert!(cache.delete(&"a".to_string()));
        assert!(!cache.delete(&"a".to_string()));
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn test_expiry_on_access() {
        let cache = VolatileCache::new(Duration::from_secs(60));
        cache.put("short", 1, Some(Duration::from_millis(20)));
        cache.put("long", 2, None);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(&"short"), None);
        assert_eq!(cache.get(&"long"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_purge_and_clear() {
        let cache = VolatileCache::new(Duration::from_secs(60));
        cache.put(1, "x", Some(Duration::from_millis(10)));
        cache.put(2, "y", Some(Duration::from_millis(10)));
        cache.put(3, "z", None);

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let cache = VolatileCache::new(Duration::from_secs(60));
        cache.put(1, 1, Some(Duration::from_secs(u64::MAX)));
        assert_eq!(cache.get(&1), Some(1));
        assert_eq!(cache.purge_expired(), 0);

        let unbounded: VolatileCache<u32, u32> = VolatileCache::new(Duration::MAX);
        unbounded.put(2, 2, None);
        assert_eq!(unbounded.get(&2), Some(2));
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired() {
        let cache = Arc::new(VolatileCache::new(Duration::from_secs(60)));
        cache.put("k", 1, Some(Duration::from_millis(10)));
        let handle = cache.spawn_sweeper(Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.len(), 0);

        drop(cache);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper exits after the cache is dropped")
            .unwrap();
    }
}
