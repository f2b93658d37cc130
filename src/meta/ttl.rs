//! Time-bounded memoization for catalog lookups. Concurrent misses on one
//! key may race to populate it; last writer wins, which is acceptable because
//! entries are derivable and idempotent within a TTL window.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached value if present and not expired. Expired entries
    /// are left in place; the next insert overwrites them.
    pub async fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn invalidate<Q>(&self, key: &Q)
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.write().await.remove(key);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_fresh_entries_and_drops_expired() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(20));
        cache.insert("a".into(), 1).await;
        assert_eq!(cache.get("a").await, Some(1));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get("a").await, None);
    }

    #[tokio::test]
    async fn last_writer_wins() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(30));
        cache.insert("a".into(), 1).await;
        cache.insert("a".into(), 2).await;
        assert_eq!(cache.get("a").await, Some(2));
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(30));
        cache.insert("a".into(), 1).await;
        cache.invalidate("a").await;
        assert_eq!(cache.get("a").await, None);
    }
}
