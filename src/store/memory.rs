use super::{Clock, KeyValueStore, StoreError, StoreResult, SystemClock};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Store entry with expiration
#[derive(Clone, Debug)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-memory key-value store with per-entry expiry.
///
/// Expired entries are never returned. They are dropped lazily on read and
/// in bulk by `purge_expired`.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store that reads time from `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Remove every expired entry, returning how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of entries held, expired or not
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StoreError::Backend(format!("Invalid TTL: {}", e)))?;
        let entry = Entry {
            value: value.to_string(),
            expires_at: self.clock.now() + ttl,
        };

        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it unless a writer replaced it in the meantime
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> StoreResult<Option<String>> {
        let now = self.clock.now();
        let entry = self.entries.write().await.remove(key);
        Ok(entry
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value))
    }
}

/// Background task to periodically purge expired entries
pub async fn run_store_cleanup(store: Arc<MemoryStore>, interval_seconds: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds.max(1)));

    loop {
        interval.tick().await;
        let purged = store.purge_expired().await;
        let remaining = store.len().await;
        tracing::debug!(
            purged = purged,
            remaining = remaining,
            "Store cleanup complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ManualClock;

    fn store_with_clock() -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (MemoryStore::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();

        store.set("key1", "value1", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("key1").await.unwrap().as_deref(), Some("value1"));
        assert_eq!(store.get("missing").await.unwrap(), None);

        store.delete("key1").await.unwrap();
        assert_eq!(store.get("key1").await.unwrap(), None);

        // Deleting again is fine
        store.delete("key1").await.unwrap();
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = MemoryStore::new();

        store.set("key", "first", Duration::from_secs(60)).await.unwrap();
        store.set("key", "second", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("second"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_entry_unreadable_after_ttl() {
        let (store, clock) = store_with_clock();

        store.set("key", "value", Duration::from_secs(3600)).await.unwrap();

        clock.advance(chrono::Duration::seconds(3599));
        assert!(store.get("key").await.unwrap().is_some());

        clock.advance(chrono::Duration::seconds(2));
        assert_eq!(store.get("key").await.unwrap(), None);

        // Lazy removal on read
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_take_returns_value_once() {
        let store = Arc::new(MemoryStore::new());
        store.set("key", "value", Duration::from_secs(60)).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.take("key").await.unwrap() })
            })
            .collect();

        let mut taken = Vec::new();
        for handle in handles {
            if let Some(value) = handle.await.unwrap() {
                taken.push(value);
            }
        }
        assert_eq!(taken, vec!["value".to_string()]);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_take_ignores_expired_entry() {
        let (store, clock) = store_with_clock();
        store.set("key", "value", Duration::from_secs(10)).await.unwrap();

        clock.advance(chrono::Duration::seconds(11));
        assert_eq!(store.take("key").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (store, clock) = store_with_clock();

        store.set("short", "a", Duration::from_secs(10)).await.unwrap();
        store.set("long", "b", Duration::from_secs(1000)).await.unwrap();

        clock.advance(chrono::Duration::seconds(11));

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("long").await.unwrap().as_deref(), Some("b"));
    }
}
