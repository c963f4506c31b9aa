//! Key-value store holding OAuth state and credentials.
//!
//! Values are opaque strings with a per-key expiry. Two backends:
//! - `MemoryStore` for single-instance deployments and tests
//! - `RedisStore` for deployments sharing state across processes

mod clock;
mod memory;
mod redis;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::memory::{run_store_cleanup, MemoryStore};
pub use self::redis::RedisStore;

use crate::config::{StoreBackend, StoreConfig};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Store error types
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store error: {0}")]
    Backend(String),
    #[error("Connection error: {0}")]
    Connection(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// get/set/delete with per-key expiry.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Write `value` under `key`, replacing any previous value. The entry
    /// becomes unreadable once `ttl` has elapsed.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Read the live value under `key`, if any
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Remove `key`; removing an absent key is not an error
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Atomically read and remove the live value under `key`. Of several
    /// concurrent callers, at most one receives the value.
    async fn take(&self, key: &str) -> StoreResult<Option<String>>;
}

/// Backend selected by configuration, plus the in-memory store when that is
/// the backend (callers need it to schedule expiry cleanup).
pub struct BuiltStore {
    pub store: Arc<dyn KeyValueStore>,
    pub memory: Option<Arc<MemoryStore>>,
}

/// Create the configured store backend.
pub async fn build_store(config: &StoreConfig) -> StoreResult<BuiltStore> {
    match config.backend {
        StoreBackend::Memory => {
            let memory = Arc::new(MemoryStore::new());
            Ok(BuiltStore {
                store: memory.clone(),
                memory: Some(memory),
            })
        }
        StoreBackend::Redis => {
            let redis = RedisStore::connect(&config.redis_url, config.key_prefix.clone()).await?;
            Ok(BuiltStore {
                store: Arc::new(redis),
                memory: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_memory_store() {
        let built = build_store(&StoreConfig::default()).await.unwrap();
        assert!(built.memory.is_some());

        built
            .store
            .set("state:org:user", "{}", Duration::from_secs(60))
            .await
            .unwrap();
        let value = built.memory.unwrap().get("state:org:user").await.unwrap();
        assert_eq!(value.as_deref(), Some("{}"));
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Connection("refused".to_string());
        assert_eq!(err.to_string(), "Connection error: refused");
    }
}
