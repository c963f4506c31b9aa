use super::{KeyValueStore, StoreError, StoreResult};
use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Client};
use std::time::Duration;

/// Redis-backed store. Expiry is delegated to Redis (`SET ... EX`).
pub struct RedisStore {
    connection: MultiplexedConnection,
    key_prefix: String,
}

impl RedisStore {
    /// Open a client and verify the server answers before returning
    pub async fn connect(redis_url: &str, key_prefix: String) -> StoreResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| StoreError::Connection(format!("Redis client creation failed: {}", e)))?;

        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(format!("Redis connection failed: {}", e)))?;

        let _: String = ::redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| StoreError::Connection(format!("Redis ping failed: {}", e)))?;

        Ok(Self {
            connection,
            key_prefix,
        })
    }

    fn prefixed_key(&self, key: &str) -> String {
        prefixed(&self.key_prefix, key)
    }
}

fn prefixed(prefix: &str, key: &str) -> String {
    format!("{}{}", prefix, key)
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let key = self.prefixed_key(key);
        // Redis rejects EX 0
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.connection.clone();
        let _: () = conn
            .set_ex(&key, value, seconds)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let key = self.prefixed_key(key);
        let mut conn = self.connection.clone();
        let value: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let key = self.prefixed_key(key);
        let mut conn = self.connection.clone();
        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn take(&self, key: &str) -> StoreResult<Option<String>> {
        let key = self.prefixed_key(key);
        let mut conn = self.connection.clone();
        // GETDEL needs Redis 6.2+
        let value: Option<String> = ::redis::cmd("GETDEL")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_key() {
        assert_eq!(prefixed("hublink:", "state:org:user"), "hublink:state:org:user");
        assert_eq!(prefixed("", "credentials:o:u"), "credentials:o:u");
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let result = RedisStore::connect("not-a-redis-url", String::new()).await;
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
