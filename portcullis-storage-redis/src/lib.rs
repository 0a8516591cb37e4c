//! Redis adapter for the portcullis throttle store.
//!
//! Implements [`ThrottleStore`] over a [`ConnectionManager`], which
//! multiplexes one connection across request handlers and reconnects on its
//! own after transient failures. The adapter is a thin translation layer:
//! each trait operation maps onto exactly the Redis primitive of the same
//! name, so `INCR` carries the atomicity guarantee the throttle's counter
//! relies on and key expiry is handled natively by Redis TTLs.
//!
//! Connection failures after startup surface as [`StoreError`] values, which
//! the throttle service converts into degraded, fail-open outcomes.
//!
//! # Example
//!
//! ```rust,no_run
//! use portcullis_storage_redis::RedisThrottleStore;
//!
//! # async fn example() -> Result<(), portcullis_core::Error> {
//! let store = RedisThrottleStore::connect("redis://127.0.0.1:6379").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use portcullis_core::{
    Error,
    error::{StoreError, StoreResultExt},
    store::{KeyTtl, ThrottleStore},
};

/// TTL reply for a key without an expiry.
const TTL_PERSISTENT: i64 = -1;

/// Distributed throttle store backed by Redis.
#[derive(Clone)]
pub struct RedisThrottleStore {
    manager: ConnectionManager,
}

impl RedisThrottleStore {
    /// Connect to Redis at the given URL.
    ///
    /// Establishes the managed connection eagerly so an unreachable endpoint
    /// is detected at startup, where the caller can fall back to the
    /// in-process store.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Connection(format!("invalid redis url: {e}")))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        tracing::debug!(url, "Connected to redis throttle store");
        Ok(Self { manager })
    }

    /// Wrap an existing managed connection, e.g. one shared with other
    /// subsystems.
    pub fn from_manager(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    fn connection(&self) -> ConnectionManager {
        // ConnectionManager is a cheap handle onto the shared connection.
        self.manager.clone()
    }
}

#[async_trait]
impl ThrottleStore for RedisThrottleStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let mut con = self.connection();
        con.get(key).await.map_store_err_with_context("GET")
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), Error> {
        let mut con = self.connection();
        con.set_ex(key, value, ttl_seconds)
            .await
            .map_store_err_with_context("SETEX")
    }

    async fn incr(&self, key: &str) -> Result<i64, Error> {
        let mut con = self.connection();
        con.incr(key, 1).await.map_store_err_with_context("INCR")
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool, Error> {
        let mut con = self.connection();
        con.expire(key, ttl_seconds as i64)
            .await
            .map_store_err_with_context("EXPIRE")
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, Error> {
        let mut con = self.connection();
        let reply: i64 = con.ttl(key).await.map_store_err_with_context("TTL")?;
        Ok(match reply {
            TTL_PERSISTENT => KeyTtl::Persistent,
            seconds if seconds >= 0 => KeyTtl::Expires(seconds as u64),
            // -2 and anything else: key does not exist
            _ => KeyTtl::Missing,
        })
    }

    async fn del(&self, key: &str) -> Result<(), Error> {
        let mut con = self.connection();
        let _deleted: i64 = con.del(key).await.map_store_err_with_context("DEL")?;
        Ok(())
    }
}

/// Integration tests against a live Redis.
///
/// Run with `REDIS_URL=redis://127.0.0.1:6379 cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> RedisThrottleStore {
        let url = std::env::var("REDIS_URL").expect("REDIS_URL must be set for redis tests");
        RedisThrottleStore::connect(&url).await.unwrap()
    }

    #[tokio::test]
    #[ignore = "requires a live redis at REDIS_URL"]
    async fn test_incr_expire_ttl_roundtrip() {
        let store = store().await;
        let key = "portcullis:test:counter";
        store.del(key).await.unwrap();

        assert_eq!(store.incr(key).await.unwrap(), 1);
        assert_eq!(store.ttl(key).await.unwrap(), KeyTtl::Persistent);

        assert!(store.expire(key, 30).await.unwrap());
        match store.ttl(key).await.unwrap() {
            KeyTtl::Expires(seconds) => assert!(seconds > 0 && seconds <= 30),
            other => panic!("expected Expires, got {other:?}"),
        }

        assert_eq!(store.incr(key).await.unwrap(), 2);
        store.del(key).await.unwrap();
        assert_eq!(store.ttl(key).await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test]
    #[ignore = "requires a live redis at REDIS_URL"]
    async fn test_set_ex_and_get() {
        let store = store().await;
        let key = "portcullis:test:lock";

        store.set_ex(key, "1", 30).await.unwrap();
        assert_eq!(store.get(key).await.unwrap().as_deref(), Some("1"));

        store.del(key).await.unwrap();
        assert_eq!(store.get(key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let result = RedisThrottleStore::connect("not a url").await;
        assert!(matches!(
            result,
            Err(Error::Store(StoreError::Connection(_)))
        ));
    }
}
