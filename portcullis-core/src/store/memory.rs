//! In-process fallback store.
//!
//! Used when the shared store is disabled or unreachable at startup. State is
//! kept in a concurrent map; the map's per-key locking gives the same
//! atomic-increment guarantee the throttle needs, and every access performs a
//! lazy expiry check since there is no native TTL eviction. State is lost on
//! process restart and is not shared across nodes, which is acceptable for
//! the fallback role.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::{
    Error,
    error::StoreError,
    store::{KeyTtl, ThrottleStore},
};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// TTL-capable in-memory key-value store.
///
/// All mutation happens under the map's per-key shard locks, so concurrent
/// request handlers observe linearizable increments without any external
/// synchronization.
#[derive(Debug, Default)]
pub struct MemoryThrottleStore {
    entries: DashMap<String, Entry>,
}

impl MemoryThrottleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the key if its expiry instant has passed.
    fn purge_if_expired(&self, key: &str, now: DateTime<Utc>) {
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }
}

#[async_trait]
impl ThrottleStore for MemoryThrottleStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let now = Utc::now();
        self.purge_if_expired(key, now);
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), Error> {
        let expires_at = Utc::now() + Duration::seconds(ttl_seconds as i64);
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, Error> {
        let now = Utc::now();
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: None,
        });

        // Lazy expiry inside the per-key lock: an expired counter restarts
        // from zero with no inherited TTL.
        if entry.is_expired(now) {
            entry.value = "0".to_string();
            entry.expires_at = None;
        }

        let current: i64 = entry.value.parse().map_err(|_| {
            StoreError::UnexpectedReply(format!("non-integer value at key {key}"))
        })?;
        let next = current + 1;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool, Error> {
        let now = Utc::now();
        self.purge_if_expired(key, now);
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Some(now + Duration::seconds(ttl_seconds as i64));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, Error> {
        let now = Utc::now();
        self.purge_if_expired(key, now);
        match self.entries.get(key) {
            None => Ok(KeyTtl::Missing),
            Some(entry) => match entry.expires_at {
                None => Ok(KeyTtl::Persistent),
                Some(at) => {
                    // Round up so a lock with any time left never reads as 0.
                    let millis = (at - now).num_milliseconds().max(0) as u64;
                    Ok(KeyTtl::Expires(millis.div_ceil(1000)))
                }
            },
        }
    }

    async fn del(&self, key: &str) -> Result<(), Error> {
        self.entries.remove(key);
        Ok(())
    }
}
