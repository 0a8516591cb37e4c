//! Key-value store abstraction backing the login throttle.
//!
//! The throttle's authoritative state (attempt counters, lock markers) lives
//! in a shared, TTL-capable store. This module defines the capability trait
//! the throttle service is written against, plus the in-process fallback
//! implementation used when no shared store is configured.
//!
//! Implementations:
//!
//! - [`MemoryThrottleStore`] — in-process, for single-node deployments,
//!   local development, and deterministic tests.
//! - `RedisThrottleStore` (in `portcullis-storage-redis`) — the distributed
//!   adapter for multi-node deployments.
//!
//! The trait is object safe; services hold an `Arc<dyn ThrottleStore>` so
//! the backend is selected once at startup and injected.

pub mod memory;

pub use memory::MemoryThrottleStore;

use async_trait::async_trait;

use crate::Error;

/// Remaining lifetime of a store key.
///
/// Mirrors the TTL conventions of Redis (`-2` missing, `-1` no expiry,
/// `n >= 0` seconds remaining) as a type instead of a sentinel integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist (or has already expired).
    Missing,
    /// The key exists with no expiry set.
    Persistent,
    /// The key exists and expires in this many seconds.
    Expires(u64),
}

impl KeyTtl {
    /// Seconds remaining before expiry; 0 for missing or persistent keys.
    pub fn remaining_seconds(&self) -> u64 {
        match self {
            KeyTtl::Expires(seconds) => *seconds,
            _ => 0,
        }
    }
}

/// Minimal TTL-capable key-value capability the throttle needs.
///
/// Operations map one-to-one onto the primitives of the backing store so the
/// distributed adapter stays a thin translation layer. `incr` is the only
/// operation the service relies on for a linearizable guarantee: concurrent
/// increments of one key must never undercount.
#[async_trait]
pub trait ThrottleStore: Send + Sync + 'static {
    /// Read a key's value, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Write a key with an expiry, replacing any previous value and TTL.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), Error>;

    /// Atomically increment a counter key, creating it at 1 if absent.
    ///
    /// Returns the post-increment value.
    async fn incr(&self, key: &str) -> Result<i64, Error>;

    /// Set an expiry on an existing key.
    ///
    /// Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool, Error>;

    /// Remaining lifetime of a key.
    async fn ttl(&self, key: &str) -> Result<KeyTtl, Error>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn del(&self, key: &str) -> Result<(), Error>;
}
