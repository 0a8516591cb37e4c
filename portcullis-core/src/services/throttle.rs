//! Login throttle service for account-based lockout.
//!
//! Tracks consecutive failed login attempts per account identifier in a
//! TTL-capable store and locks the account once a threshold is crossed. Per
//! identifier the state machine has three states, all owned by the store:
//!
//! - **Clean** — no counter, no lock.
//! - **Accumulating** — a counter below the threshold, expiring after the
//!   configured window of inactivity.
//! - **Locked** — a lock marker whose remaining TTL is the remaining lockout.
//!
//! Expiry-driven transitions back to Clean happen entirely through the
//! store's TTL mechanism; nothing polls.
//!
//! # Failure policy
//!
//! Every operation is fail-open: a store failure never propagates to the
//! caller and never blocks a login. Instead the operation returns a
//! [`ThrottleOutcome::Degraded`] carrying a conservative fallback (not
//! locked, zero attempts) and logs the underlying error with the identifier
//! and operation so operators can spot store outages. Under a store outage
//! lockout protection is temporarily void by design; availability wins over
//! strictness here.
//!
//! # Example
//!
//! ```rust,ignore
//! use portcullis_core::services::LoginThrottleService;
//!
//! let throttle = LoginThrottleService::new(store, config);
//!
//! if throttle.lockout_remaining("user@example.com").await.into_inner() > 0 {
//!     // Tell the client to come back later; skip credential comparison.
//! }
//! // ... on authentication failure:
//! let status = throttle.record_failed_attempt("user@example.com").await;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    config::ThrottleConfig,
    store::{KeyTtl, ThrottleStore},
};

/// Result of recording a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptStatus {
    /// Consecutive failures recorded, including this one.
    pub attempts: i64,
    /// Whether this attempt transitioned the account to Locked.
    pub locked: bool,
    /// Remaining TTL: the lock duration when `locked`, otherwise the attempt
    /// window's remaining seconds.
    pub ttl_seconds: u64,
}

impl AttemptStatus {
    /// The conservative fallback reported when the store is unreachable.
    fn fail_open() -> Self {
        Self {
            attempts: 0,
            locked: false,
            ttl_seconds: 0,
        }
    }
}

/// Outcome of a throttle operation: applied normally, or degraded because
/// the store failed.
///
/// Both variants carry a usable value, so callers that do not care about
/// degradation can simply [`into_inner`](Self::into_inner). Tests and
/// callers that do care can assert on [`is_degraded`](Self::is_degraded)
/// instead of scraping logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleOutcome<T> {
    /// The store round-trip succeeded; the value is authoritative.
    Applied(T),
    /// The store failed; the value is the fail-open fallback.
    Degraded(T),
}

impl<T> ThrottleOutcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            ThrottleOutcome::Applied(value) | ThrottleOutcome::Degraded(value) => value,
        }
    }

    pub fn get(&self) -> &T {
        match self {
            ThrottleOutcome::Applied(value) | ThrottleOutcome::Degraded(value) => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ThrottleOutcome::Degraded(_))
    }
}

/// Service enforcing the per-account lockout policy.
///
/// # Thread Safety
///
/// The service is thread-safe and shared across request handlers; all
/// mutable state lives in the injected store, which guarantees linearizable
/// increments.
pub struct LoginThrottleService {
    store: Arc<dyn ThrottleStore>,
    config: ThrottleConfig,
}

impl LoginThrottleService {
    /// Create a new throttle over an injected store.
    ///
    /// The policy is fixed at construction; see
    /// [`ThrottleConfig`](crate::config::ThrottleConfig) for the defaults
    /// (5 attempts, 30 second lock).
    pub fn new(store: Arc<dyn ThrottleStore>, config: ThrottleConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Remaining lockout in seconds for an identifier, 0 if not locked.
    ///
    /// Fail-open: a store failure yields `Degraded(0)` so the login attempt
    /// proceeds.
    pub async fn lockout_remaining(&self, identifier: &str) -> ThrottleOutcome<u64> {
        let identifier = normalize_identifier(identifier);
        match self.store.ttl(&lock_key(&identifier)).await {
            Ok(ttl) => ThrottleOutcome::Applied(ttl.remaining_seconds()),
            Err(e) => {
                tracing::warn!(
                    identifier = %identifier,
                    operation = "lockout_remaining",
                    error = %e,
                    "Store failure checking lock state, failing open"
                );
                ThrottleOutcome::Degraded(0)
            }
        }
    }

    /// Whether the identifier is currently locked (convenience method).
    pub async fn is_locked(&self, identifier: &str) -> bool {
        self.lockout_remaining(identifier).await.into_inner() > 0
    }

    /// Record a failed login attempt, locking the account at the threshold.
    ///
    /// Increments the identifier's failure counter atomically. The first
    /// increment also puts the configured window on the counter so idle
    /// accounts self-heal; crossing the threshold replaces the counter with a
    /// lock marker whose TTL is the lock duration.
    ///
    /// The window-setting step is a second store round-trip and tolerates a
    /// benign race with concurrent attempts: the TTL may be set twice or
    /// slightly late, never left unbounded in practice. If the store fails
    /// partway (counter incremented, lock not set), the error is logged and
    /// the result is degraded; callers must treat a degraded result as "do
    /// not block this login", never as an applied lock.
    pub async fn record_failed_attempt(&self, identifier: &str) -> ThrottleOutcome<AttemptStatus> {
        let identifier = normalize_identifier(identifier);
        match self.try_record_failed_attempt(&identifier).await {
            Ok(status) => ThrottleOutcome::Applied(status),
            Err(e) => {
                tracing::warn!(
                    identifier = %identifier,
                    operation = "record_failed_attempt",
                    error = %e,
                    "Store failure recording failed attempt, failing open"
                );
                ThrottleOutcome::Degraded(AttemptStatus::fail_open())
            }
        }
    }

    /// Clear the counter and lock for an identifier.
    ///
    /// Called after a verified successful authentication. Idempotent: safe
    /// when neither entry exists.
    pub async fn reset_attempts(&self, identifier: &str) -> ThrottleOutcome<()> {
        let identifier = normalize_identifier(identifier);
        let result = async {
            self.store.del(&attempts_key(&identifier)).await?;
            self.store.del(&lock_key(&identifier)).await?;
            Ok::<_, Error>(())
        }
        .await;

        match result {
            Ok(()) => ThrottleOutcome::Applied(()),
            Err(e) => {
                tracing::warn!(
                    identifier = %identifier,
                    operation = "reset_attempts",
                    error = %e,
                    "Store failure resetting attempts"
                );
                ThrottleOutcome::Degraded(())
            }
        }
    }

    async fn try_record_failed_attempt(&self, identifier: &str) -> Result<AttemptStatus, Error> {
        let attempts_key = attempts_key(identifier);
        let lock_key = lock_key(identifier);
        let lock_seconds = self.config.lock_seconds;

        let attempts = self.store.incr(&attempts_key).await?;

        // A freshly created counter has no expiry yet; give it the window so
        // it cannot outlive the policy.
        if self.store.ttl(&attempts_key).await? == KeyTtl::Persistent {
            self.store.expire(&attempts_key, lock_seconds).await?;
        }

        if attempts >= i64::from(self.config.max_failed_attempts) {
            self.store.set_ex(&lock_key, "1", lock_seconds).await?;
            self.store.del(&attempts_key).await?;
            tracing::info!(
                identifier = %identifier,
                attempts,
                lock_seconds,
                "Account locked after repeated failed login attempts"
            );
            return Ok(AttemptStatus {
                attempts,
                locked: true,
                ttl_seconds: lock_seconds,
            });
        }

        let ttl_seconds = self.store.ttl(&attempts_key).await?.remaining_seconds();
        Ok(AttemptStatus {
            attempts,
            locked: false,
            ttl_seconds,
        })
    }
}

/// Normalize an account identifier before keying: trimmed, ASCII-lowercased.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_ascii_lowercase()
}

fn attempts_key(identifier: &str) -> String {
    format!("login:attempts:{}", urlencoding::encode(identifier))
}

fn lock_key(identifier: &str) -> String {
    format!("login:lock:{}", urlencoding::encode(identifier))
}
