//! Login protection for credential-based web applications.
//!
//! Portcullis bundles two independent components behind one handle:
//!
//! - **Credential encryption** — passwords are stored reversibly under
//!   AES-256-GCM with tamper detection, so the application can recover the
//!   plaintext for comparison
//!   ([`CredentialCipher`](portcullis_core::CredentialCipher)).
//! - **Lockout throttling** — consecutive failed logins per account are
//!   counted in a shared TTL-capable store and the account locks for a
//!   configured period once a threshold is crossed
//!   ([`LoginThrottleService`](portcullis_core::LoginThrottleService)).
//!
//! The throttle is fail-open: if the store is unreachable, logins proceed
//! unthrottled rather than everyone being locked out, and the degradation is
//! visible both in logs and in the returned
//! [`ThrottleOutcome`](portcullis_core::ThrottleOutcome) values.
//!
//! # Example
//!
//! ```rust,no_run
//! use portcullis::{Config, Portcullis};
//!
//! #[tokio::main]
//! async fn main() {
//!     let guard = Portcullis::from_config(Config::from_env()).await;
//!
//!     // At registration / password change:
//!     let record = guard.encrypt_password("hunter2").unwrap();
//!     // persist `record` as the user's credential field...
//!
//!     // At login, with the persisted record looked up by the caller:
//!     match guard.attempt_login("user@example.com", &record, "hunter2").await {
//!         portcullis::LoginVerdict::Success => { /* issue session */ }
//!         portcullis::LoginVerdict::Locked { retry_after_seconds } => {
//!             /* tell the client to retry later */
//!             let _ = retry_after_seconds;
//!         }
//!         portcullis::LoginVerdict::Rejected { attempts_remaining } => {
//!             /* wrong credential; hint how many attempts remain */
//!             let _ = attempts_remaining;
//!         }
//!     }
//! }
//! ```

use std::sync::Arc;

pub use portcullis_core::{
    AttemptStatus, Config, CredentialCipher, Error, LoginThrottleService, MemoryThrottleStore,
    ThrottleConfig, ThrottleOutcome, ThrottleStore,
};
pub use portcullis_storage_redis::RedisThrottleStore;

/// Outcome of a composed login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginVerdict {
    /// The account is locked; retry after the given number of seconds.
    Locked { retry_after_seconds: u64 },
    /// The supplied password matched; attempt state has been reset.
    Success,
    /// The supplied password did not match (or the stored record did not
    /// decrypt). `attempts_remaining` is the hint for the user-facing
    /// message; when the store is degraded it equals the full threshold.
    Rejected { attempts_remaining: u32 },
}

/// The composed login-protection subsystem.
///
/// Holds the credential cipher and the throttle service over whichever store
/// configuration selected. Cheap to clone is not a goal; share it behind an
/// `Arc` in application state.
pub struct Portcullis {
    cipher: CredentialCipher,
    throttle: LoginThrottleService,
    threshold: u32,
}

impl Portcullis {
    /// Build the subsystem over an explicitly injected store.
    ///
    /// This is the constructor tests and embedders with their own store
    /// wiring use; [`from_config`](Self::from_config) is the
    /// convention-driven path.
    pub fn new(store: Arc<dyn ThrottleStore>, config: Config) -> Self {
        let threshold = config.throttle.max_failed_attempts;
        Self {
            cipher: CredentialCipher::new(&config.secret),
            throttle: LoginThrottleService::new(store, config.throttle),
            threshold,
        }
    }

    /// Build the subsystem from configuration, selecting the store.
    ///
    /// With the shared store enabled and reachable, the Redis adapter is
    /// used; otherwise the in-process fallback, with a warning when Redis
    /// was requested but could not be reached. Never fails: an outage at
    /// startup degrades to in-process throttling rather than refusing to
    /// serve logins.
    pub async fn from_config(config: Config) -> Self {
        let store: Arc<dyn ThrottleStore> = match (config.use_redis, config.redis_url.as_deref()) {
            (true, Some(url)) => match RedisThrottleStore::connect(url).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Redis unreachable at startup, falling back to in-process throttle store"
                    );
                    Arc::new(MemoryThrottleStore::new())
                }
            },
            _ => Arc::new(MemoryThrottleStore::new()),
        };
        Self::new(store, config)
    }

    /// Encrypt a plaintext password into its persisted record form.
    pub fn encrypt_password(&self, plaintext: &str) -> Result<String, Error> {
        self.cipher.encrypt(plaintext)
    }

    /// Decrypt a persisted record; `None` for malformed or tampered records.
    pub fn decrypt_password(&self, record: &str) -> Option<String> {
        self.cipher.decrypt(record)
    }

    /// Remaining lockout seconds for an identifier, 0 if not locked.
    pub async fn lockout_remaining(&self, identifier: &str) -> ThrottleOutcome<u64> {
        self.throttle.lockout_remaining(identifier).await
    }

    /// Record a failed login attempt against an identifier.
    pub async fn record_failed_attempt(&self, identifier: &str) -> ThrottleOutcome<AttemptStatus> {
        self.throttle.record_failed_attempt(identifier).await
    }

    /// Clear attempt and lock state after a verified successful login.
    pub async fn reset_attempts(&self, identifier: &str) -> ThrottleOutcome<()> {
        self.throttle.reset_attempts(identifier).await
    }

    /// Run the full login-protection flow for one attempt.
    ///
    /// Checks the lock first (locked accounts never reach credential
    /// comparison), then compares the supplied password against the
    /// decrypted stored record in constant time, then updates throttle
    /// state: reset on success, increment (possibly locking) on failure.
    ///
    /// The caller still owns user lookup, session issuance, and wording of
    /// the user-facing messages.
    pub async fn attempt_login(
        &self,
        identifier: &str,
        stored_record: &str,
        supplied_password: &str,
    ) -> LoginVerdict {
        let remaining = self.throttle.lockout_remaining(identifier).await.into_inner();
        if remaining > 0 {
            return LoginVerdict::Locked {
                retry_after_seconds: remaining,
            };
        }

        if self.cipher.verify(stored_record, supplied_password) {
            // A degraded reset is already logged; the login still succeeds.
            self.throttle.reset_attempts(identifier).await;
            return LoginVerdict::Success;
        }

        let status = self.throttle.record_failed_attempt(identifier).await.into_inner();
        if status.locked {
            return LoginVerdict::Locked {
                retry_after_seconds: status.ttl_seconds,
            };
        }

        let attempts = u32::try_from(status.attempts).unwrap_or(u32::MAX);
        LoginVerdict::Rejected {
            attempts_remaining: self.threshold.saturating_sub(attempts),
        }
    }
}
