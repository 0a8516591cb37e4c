//! Runtime configuration for the login-protection subsystem.
//!
//! Configuration is resolved once at startup, either directly from structs or
//! from environment variables via [`Config::from_env`]. Environment lookup is
//! abstracted behind a closure ([`Config::from_lookup`]) so tests can supply
//! values without mutating process state.
//!
//! Recognized environment variables:
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `PASSWORD_SECRET` | Secret the cipher key is derived from | falls back to `SESSION_SECRET` |
//! | `SESSION_SECRET` | Secondary secret | falls back to a dev-only default |
//! | `REDIS_URL` | Shared store endpoint | none |
//! | `USE_REDIS` | `"true"` enables the shared store | disabled |
//! | `LOGIN_ATTEMPT_THRESHOLD` | Failed attempts before lockout | 5 |
//! | `LOGIN_LOCK_SECONDS` | Lockout / attempt-window duration | 30 |

use serde::{Deserialize, Serialize};

/// Development-only fallback secret.
///
/// Used when neither `PASSWORD_SECRET` nor `SESSION_SECRET` is configured.
/// Must never be relied on in a production deployment; resolving to it logs
/// a warning.
pub const DEV_DEFAULT_SECRET: &str = "default_dev_secret_change_me";

const DEFAULT_ATTEMPT_THRESHOLD: u32 = 5;
const DEFAULT_LOCK_SECONDS: u64 = 30;

/// Lockout policy for [`LoginThrottleService`](crate::services::LoginThrottleService).
///
/// Held by the service rather than passed per call, so the active policy is
/// auditable in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Consecutive failures at which the account locks.
    pub max_failed_attempts: u32,
    /// Lock duration, and the inactivity window on the attempt counter.
    pub lock_seconds: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: DEFAULT_ATTEMPT_THRESHOLD,
            lock_seconds: DEFAULT_LOCK_SECONDS,
        }
    }
}

/// Top-level configuration for the subsystem.
#[derive(Clone)]
pub struct Config {
    /// Secret the credential cipher key is derived from. Never used raw as
    /// key material; see [`CredentialCipher`](crate::crypto::CredentialCipher).
    pub secret: String,
    /// Shared store endpoint, e.g. `redis://127.0.0.1:6379`.
    pub redis_url: Option<String>,
    /// Whether the shared store is enabled. When false (or when the endpoint
    /// is absent), the in-process fallback store is used.
    pub use_redis: bool,
    pub throttle: ThrottleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            secret: DEV_DEFAULT_SECRET.to_string(),
            redis_url: None,
            use_redis: false,
            throttle: ThrottleConfig::default(),
        }
    }
}

// Manual Debug so the secret never lands in logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("secret", &"<redacted>")
            .field("redis_url", &self.redis_url)
            .field("use_redis", &self.use_redis)
            .field("throttle", &self.throttle)
            .finish()
    }
}

impl Config {
    /// Resolve configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary lookup function.
    ///
    /// Unparsable integer values fall back to their defaults with a warning
    /// rather than failing startup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("PASSWORD_SECRET")
            .filter(|s| !s.is_empty())
            .or_else(|| lookup("SESSION_SECRET").filter(|s| !s.is_empty()))
            .unwrap_or_else(|| {
                tracing::warn!(
                    "No PASSWORD_SECRET or SESSION_SECRET configured; using the \
                     development default secret. Do not deploy this to production."
                );
                DEV_DEFAULT_SECRET.to_string()
            });

        let redis_url = lookup("REDIS_URL").filter(|s| !s.is_empty());
        let use_redis =
            lookup("USE_REDIS").is_some_and(|v| v.eq_ignore_ascii_case("true")) && redis_url.is_some();

        let max_failed_attempts = parse_or_default(
            lookup("LOGIN_ATTEMPT_THRESHOLD"),
            "LOGIN_ATTEMPT_THRESHOLD",
            DEFAULT_ATTEMPT_THRESHOLD,
        );
        let lock_seconds = parse_or_default(
            lookup("LOGIN_LOCK_SECONDS"),
            "LOGIN_LOCK_SECONDS",
            DEFAULT_LOCK_SECONDS,
        );

        Self {
            secret,
            redis_url,
            use_redis,
            throttle: ThrottleConfig {
                max_failed_attempts,
                lock_seconds,
            },
        }
    }

    /// Whether the subsystem is running on the development default secret.
    pub fn uses_dev_secret(&self) -> bool {
        self.secret == DEV_DEFAULT_SECRET
    }
}

fn parse_or_default<T: std::str::FromStr + Copy>(
    value: Option<String>,
    field: &str,
    default: T,
) -> T {
    match value {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(field, value = %raw, "Unparsable configuration value, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(env(&[]));
        assert!(config.uses_dev_secret());
        assert!(!config.use_redis);
        assert_eq!(config.throttle.max_failed_attempts, 5);
        assert_eq!(config.throttle.lock_seconds, 30);
    }

    #[test]
    fn test_secret_fallback_chain() {
        let config = Config::from_lookup(env(&[
            ("PASSWORD_SECRET", "primary"),
            ("SESSION_SECRET", "secondary"),
        ]));
        assert_eq!(config.secret, "primary");

        let config = Config::from_lookup(env(&[("SESSION_SECRET", "secondary")]));
        assert_eq!(config.secret, "secondary");

        let config = Config::from_lookup(env(&[("PASSWORD_SECRET", "")]));
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn test_use_redis_requires_url() {
        let config = Config::from_lookup(env(&[("USE_REDIS", "true")]));
        assert!(!config.use_redis);

        let config = Config::from_lookup(env(&[
            ("USE_REDIS", "true"),
            ("REDIS_URL", "redis://localhost:6379"),
        ]));
        assert!(config.use_redis);
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));

        // URL alone does not enable the shared store
        let config = Config::from_lookup(env(&[("REDIS_URL", "redis://localhost:6379")]));
        assert!(!config.use_redis);
    }

    #[test]
    fn test_policy_overrides() {
        let config = Config::from_lookup(env(&[
            ("LOGIN_ATTEMPT_THRESHOLD", "3"),
            ("LOGIN_LOCK_SECONDS", "120"),
        ]));
        assert_eq!(config.throttle.max_failed_attempts, 3);
        assert_eq!(config.throttle.lock_seconds, 120);
    }

    #[test]
    fn test_unparsable_policy_falls_back() {
        let config = Config::from_lookup(env(&[("LOGIN_ATTEMPT_THRESHOLD", "lots")]));
        assert_eq!(config.throttle.max_failed_attempts, 5);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = Config {
            secret: "hunter2".to_string(),
            ..Config::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
