use std::sync::Arc;

use async_trait::async_trait;
use portcullis::{
    Config, Error, LoginVerdict, MemoryThrottleStore, Portcullis, ThrottleConfig, ThrottleStore,
};
use portcullis_core::{error::StoreError, store::KeyTtl};

fn config() -> Config {
    Config {
        secret: "integration_test_secret".to_string(),
        throttle: ThrottleConfig {
            max_failed_attempts: 5,
            lock_seconds: 30,
        },
        ..Config::default()
    }
}

fn guard() -> Portcullis {
    Portcullis::new(Arc::new(MemoryThrottleStore::new()), config())
}

#[tokio::test]
async fn test_successful_login_resets_state() {
    let guard = guard();
    let email = "user@example.com";
    let record = guard.encrypt_password("hunter2").unwrap();

    // Two failures first
    guard.attempt_login(email, &record, "wrong").await;
    guard.attempt_login(email, &record, "also wrong").await;

    let verdict = guard.attempt_login(email, &record, "hunter2").await;
    assert_eq!(verdict, LoginVerdict::Success);

    // The counter restarted: a new failure is attempt 1 of 5 again
    let verdict = guard.attempt_login(email, &record, "wrong").await;
    assert_eq!(verdict, LoginVerdict::Rejected { attempts_remaining: 4 });
}

#[tokio::test]
async fn test_rejections_count_down_to_lock() {
    let guard = guard();
    let email = "user@example.com";
    let record = guard.encrypt_password("hunter2").unwrap();

    for expected_remaining in [4u32, 3, 2, 1] {
        let verdict = guard.attempt_login(email, &record, "wrong").await;
        assert_eq!(
            verdict,
            LoginVerdict::Rejected {
                attempts_remaining: expected_remaining
            }
        );
    }

    match guard.attempt_login(email, &record, "wrong").await {
        LoginVerdict::Locked { retry_after_seconds } => assert_eq!(retry_after_seconds, 30),
        other => panic!("expected lock, got {other:?}"),
    }

    // While locked, even the correct password is not compared
    match guard.attempt_login(email, &record, "hunter2").await {
        LoginVerdict::Locked { retry_after_seconds } => {
            assert!(retry_after_seconds > 0 && retry_after_seconds <= 30)
        }
        other => panic!("expected lock, got {other:?}"),
    }
}

#[tokio::test]
async fn test_undecryptable_record_rejects_without_panic() {
    let guard = guard();
    let verdict = guard
        .attempt_login("user@example.com", "not:a-real:record", "anything")
        .await;
    assert_eq!(verdict, LoginVerdict::Rejected { attempts_remaining: 4 });
}

#[tokio::test]
async fn test_identifier_normalization_shares_lockout() {
    let guard = guard();
    let record = guard.encrypt_password("hunter2").unwrap();

    for _ in 0..4 {
        guard.attempt_login(" User@Example.COM ", &record, "wrong").await;
    }
    let verdict = guard.attempt_login("user@example.com", &record, "wrong").await;
    assert!(matches!(verdict, LoginVerdict::Locked { .. }));
}

/// Store that fails every operation, to exercise the fail-open paths.
struct OutageStore;

#[async_trait]
impl ThrottleStore for OutageStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, Error> {
        Err(StoreError::Connection("store outage".to_string()).into())
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl_seconds: u64) -> Result<(), Error> {
        Err(StoreError::Connection("store outage".to_string()).into())
    }

    async fn incr(&self, _key: &str) -> Result<i64, Error> {
        Err(StoreError::Connection("store outage".to_string()).into())
    }

    async fn expire(&self, _key: &str, _ttl_seconds: u64) -> Result<bool, Error> {
        Err(StoreError::Connection("store outage".to_string()).into())
    }

    async fn ttl(&self, _key: &str) -> Result<KeyTtl, Error> {
        Err(StoreError::Connection("store outage".to_string()).into())
    }

    async fn del(&self, _key: &str) -> Result<(), Error> {
        Err(StoreError::Connection("store outage".to_string()).into())
    }
}

#[tokio::test]
async fn test_store_outage_fails_open() {
    // Degraded paths log warnings; render them in test output
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let guard = Portcullis::new(Arc::new(OutageStore), config());
    let email = "user@example.com";
    let record = guard.encrypt_password("hunter2").unwrap();

    // Degraded outcomes are explicit on the raw operations
    let outcome = guard.lockout_remaining(email).await;
    assert!(outcome.is_degraded());
    assert_eq!(outcome.into_inner(), 0);

    let outcome = guard.record_failed_attempt(email).await;
    assert!(outcome.is_degraded());
    assert!(!outcome.into_inner().locked);

    // A correct login still succeeds during the outage
    let verdict = guard.attempt_login(email, &record, "hunter2").await;
    assert_eq!(verdict, LoginVerdict::Success);

    // A wrong password is rejected but never locks; the hint degrades to
    // the full threshold
    let verdict = guard.attempt_login(email, &record, "wrong").await;
    assert_eq!(verdict, LoginVerdict::Rejected { attempts_remaining: 5 });
}

#[tokio::test]
async fn test_from_config_defaults_to_in_process_store() {
    let guard = Portcullis::from_config(config()).await;
    let email = "user@example.com";
    let record = guard.encrypt_password("hunter2").unwrap();

    let verdict = guard.attempt_login(email, &record, "wrong").await;
    assert_eq!(verdict, LoginVerdict::Rejected { attempts_remaining: 4 });
    assert!(!guard.record_failed_attempt(email).await.is_degraded());
}
