use std::sync::Arc;

use portcullis::{Config, MemoryThrottleStore, Portcullis};

fn guard() -> Portcullis {
    let config = Config {
        secret: "integration_test_secret".to_string(),
        ..Config::default()
    };
    Portcullis::new(Arc::new(MemoryThrottleStore::new()), config)
}

#[test]
fn test_password_round_trip_through_facade() {
    let guard = guard();
    for password in ["hunter2", "pässwörd-密码", "🔐", "with:colons:inside"] {
        let record = guard.encrypt_password(password).unwrap();
        assert_eq!(guard.decrypt_password(&record).as_deref(), Some(password));
    }
}

#[test]
fn test_records_are_unique_per_encryption() {
    let guard = guard();
    let a = guard.encrypt_password("same password").unwrap();
    let b = guard.encrypt_password("same password").unwrap();
    assert_ne!(a, b);
    assert_eq!(guard.decrypt_password(&a), guard.decrypt_password(&b));
}

#[test]
fn test_tampered_record_yields_none() {
    let guard = guard();
    let record = guard.encrypt_password("hunter2").unwrap();

    // Flip each hex digit of the record in turn; every mutation of the tag
    // or ciphertext segments must be rejected. (Nonce flips alter the
    // decryption input and must also fail authentication.)
    let bytes = record.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] == b':' {
            continue;
        }
        let mut mutated = record.clone().into_bytes();
        mutated[i] = if mutated[i] == b'0' { b'1' } else { b'0' };
        let mutated = String::from_utf8(mutated).unwrap();
        assert_eq!(
            guard.decrypt_password(&mutated),
            None,
            "tampered record accepted at byte {i}"
        );
    }
}

#[test]
fn test_malformed_records_yield_none() {
    let guard = guard();
    for record in ["", "a:b", "a:b:c:d", "::", "xyz:abc:def"] {
        assert_eq!(guard.decrypt_password(record), None);
    }
}
