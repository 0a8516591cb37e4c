//! Core functionality for the portcullis login-protection subsystem
//!
//! This crate contains the two components the subsystem is built from:
//!
//! - [`CredentialCipher`] — authenticated encryption of stored credentials
//!   (AES-256-GCM under a secret-derived key), with tamper detection.
//! - [`LoginThrottleService`] — per-account failed-attempt tracking and
//!   time-bounded lockout, backed by a TTL-capable key-value store.
//!
//! The store is abstracted behind [`store::ThrottleStore`] and injected, so
//! the same service runs against the distributed Redis adapter
//! (`portcullis-storage-redis`), the in-process
//! [`store::MemoryThrottleStore`] fallback, or a test double.
//!
//! Application code normally consumes these through the `portcullis` facade
//! crate rather than directly.

pub mod config;
pub mod crypto;
pub mod error;
pub mod services;
pub mod store;

pub use config::{Config, ThrottleConfig};
pub use crypto::CredentialCipher;
pub use error::Error;
pub use services::{AttemptStatus, LoginThrottleService, ThrottleOutcome};
pub use store::{MemoryThrottleStore, ThrottleStore};
