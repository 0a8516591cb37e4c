//! Service layer coordinating between stores and the application.

pub mod throttle;

pub use throttle::{AttemptStatus, LoginThrottleService, ThrottleOutcome, normalize_identifier};
