use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Failures of the shared key-value store backing the throttle.
///
/// These never reach throttle callers directly: the service converts them
/// into a degraded, fail-open outcome and logs them. They are surfaced here
/// so store adapters and tests can be precise about what went wrong.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    Encryption(String),
}

impl Error {
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Store(_))
    }

    pub fn is_crypto_error(&self) -> bool {
        matches!(self, Error::Crypto(_))
    }
}

/// Extension trait for Result types to simplify store error mapping.
///
/// Store adapters wrap driver errors with this instead of repeating
/// `map_err(|e| Error::Store(StoreError::Backend(e.to_string())))` at every
/// call site.
pub trait StoreResultExt<T> {
    /// Convert a driver error into a backend store error
    fn map_store_err(self) -> Result<T, Error>;

    /// Convert a driver error into a backend store error with context
    fn map_store_err_with_context(self, context: &str) -> Result<T, Error>;
}

impl<T, E: std::fmt::Display> StoreResultExt<T> for Result<T, E> {
    fn map_store_err(self) -> Result<T, Error> {
        self.map_err(|e| Error::Store(StoreError::Backend(e.to_string())))
    }

    fn map_store_err_with_context(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| Error::Store(StoreError::Backend(format!("{context}: {e}"))))
    }
}
