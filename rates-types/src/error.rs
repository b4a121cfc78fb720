//! Error types for the rates service.

/// Durable store errors (data access failures).
///
/// `NotFound` is the one recoverable case: the resolver normalizes it to a
/// cache miss. Everything else aborts the resolution chain.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Value not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),
}

/// Provider-level errors: bad calls versus upstream failures.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request violates the provider's contract (unsupported currency,
    /// out-of-range date, base constraint).
    #[error("Request is invalid: {0}")]
    InvalidRequest(String),

    /// The upstream call failed: transport error, non-success status,
    /// malformed payload, or a provider-reported error.
    #[error("Upstream provider error: {0}")]
    Upstream(String),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("Value not found".into()),
            StoreError::Database(e) => AppError::Storage(e),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidRequest(msg) => AppError::BadRequest(msg),
            ProviderError::Upstream(msg) => AppError::Upstream(msg),
        }
    }
}
