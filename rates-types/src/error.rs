//! Error types for the exchange-rate service.

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Missing exchange rate")]
    MissingExchangeRate,

    #[error("Invalid currency code: {0}")]
    InvalidCurrencyCode(String),
}

/// Provider gateway errors (network, vendor payload, quota).
///
/// These are always transient from the engine's point of view: callers log
/// them and treat the provider as having contributed nothing.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected status {status} from {url}")]
    BadStatus { status: u16, url: String },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// Store-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
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

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::BadRequest(e),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::MissingExchangeRate => AppError::NotFound("Exchange rate not found".into()),
            DomainError::InvalidCurrencyCode(code) => {
                AppError::BadRequest(format!("Invalid currency code: {code}"))
            }
        }
    }
}
