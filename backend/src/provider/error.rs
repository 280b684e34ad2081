//! Error types for the verification provider client

use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Normalized provider failure modes.
///
/// Every non-2xx response and every transport failure maps onto exactly one
/// of these; the client never retries on its own.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider rejected the API credentials (401)
    #[error("Provider rejected the API credentials")]
    Auth,

    /// The credentials lack the required scope (403)
    #[error("Provider credentials lack the required scope")]
    Permission,

    /// The provider rejected the request payload (400)
    #[error("Provider rejected the request: {0}")]
    BadRequest(String),

    /// The provider throttled us (429)
    #[error("Provider rate limit hit")]
    RateLimited {
        /// Retry-After hint in seconds, when the provider sent one
        retry_after: Option<u64>,
    },

    /// The requested resource does not exist at the provider (404)
    #[error("Resource not found at provider")]
    NotFound,

    /// Any other upstream or transport failure
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}
