//! Provider error types
//!
//! Every provider implementation normalizes its failures into
//! `ProviderError` so callers can classify without knowing the backend:
//! transient failures are retried on the next cycle, unknown symbols are
//! dropped at the next universe refresh.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network failure, timeout, 5xx or rate-limited response.
    /// Safe to retry next cycle; never fatal.
    #[error("transient provider error: {0}")]
    Transient(String),

    /// The symbol is unknown or delisted. Candidate for removal from the
    /// watch list at the next universe refresh; retrying is pointless.
    #[error("symbol not found or delisted: {0}")]
    NotFound(String),

    /// The provider answered with something we cannot interpret.
    #[error("malformed provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether retrying on a later cycle can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        // Transport-level failures (DNS, connect, timeout, broken body) are
        // all retryable from the caller's point of view.
        ProviderError::Transient(e.to_string())
    }
}

/// Result type alias for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;
