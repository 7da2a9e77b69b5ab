//! Application-wide error types using thiserror
//!
//! All errors in the application should be wrapped in AppError
//! to provide consistent error handling across the codebase.
//! Per-domain errors (`ProviderError`, `MessagingError`) live in their
//! modules and convert into `AppError` via `#[from]`.

use thiserror::Error;

use crate::messaging::errors::MessagingError;
use crate::provider::errors::ProviderError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Unexpected cycle failure: {0}")]
    Cycle(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
