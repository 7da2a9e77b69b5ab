//! Messaging error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MessagingError {
    /// Network-level failure reaching the messaging API
    #[error("messaging transport error: {0}")]
    Transport(String),

    /// The messaging API rejected the request
    #[error("messaging API error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for MessagingError {
    fn from(e: reqwest::Error) -> Self {
        MessagingError::Transport(e.to_string())
    }
}

/// Result type alias for messaging operations
pub type MessagingResult<T> = Result<T, MessagingError>;
