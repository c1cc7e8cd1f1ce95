//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid base64 image: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("invalid image id: {0}")]
    InvalidImageId(String),

    #[error("invalid notification: {0}")]
    InvalidEvent(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
