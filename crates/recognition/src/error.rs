//! Recognition error types.

use thiserror::Error;

/// Recognition service errors.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// The service could not read the referenced object as an image.
    #[error("image {key} rejected ({code}): {message}")]
    InvalidImage {
        key: String,
        code: String,
        message: String,
    },

    #[error("recognition service throttled the request: {0}")]
    Throttled(String),

    #[error("recognition service error: {0}")]
    Service(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type for recognition operations.
pub type RecognitionResult<T> = std::result::Result<T, RecognitionError>;
