//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Body returned for any request whose payload cannot be read as the expected JSON.
pub const UNMARSHAL_MESSAGE: &str = "error unmarshalling request";

/// API error type.
///
/// Errors render as plain text with the status from [`ApiError::status_code`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// The image payload is not valid base64. Reported as a server fault.
    #[error("error decoding image: {0}")]
    Decode(String),

    /// The image could not be written to the object store.
    #[error("unable to upload to storage")]
    UploadFailed(#[source] whoisit_storage::StorageError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] whoisit_storage::StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] whoisit_metadata::MetadataError),
}

impl ApiError {
    /// Short label used in logs and the upload error metric.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Decode(_) => "decode",
            Self::UploadFailed(_) => "storage_write",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal_error",
            Self::Storage(_) => "storage_error",
            Self::Metadata(_) => "metadata_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UploadFailed(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Metadata(e) => match e {
                whoisit_metadata::MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                whoisit_metadata::MetadataError::AlreadyExists(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
