//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use splice_core::protocol::ErrorBody;
use splice_storage::{StorageError, UploadError};

/// API error type.
///
/// Every error renders as `{success: false, message, error}` where `error` is
/// a stable machine-readable code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Internal(_) => "internal_error",
            Self::Upload(e) => match e {
                UploadError::InvalidChunkRequest(_) => "invalid_chunk_request",
                UploadError::InvalidMergeRequest(_) => "invalid_merge_request",
                UploadError::ChunkWrite { .. } => "chunk_write_failed",
                UploadError::Lookup { .. } => "lookup_failed",
                UploadError::IncompleteUpload { .. } => "incomplete_upload",
                UploadError::CorruptNamespace { .. } => "corrupt_namespace",
                UploadError::MergeFailed { .. } => "merge_failed",
            },
            Self::Storage(StorageError::NotFound(_)) => "not_found",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upload(e) => match e {
                UploadError::InvalidChunkRequest(_)
                | UploadError::InvalidMergeRequest(_)
                | UploadError::IncompleteUpload { .. } => StatusCode::BAD_REQUEST,
                UploadError::CorruptNamespace { .. } => StatusCode::CONFLICT,
                UploadError::ChunkWrite { .. }
                | UploadError::Lookup { .. }
                | UploadError::MergeFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Self::Upload(_) = &self {
            crate::metrics::record_upload_error(self.code());
        }
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "request failed");
        }
        let body = ErrorBody {
            success: false,
            message: self.to_string(),
            error: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
