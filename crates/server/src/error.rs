use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// API-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Core(#[from] clipdock_core::Error),

    #[error(transparent)]
    Storage(#[from] clipdock_storage::StorageError),
}

impl ApiError {
    /// Stable machine-readable error code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal_error",
            ApiError::Core(err) => match err {
                clipdock_core::Error::Validation(_) => "validation_failed",
                clipdock_core::Error::SizeLimit { .. } => "size_limit_exceeded",
                clipdock_core::Error::SessionNotFound(_) => "session_not_found",
                clipdock_core::Error::InvalidChunkIndex { .. } => "invalid_chunk_index",
                clipdock_core::Error::ChunkSizeMismatch { .. } => "chunk_size_mismatch",
                clipdock_core::Error::InvalidState(_) => "invalid_state",
                clipdock_core::Error::UploadSession(_) => "upload_session_error",
            },
            ApiError::Storage(err) => match err {
                clipdock_storage::StorageError::NotFound(_) => "not_found",
                _ => "storage_error",
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Core(err) => match err {
                clipdock_core::Error::Validation(_)
                | clipdock_core::Error::SizeLimit { .. }
                | clipdock_core::Error::InvalidChunkIndex { .. }
                | clipdock_core::Error::ChunkSizeMismatch { .. } => StatusCode::BAD_REQUEST,
                clipdock_core::Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
                clipdock_core::Error::InvalidState(_) => StatusCode::CONFLICT,
                clipdock_core::Error::UploadSession(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Storage(err) => match err {
                clipdock_storage::StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "request failed");
        } else {
            tracing::debug!(error = %self, code = self.code(), "request rejected");
        }
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
