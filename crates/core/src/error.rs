//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("declared size {size} exceeds maximum {max}")]
    SizeLimit { size: u64, max: u64 },

    #[error("upload session not found: {0}")]
    SessionNotFound(String),

    #[error("chunk index {index} out of range (total chunks: {total})")]
    InvalidChunkIndex { index: u32, total: u32 },

    #[error("chunk {index} is {actual} bytes, expected {expected}")]
    ChunkSizeMismatch {
        index: u32,
        expected: u64,
        actual: u64,
    },

    #[error("invalid session state: {0}")]
    InvalidState(String),

    #[error("upload session error: {0}")]
    UploadSession(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
