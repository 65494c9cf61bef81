//! Core domain types and shared logic for the Clipdock upload service.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Inbound upload session lifecycle and wire DTOs
//! - Chunk boundary math
//! - Progress and ETA computation
//! - Media type recognition
//! - Outbound session bookkeeping for publish adapters
//! - Configuration

pub mod chunks;
pub mod config;
pub mod error;
pub mod media;
pub mod outbound;
pub mod progress;
pub mod session;

pub use chunks::{chunk_count, chunk_offset, chunk_size_for_index};
pub use config::{AppConfig, PublishConfig, ServerConfig, StorageConfig};
pub use error::{Error, Result};
pub use media::{media_type_for, validate_filename, MediaCategory, MediaType};
pub use outbound::{ChunkState, OutboundStatus, OutboundUploadSession, Platform, RemoteHandle};
pub use progress::{eta_millis, progress_percent};
pub use session::{
    ChunkAccepted, InitUploadRequest, InitUploadResponse, ProgressResponse, ResumeResponse,
    SessionId, SessionStatus, UploadSession,
};

/// Default inbound chunk size: 5 MB.
pub const DEFAULT_CHUNK_SIZE: u64 = 5_000_000;

/// Default maximum accepted file size: 2 GiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;
