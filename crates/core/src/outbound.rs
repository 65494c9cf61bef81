//! Outbound (server → platform) upload session types.
//!
//! Each adapter owns one of these per transfer. The remote handle is
//! platform-specific and opaque to everything outside the owning adapter.

use crate::chunks::{chunk_count, chunk_size_for_index};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Remote platform targeted by an outbound transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Twitter,
    TikTok,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::YouTube => write!(f, "youtube"),
            Self::Twitter => write!(f, "twitter"),
            Self::TikTok => write!(f, "tiktok"),
        }
    }
}

/// Platform-specific session handle issued at initialize time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteHandle {
    /// Single-use signed upload URL (resumable PUT protocol).
    UploadUrl(String),
    /// Remote-issued media identifier scoping APPEND/FINALIZE calls.
    MediaId(String),
    /// Upload URL plus opaque upload id (generic multipart protocol).
    UploadUrlWithId { url: String, upload_id: String },
}

/// Outbound session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundStatus {
    Initialized,
    Uploading,
    Completed,
    Failed,
}

impl OutboundStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Per-chunk bookkeeping for an outbound transfer.
#[derive(Clone, Debug)]
pub struct ChunkState {
    /// Zero-based chunk index.
    pub index: u32,
    /// Byte size of this chunk (the final one is the remainder).
    pub size: u64,
    /// Whether the remote acknowledged this chunk.
    pub uploaded: bool,
    /// Remote per-chunk acknowledgment token, when the protocol issues one.
    pub remote_ack: Option<String>,
}

/// An outbound upload session tracking one adapter-owned transfer.
#[derive(Clone, Debug)]
pub struct OutboundUploadSession {
    pub id: crate::session::SessionId,
    pub platform: Platform,
    pub file_name: String,
    pub file_size: u64,
    /// Set by the adapter's initialize call.
    pub remote_handle: Option<RemoteHandle>,
    pub chunks: Vec<ChunkState>,
    pub status: OutboundStatus,
    pub started_at: OffsetDateTime,
}

impl OutboundUploadSession {
    /// Create a session with its chunk plan laid out for `chunk_size`.
    pub fn new(platform: Platform, file_name: String, file_size: u64, chunk_size: u64) -> Self {
        let total = chunk_count(file_size, chunk_size);
        let chunks = (0..total)
            .map(|index| ChunkState {
                index,
                size: chunk_size_for_index(file_size, total, chunk_size, index),
                uploaded: false,
                remote_ack: None,
            })
            .collect();
        Self {
            id: crate::session::SessionId::new(),
            platform,
            file_name,
            file_size,
            remote_handle: None,
            chunks,
            status: OutboundStatus::Initialized,
            started_at: OffsetDateTime::now_utc(),
        }
    }

    /// Bytes acknowledged by the remote so far.
    pub fn bytes_uploaded(&self) -> u64 {
        self.chunks.iter().filter(|c| c.uploaded).map(|c| c.size).sum()
    }

    /// Whether every planned chunk has been acknowledged.
    pub fn all_chunks_uploaded(&self) -> bool {
        self.chunks.iter().all(|c| c.uploaded)
    }

    /// Lowest-indexed chunk not yet acknowledged.
    pub fn next_pending_chunk(&self) -> Option<u32> {
        self.chunks.iter().find(|c| !c.uploaded).map(|c| c.index)
    }

    /// Elapsed time since the transfer started, in milliseconds.
    pub fn elapsed_millis(&self) -> u64 {
        let elapsed = OffsetDateTime::now_utc() - self.started_at;
        elapsed.whole_milliseconds().max(0) as u64
    }
}
