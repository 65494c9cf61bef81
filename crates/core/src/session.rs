//! Inbound upload session types and lifecycle.

use crate::chunks::chunk_size_for_index;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Unique identifier for an upload session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::Error::UploadSession(format!("invalid session ID: {e}")))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inbound session state.
///
/// Transitions are monotonic forward; `Completed`, `Failed` and `Cancelled`
/// are absorbing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session is open and accepting chunks.
    Uploading,
    /// All chunks arrived; assembly is in progress.
    Finalizing,
    /// Assembled and registered with the persistence sink.
    Completed,
    /// Assembly or storage failed; requires a fresh upload.
    Failed,
    /// Explicitly cancelled or reaped for staleness.
    Cancelled,
}

impl SessionStatus {
    /// Check if the session can still receive chunks.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Uploading)
    }

    /// Check if the session reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// An inbound upload session tracking resumable chunk state.
#[derive(Clone, Debug)]
pub struct UploadSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// Original filename as declared by the client.
    pub filename: String,
    /// Total file size declared at init, in bytes.
    pub declared_total_size: u64,
    /// Total chunk count declared at init.
    pub declared_total_chunks: u32,
    /// Chunk size negotiated at init.
    pub chunk_size: u64,
    /// Indices of chunks received so far. Grows monotonically; duplicate
    /// writes of an index are idempotent.
    pub received_chunks: HashSet<u32>,
    /// Bytes received, counted once per distinct chunk index.
    pub bytes_received: u64,
    /// Current session state.
    pub status: SessionStatus,
    /// When the session was created.
    pub created_at: OffsetDateTime,
    /// Updated on every accepted chunk or resume query; drives the reaper.
    pub last_activity_at: OffsetDateTime,
    /// Error detail recorded when assembly fails.
    pub error: Option<String>,
}

impl UploadSession {
    /// Create a new session in `Uploading` state.
    pub fn new(
        filename: String,
        declared_total_size: u64,
        declared_total_chunks: u32,
        chunk_size: u64,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: SessionId::new(),
            filename,
            declared_total_size,
            declared_total_chunks,
            chunk_size,
            received_chunks: HashSet::new(),
            bytes_received: 0,
            status: SessionStatus::Uploading,
            created_at: now,
            last_activity_at: now,
            error: None,
        }
    }

    /// Record a chunk arrival. Returns `true` if the index was new.
    ///
    /// The caller is responsible for bounds and size validation; this only
    /// performs the set-add and byte-counter update, which must stay atomic
    /// with respect to each other.
    pub fn record_chunk(&mut self, index: u32, size: u64) -> bool {
        let newly_received = self.received_chunks.insert(index);
        if newly_received {
            self.bytes_received += size;
        }
        self.touch();
        newly_received
    }

    /// Refresh the liveness timestamp.
    pub fn touch(&mut self) {
        self.last_activity_at = OffsetDateTime::now_utc();
    }

    /// Check whether every declared chunk has arrived.
    ///
    /// Computed from set cardinality, never from the index of the chunk just
    /// received, so out-of-order and concurrent arrival are supported.
    pub fn is_complete(&self) -> bool {
        self.received_chunks.len() as u32 == self.declared_total_chunks
    }

    /// Expected byte size for a given chunk index (the last chunk is the
    /// remainder).
    pub fn expected_chunk_size(&self, index: u32) -> u64 {
        chunk_size_for_index(
            self.declared_total_size,
            self.declared_total_chunks,
            self.chunk_size,
            index,
        )
    }

    /// Elapsed time since the session was created, in milliseconds.
    pub fn elapsed_millis(&self) -> u64 {
        let elapsed = OffsetDateTime::now_utc() - self.created_at;
        elapsed.whole_milliseconds().max(0) as u64
    }

    /// Lowest-indexed chunk not yet received, or `None` when all are present.
    pub fn next_missing_chunk(&self) -> Option<u32> {
        (0..self.declared_total_chunks).find(|i| !self.received_chunks.contains(i))
    }
}

/// Request to create an upload session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitUploadRequest {
    /// Original filename; its extension must map to a recognized media type.
    pub filename: String,
    /// Total file size in bytes.
    pub total_size: u64,
    /// Total number of chunks the client will send.
    pub total_chunks: u32,
}

/// Response from creating an upload session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitUploadResponse {
    /// The session ID, the sole external handle for all later calls.
    pub session_id: String,
    /// Chunk size the client must use for all but the final chunk.
    pub chunk_size: u64,
}

/// Response from accepting a chunk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkAccepted {
    /// Whether the chunk was written.
    pub accepted: bool,
    /// Distinct chunk indices received so far.
    pub received_chunks: u32,
    /// Total chunks declared at init.
    pub total_chunks: u32,
    /// Byte progress percentage, clamped to [0, 100].
    pub progress: f64,
    /// Estimated time remaining in milliseconds.
    pub eta_millis: u64,
    /// Post-write session status. Reflects the post-finalize state when this
    /// chunk completed the set.
    pub status: SessionStatus,
    /// Present when finalize was triggered by this chunk and failed; the
    /// chunk itself was saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response from querying session progress.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub progress: f64,
    pub eta_millis: u64,
    pub status: SessionStatus,
}

/// Response from a resume query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResumeResponse {
    /// Chunk indices already received, ascending.
    pub received_chunks: Vec<u32>,
    /// Total chunks declared at init.
    pub total_chunks: u32,
    /// Lowest missing index, or `null` when none are missing and assembly is
    /// pending.
    pub next_chunk: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> UploadSession {
        UploadSession::new("clip.mp4".to_string(), 100, 4, 30)
    }

    #[test]
    fn test_session_id_roundtrip() {
        let id = SessionId::new();
        let parsed = SessionId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(SessionId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_status_flags() {
        assert!(SessionStatus::Uploading.is_active());
        assert!(!SessionStatus::Uploading.is_terminal());
        assert!(!SessionStatus::Finalizing.is_active());
        assert!(!SessionStatus::Finalizing.is_terminal());
        for status in [
            SessionStatus::Completed,
            SessionStatus::Failed,
            SessionStatus::Cancelled,
        ] {
            assert!(!status.is_active());
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn test_record_chunk_is_idempotent() {
        let mut session = sample_session();
        assert!(session.record_chunk(0, 30));
        assert!(!session.record_chunk(0, 30));
        assert_eq!(session.received_chunks.len(), 1);
        assert_eq!(session.bytes_received, 30);
    }

    #[test]
    fn test_completeness_from_cardinality() {
        let mut session = sample_session();
        // Out-of-order arrival, including the final remainder chunk first.
        for (index, size) in [(3u32, 10u64), (1, 30), (0, 30)] {
            session.record_chunk(index, size);
            assert!(!session.is_complete());
        }
        session.record_chunk(2, 30);
        assert!(session.is_complete());
        assert_eq!(session.bytes_received, session.declared_total_size);
    }

    #[test]
    fn test_next_missing_chunk() {
        let mut session = sample_session();
        assert_eq!(session.next_missing_chunk(), Some(0));
        session.record_chunk(0, 30);
        session.record_chunk(2, 30);
        assert_eq!(session.next_missing_chunk(), Some(1));
        session.record_chunk(1, 30);
        session.record_chunk(3, 10);
        assert_eq!(session.next_missing_chunk(), None);
    }

    #[test]
    fn test_expected_chunk_size_remainder() {
        let session = sample_session();
        assert_eq!(session.expected_chunk_size(0), 30);
        assert_eq!(session.expected_chunk_size(2), 30);
        assert_eq!(session.expected_chunk_size(3), 10);
    }
}
