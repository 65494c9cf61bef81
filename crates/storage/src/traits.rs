//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use clipdock_core::SessionId;

/// Durable holding area for the chunks of in-flight upload sessions.
///
/// Chunks are addressed by `(session_id, chunk_index)`, so distinct sessions
/// never share storage keys. Writing the same index twice overwrites; the
/// store never double-counts.
#[async_trait]
pub trait ChunkStore: Send + Sync + 'static {
    /// Write a chunk payload. Overwrites any previous payload at this index.
    async fn put_chunk(&self, session: SessionId, index: u32, data: Bytes) -> StorageResult<()>;

    /// Read a chunk payload back.
    async fn get_chunk(&self, session: SessionId, index: u32) -> StorageResult<Bytes>;

    /// Check whether a chunk exists.
    async fn chunk_exists(&self, session: SessionId, index: u32) -> StorageResult<bool>;

    /// List chunk indices currently stored for a session, ascending.
    async fn list_chunks(&self, session: SessionId) -> StorageResult<Vec<u32>>;

    /// Delete every chunk artifact belonging to a session. Deleting a session
    /// that has no chunks is a no-op success.
    async fn delete_session(&self, session: SessionId) -> StorageResult<()>;

    /// Start a streaming write of the assembled output file for a session.
    async fn put_assembled(
        &self,
        session: SessionId,
        filename: &str,
    ) -> StorageResult<Box<dyn AssembledUpload>>;

    /// Get the name of this storage backend, for metrics and logging.
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is reachable and properly configured. Called at
    /// server startup before accepting requests.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Handle for a streaming assembled-file write.
#[async_trait]
pub trait AssembledUpload: Send {
    /// Append a chunk of data.
    async fn write(&mut self, data: Bytes) -> StorageResult<()>;

    /// Finish the write atomically and return the final object.
    async fn finish(self: Box<Self>) -> StorageResult<AssembledObject>;

    /// Abandon the write. The partial output is left in place for
    /// diagnostics; only the atomic rename is skipped.
    async fn abort(self: Box<Self>) -> StorageResult<()>;
}

/// A fully written assembled file.
#[derive(Clone, Debug)]
pub struct AssembledObject {
    /// Absolute path (or backend-native locator) of the assembled file.
    pub path: String,
    /// Total bytes written.
    pub size: u64,
}
