//! Local filesystem chunk store.

use crate::error::{StorageError, StorageResult};
use crate::traits::{AssembledObject, AssembledUpload, ChunkStore};
use async_trait::async_trait;
use bytes::Bytes;
use clipdock_core::SessionId;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Local filesystem chunk store.
///
/// Layout under the root:
/// - `sessions/{session_id}/{index:06}` — chunk payloads
/// - `assembled/{session_id}/{filename}` — finalized output files
pub struct FilesystemChunkStore {
    root: PathBuf,
}

impl FilesystemChunkStore {
    /// Create a new filesystem store rooted at `root`.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn session_dir(&self, session: SessionId) -> PathBuf {
        self.root.join("sessions").join(session.to_string())
    }

    fn chunk_path(&self, session: SessionId, index: u32) -> PathBuf {
        self.session_dir(session).join(format!("{index:06}"))
    }

    /// Validate a filename for use as the final path component of an
    /// assembled object. Session ids are uuids, so filenames are the only
    /// externally influenced component.
    fn assembled_path(&self, session: SessionId, filename: &str) -> StorageResult<PathBuf> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return Err(StorageError::InvalidKey(format!(
                "unsafe filename: {filename:?}"
            )));
        }
        Ok(self
            .root
            .join("assembled")
            .join(session.to_string())
            .join(filename))
    }

    async fn ensure_parent(path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ChunkStore for FilesystemChunkStore {
    #[instrument(skip(self, data), fields(backend = "filesystem", session = %session, size = data.len()))]
    async fn put_chunk(&self, session: SessionId, index: u32, data: Bytes) -> StorageResult<()> {
        let path = self.chunk_path(session, index);
        Self::ensure_parent(&path).await?;

        // Write to a uniquely named temp file, fsync, then rename. The rename
        // makes rewrites of the same index atomic overwrites.
        let temp_path = path.with_extension(format!("tmp.{}", Uuid::new_v4()));
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem", session = %session))]
    async fn get_chunk(&self, session: SessionId, index: u32) -> StorageResult<Bytes> {
        let path = self.chunk_path(session, index);
        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(format!("{session}/{index}"))
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self), fields(backend = "filesystem", session = %session))]
    async fn chunk_exists(&self, session: SessionId, index: u32) -> StorageResult<bool> {
        let path = self.chunk_path(session, index);
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem", session = %session))]
    async fn list_chunks(&self, session: SessionId) -> StorageResult<Vec<u32>> {
        let dir = self.session_dir(session);
        let mut indices = Vec::new();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(indices),
            Err(e) => return Err(StorageError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            // Skip in-flight temp files from concurrent writes.
            if let Some(index) = name.to_str().and_then(|n| n.parse::<u32>().ok()) {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    #[instrument(skip(self), fields(backend = "filesystem", session = %session))]
    async fn delete_session(&self, session: SessionId) -> StorageResult<()> {
        let dir = self.session_dir(session);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem", session = %session))]
    async fn put_assembled(
        &self,
        session: SessionId,
        filename: &str,
    ) -> StorageResult<Box<dyn AssembledUpload>> {
        let path = self.assembled_path(session, filename)?;
        Self::ensure_parent(&path).await?;

        let temp_path = path.with_extension(format!("partial.{}", Uuid::new_v4()));
        let file = fs::File::create(&temp_path).await?;

        Ok(Box::new(FilesystemAssembledUpload {
            file,
            temp_path,
            final_path: path,
            bytes_written: 0,
        }))
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Io(std::io::Error::other(format!(
                "storage root is not a directory: {:?}",
                self.root
            ))));
        }

        Ok(())
    }
}

/// Streaming assembled-file write for the filesystem backend.
struct FilesystemAssembledUpload {
    file: fs::File,
    temp_path: PathBuf,
    final_path: PathBuf,
    bytes_written: u64,
}

#[async_trait]
impl AssembledUpload for FilesystemAssembledUpload {
    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        self.file.write_all(&data).await?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> StorageResult<AssembledObject> {
        self.file.sync_all().await?;
        drop(self.file);
        fs::rename(&self.temp_path, &self.final_path).await?;
        Ok(AssembledObject {
            path: self.final_path.to_string_lossy().to_string(),
            size: self.bytes_written,
        })
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        // The partial temp file is retained on purpose so a failed assembly
        // leaves evidence behind.
        drop(self.file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemChunkStore::new(dir.path()).await.unwrap();
        let session = SessionId::new();

        store
            .put_chunk(session, 0, Bytes::from("hello world"))
            .await
            .unwrap();
        assert!(store.chunk_exists(session, 0).await.unwrap());
        assert!(!store.chunk_exists(session, 1).await.unwrap());

        let data = store.get_chunk(session, 0).await.unwrap();
        assert_eq!(data, Bytes::from("hello world"));
    }

    #[tokio::test]
    async fn test_rewrite_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemChunkStore::new(dir.path()).await.unwrap();
        let session = SessionId::new();

        store
            .put_chunk(session, 2, Bytes::from("first"))
            .await
            .unwrap();
        store
            .put_chunk(session, 2, Bytes::from("second"))
            .await
            .unwrap();

        assert_eq!(
            store.get_chunk(session, 2).await.unwrap(),
            Bytes::from("second")
        );
        assert_eq!(store.list_chunks(session).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_list_chunks_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemChunkStore::new(dir.path()).await.unwrap();
        let session = SessionId::new();

        for index in [5u32, 0, 3] {
            store
                .put_chunk(session, index, Bytes::from("x"))
                .await
                .unwrap();
        }
        assert_eq!(store.list_chunks(session).await.unwrap(), vec![0, 3, 5]);
    }

    #[tokio::test]
    async fn test_delete_session_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemChunkStore::new(dir.path()).await.unwrap();
        let session = SessionId::new();

        store
            .put_chunk(session, 0, Bytes::from("x"))
            .await
            .unwrap();
        store.delete_session(session).await.unwrap();
        assert!(store.list_chunks(session).await.unwrap().is_empty());

        // Second delete and deleting an unknown session are both no-ops.
        store.delete_session(session).await.unwrap();
        store.delete_session(SessionId::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemChunkStore::new(dir.path()).await.unwrap();
        let a = SessionId::new();
        let b = SessionId::new();

        store.put_chunk(a, 0, Bytes::from("aaa")).await.unwrap();
        store.put_chunk(b, 0, Bytes::from("bbb")).await.unwrap();

        store.delete_session(a).await.unwrap();
        assert_eq!(store.get_chunk(b, 0).await.unwrap(), Bytes::from("bbb"));
        assert!(matches!(
            store.get_chunk(a, 0).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_assembled_upload_finish() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemChunkStore::new(dir.path()).await.unwrap();
        let session = SessionId::new();

        let mut upload = store.put_assembled(session, "clip.mp4").await.unwrap();
        upload.write(Bytes::from("hello ")).await.unwrap();
        upload.write(Bytes::from("world")).await.unwrap();
        let object = upload.finish().await.unwrap();

        assert_eq!(object.size, 11);
        let written = std::fs::read(&object.path).unwrap();
        assert_eq!(written, b"hello world");
    }

    #[tokio::test]
    async fn test_assembled_upload_abort_keeps_partial() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemChunkStore::new(dir.path()).await.unwrap();
        let session = SessionId::new();

        let mut upload = store.put_assembled(session, "clip.mp4").await.unwrap();
        upload.write(Bytes::from("partial")).await.unwrap();
        upload.abort().await.unwrap();

        // Final path never materialized, but the partial temp file survives.
        let session_dir = dir
            .path()
            .join("assembled")
            .join(session.to_string());
        let entries: Vec<_> = std::fs::read_dir(&session_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].contains("partial"));
        assert!(!session_dir.join("clip.mp4").exists());
    }

    #[tokio::test]
    async fn test_unsafe_filename_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemChunkStore::new(dir.path()).await.unwrap();
        let session = SessionId::new();

        for name in ["../escape.mp4", "a/b.mp4", "", "..", "a\\b.mp4"] {
            assert!(
                store.put_assembled(session, name).await.is_err(),
                "should reject {name:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemChunkStore::new(dir.path()).await.unwrap();
        store.health_check().await.unwrap();
    }
}
