//! Chunk storage backends for the Clipdock upload service.
//!
//! Inbound chunk payloads and assembled output files live behind the
//! [`ChunkStore`] trait so the session manager and assembler never touch a
//! concrete backend directly.

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::filesystem::FilesystemChunkStore;
pub use error::{StorageError, StorageResult};
pub use traits::{AssembledObject, AssembledUpload, ChunkStore};

use clipdock_core::config::StorageConfig;
use std::sync::Arc;

/// Build a chunk store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ChunkStore>> {
    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemChunkStore::new(path).await?;
            Ok(Arc::new(backend))
        }
    }
}
