//! Persistence sink for completed uploads.
//!
//! Assembly hands finished files to an [`UploadSink`], which records them in
//! whatever store the deployment uses. The bundled [`JsonlSink`] appends
//! records to a newline-delimited JSON file next to the assembled output.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
#[error("upload sink error: {0}")]
pub struct SinkError(pub String);

/// Record handed to the sink when assembly completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUploadRecord {
    /// Owner of the upload, when the fronting auth layer supplies one.
    pub user_id: Option<String>,
    pub filename: String,
    pub path: String,
    pub size: u64,
    pub mime_type: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: String,
    #[serde(flatten)]
    pub upload: NewUploadRecord,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait UploadSink: Send + Sync + 'static {
    async fn create_upload_record(
        &self,
        record: NewUploadRecord,
    ) -> Result<UploadRecord, SinkError>;
}

/// Appends one JSON record per line to a ledger file.
pub struct JsonlSink {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }
}

#[async_trait]
impl UploadSink for JsonlSink {
    async fn create_upload_record(
        &self,
        record: NewUploadRecord,
    ) -> Result<UploadRecord, SinkError> {
        let record = UploadRecord {
            id: uuid::Uuid::new_v4().to_string(),
            upload: record,
            created_at: OffsetDateTime::now_utc(),
        };
        let mut line =
            serde_json::to_vec(&record).map_err(|e| SinkError(e.to_string()))?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SinkError(e.to_string()))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| SinkError(e.to_string()))?;
        file.write_all(&line)
            .await
            .map_err(|e| SinkError(e.to_string()))?;
        file.flush().await.map_err(|e| SinkError(e.to_string()))?;
        Ok(record)
    }
}
