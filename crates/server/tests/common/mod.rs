#![allow(dead_code)]

pub mod server;

use std::sync::Mutex;

use async_trait::async_trait;
use clipdock_server::sink::{NewUploadRecord, SinkError, UploadRecord, UploadSink};
use time::OffsetDateTime;

/// Sink that records every registered upload in memory.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<UploadRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<UploadRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadSink for RecordingSink {
    async fn create_upload_record(
        &self,
        record: NewUploadRecord,
    ) -> Result<UploadRecord, SinkError> {
        let record = UploadRecord {
            id: uuid::Uuid::new_v4().to_string(),
            upload: record,
            created_at: OffsetDateTime::now_utc(),
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }
}

/// Sink that stalls before recording, to hold a finalize in flight while a
/// concurrent call races it.
pub struct SlowSink {
    inner: RecordingSink,
    delay: std::time::Duration,
}

impl SlowSink {
    pub fn new(delay: std::time::Duration) -> Self {
        Self {
            inner: RecordingSink::new(),
            delay,
        }
    }

    pub fn records(&self) -> Vec<UploadRecord> {
        self.inner.records()
    }
}

#[async_trait]
impl UploadSink for SlowSink {
    async fn create_upload_record(
        &self,
        record: NewUploadRecord,
    ) -> Result<UploadRecord, SinkError> {
        tokio::time::sleep(self.delay).await;
        self.inner.create_upload_record(record).await
    }
}

/// Sink that rejects every registration, for failure-path tests.
pub struct FailingSink;

#[async_trait]
impl UploadSink for FailingSink {
    async fn create_upload_record(
        &self,
        _record: NewUploadRecord,
    ) -> Result<UploadRecord, SinkError> {
        Err(SinkError("record store unavailable".to_string()))
    }
}

/// Deterministic chunk payload: `index` repeated as a byte pattern.
pub fn chunk_payload(index: u32, size: usize) -> Vec<u8> {
    vec![(index % 251) as u8 + 1; size]
}
