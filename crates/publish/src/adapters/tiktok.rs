//! TikTok chunked upload (multipart with remote-issued upload id).
//!
//! Session lifecycle: INIT declares total size, desired chunk size, and chunk
//! count; the remote answers with an upload URL, an opaque upload id, and the
//! chunk size it actually negotiated. Each chunk POST carries the upload id
//! and index to the upload URL. Completion is implicit server-side once the
//! declared chunk count has landed — there is no finalize call on the wire.

use crate::adapters::require_success;
use crate::error::{PublishError, PublishResult};
use crate::{ChunkOutcome, RemoteMedia, TransferAdapter};
use async_trait::async_trait;
use bytes::Bytes;
use clipdock_core::config::PublishConfig;
use clipdock_core::{OutboundStatus, OutboundUploadSession, Platform, RemoteHandle};
use serde::Deserialize;
use serde_json::json;

const DEFAULT_API_BASE: &str = "https://open.tiktokapis.com";

/// Chunk size requested at INIT; the remote may negotiate a different one.
const REQUESTED_CHUNK_SIZE: u64 = 10_000_000;

#[derive(Debug, Deserialize)]
struct InitData {
    upload_url: String,
    upload_id: String,
    chunk_size: u64,
}

#[derive(Debug, Deserialize)]
struct InitResponse {
    data: InitData,
}

/// Adapter for the generic multipart-with-upload-id protocol.
#[derive(Debug)]
pub struct TikTokAdapter {
    http: reqwest::Client,
    api_base: String,
    token: String,
    session: OutboundUploadSession,
}

impl TikTokAdapter {
    pub fn new(
        http: reqwest::Client,
        config: &PublishConfig,
        token: String,
        file_name: String,
        file_size: u64,
    ) -> Self {
        let api_base = config
            .tiktok_api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let session = OutboundUploadSession::new(
            Platform::TikTok,
            file_name,
            file_size,
            REQUESTED_CHUNK_SIZE,
        );
        Self {
            http,
            api_base,
            token,
            session,
        }
    }

    fn handle(&self) -> PublishResult<(&str, &str)> {
        match &self.session.remote_handle {
            Some(RemoteHandle::UploadUrlWithId { url, upload_id }) => Ok((url, upload_id)),
            _ => Err(PublishError::InvalidState(
                "upload_chunk called before initialize".to_string(),
            )),
        }
    }
}

#[async_trait]
impl TransferAdapter for TikTokAdapter {
    #[tracing::instrument(skip(self), fields(platform = "tiktok", session = %self.session.id))]
    async fn initialize(&mut self) -> PublishResult<()> {
        let url = format!("{}/v2/post/publish/inbox/video/init/", self.api_base);
        let body = json!({
            "source_info": {
                "source": "FILE_UPLOAD",
                "video_size": self.session.file_size,
                "chunk_size": REQUESTED_CHUNK_SIZE,
                "total_chunk_count": self.session.chunks.len(),
            }
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let response = require_success(Platform::TikTok, response).await?;

        let init: InitResponse = response.json().await?;
        // The chunk size is remote-negotiated; re-plan the transfer when the
        // remote picked something other than what we asked for.
        if init.data.chunk_size != REQUESTED_CHUNK_SIZE {
            let replanned = OutboundUploadSession::new(
                Platform::TikTok,
                self.session.file_name.clone(),
                self.session.file_size,
                init.data.chunk_size,
            );
            self.session.chunks = replanned.chunks;
        }
        tracing::debug!(
            session = %self.session.id,
            upload_id = %init.data.upload_id,
            chunk_size = init.data.chunk_size,
            chunks = self.session.chunks.len(),
            "Upload session negotiated"
        );
        self.session.remote_handle = Some(RemoteHandle::UploadUrlWithId {
            url: init.data.upload_url,
            upload_id: init.data.upload_id,
        });
        self.session.status = OutboundStatus::Uploading;
        Ok(())
    }

    #[tracing::instrument(skip(self, data), fields(platform = "tiktok", session = %self.session.id, chunk = index, size = data.len()))]
    async fn upload_chunk(&mut self, index: u32, data: Bytes) -> PublishResult<ChunkOutcome> {
        let (url, upload_id) = self.handle()?;
        let url = url.to_string();
        let upload_id = upload_id.to_string();

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("upload_id", upload_id.as_str()),
                ("chunk_index", &index.to_string()),
            ])
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            self.session.status = OutboundStatus::Failed;
            return Err(crate::adapters::remote_error(Platform::TikTok, response).await);
        }

        if let Some(chunk) = self.session.chunks.get_mut(index as usize) {
            chunk.uploaded = true;
        }
        if self.session.all_chunks_uploaded() {
            // The remote assembles on its own once the declared count lands.
            self.session.status = OutboundStatus::Completed;
        }
        Ok(ChunkOutcome::Accepted)
    }

    async fn finalize(&mut self) -> PublishResult<RemoteMedia> {
        // No wire call: assembly is implicit server-side. Finalize only
        // checks local completeness and hands back the upload id.
        if !self.session.all_chunks_uploaded() {
            return Err(PublishError::InvalidState(format!(
                "transfer incomplete: next pending chunk {:?}",
                self.session.next_pending_chunk()
            )));
        }
        let (_, upload_id) = self.handle()?;
        Ok(RemoteMedia {
            platform: Platform::TikTok,
            media_ref: upload_id.to_string(),
        })
    }

    fn session(&self) -> &OutboundUploadSession {
        &self.session
    }
}
