//! YouTube resumable-upload protocol (sequential PUT with Content-Range).
//!
//! Session lifecycle: a metadata POST negotiates a single-use signed session
//! URL sized up front to the exact byte count and content type. Each chunk is
//! a PUT against that URL carrying an absolute `Content-Range`; the remote
//! answers 308 for "chunk accepted, continue" and 2xx with the video resource
//! once the final range lands. There is no separate finalize call — completion
//! is signalled by the per-chunk response code.

use crate::adapters::require_success;
use crate::error::{PublishError, PublishResult};
use crate::{ChunkOutcome, RemoteMedia, TransferAdapter};
use async_trait::async_trait;
use bytes::Bytes;
use clipdock_core::chunks::chunk_offset;
use clipdock_core::config::PublishConfig;
use clipdock_core::{OutboundStatus, OutboundUploadSession, Platform, RemoteHandle};
use serde::Deserialize;
use serde_json::json;

const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

/// HTTP 308, used by this protocol as "resume incomplete".
const RESUME_INCOMPLETE: u16 = 308;

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
}

/// Adapter for the resumable-PUT protocol.
#[derive(Debug)]
pub struct YouTubeAdapter {
    http: reqwest::Client,
    api_base: String,
    token: String,
    mime_type: String,
    session: OutboundUploadSession,
    /// Video id captured from the terminal 2xx chunk response.
    video_id: Option<String>,
}

impl YouTubeAdapter {
    pub fn new(
        http: reqwest::Client,
        config: &PublishConfig,
        token: String,
        file_name: String,
        file_size: u64,
        mime_type: String,
    ) -> Self {
        let api_base = config
            .youtube_api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let session = OutboundUploadSession::new(
            Platform::YouTube,
            file_name,
            file_size,
            config.youtube_chunk_size,
        );
        Self {
            http,
            api_base,
            token,
            mime_type,
            session,
            video_id: None,
        }
    }

    fn upload_url(&self) -> PublishResult<&str> {
        match &self.session.remote_handle {
            Some(RemoteHandle::UploadUrl(url)) => Ok(url),
            _ => Err(PublishError::InvalidState(
                "upload_chunk called before initialize".to_string(),
            )),
        }
    }
}

#[async_trait]
impl TransferAdapter for YouTubeAdapter {
    #[tracing::instrument(skip(self), fields(platform = "youtube", session = %self.session.id))]
    async fn initialize(&mut self) -> PublishResult<()> {
        let url = format!(
            "{}/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status",
            self.api_base
        );
        let metadata = json!({
            "snippet": { "title": self.session.file_name },
            "status": { "privacyStatus": "private" },
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header("X-Upload-Content-Length", self.session.file_size)
            .header("X-Upload-Content-Type", &self.mime_type)
            .json(&metadata)
            .send()
            .await?;
        let response = require_success(Platform::YouTube, response).await?;

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| PublishError::RemoteProtocol {
                platform: Platform::YouTube,
                status: response.status().as_u16(),
                detail: "resumable init response missing Location header".to_string(),
            })?;

        self.session.remote_handle = Some(RemoteHandle::UploadUrl(location));
        self.session.status = OutboundStatus::Uploading;
        tracing::debug!(session = %self.session.id, "Resumable upload session negotiated");
        Ok(())
    }

    #[tracing::instrument(skip(self, data), fields(platform = "youtube", session = %self.session.id, size = data.len()))]
    async fn upload_chunk(&mut self, index: u32, data: Bytes) -> PublishResult<ChunkOutcome> {
        // An inclusive Content-Range cannot describe zero bytes.
        if data.is_empty() {
            return Err(PublishError::InvalidState(format!(
                "chunk {index} is empty"
            )));
        }
        let total = self.session.file_size;
        let chunk_size = self
            .session
            .chunks
            .first()
            .map(|c| c.size)
            .unwrap_or_default();
        let start = chunk_offset(chunk_size, index);
        let end = start + data.len() as u64 - 1;
        let content_range = format!("bytes {start}-{end}/{total}");
        let url = self.upload_url()?.to_string();

        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_RANGE, content_range)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == RESUME_INCOMPLETE {
            // Partial success: this range is stored, keep going.
            if let Some(chunk) = self.session.chunks.get_mut(index as usize) {
                chunk.uploaded = true;
            }
            return Ok(ChunkOutcome::Accepted);
        }
        if status.is_success() {
            // Terminal response: the whole upload is complete, possibly
            // before every locally planned chunk was sent.
            if let Some(chunk) = self.session.chunks.get_mut(index as usize) {
                chunk.uploaded = true;
            }
            let video: VideoResource = response.json().await?;
            self.video_id = Some(video.id);
            self.session.status = OutboundStatus::Completed;
            return Ok(ChunkOutcome::Completed);
        }

        self.session.status = OutboundStatus::Failed;
        Err(crate::adapters::remote_error(Platform::YouTube, response).await)
    }

    async fn finalize(&mut self) -> PublishResult<RemoteMedia> {
        // Completion is implicit in this protocol; finalize only reports it.
        match (&self.session.status, &self.video_id) {
            (OutboundStatus::Completed, Some(id)) => Ok(RemoteMedia {
                platform: Platform::YouTube,
                media_ref: id.clone(),
            }),
            _ => Err(PublishError::InvalidState(
                "resumable upload not yet completed by the remote".to_string(),
            )),
        }
    }

    fn session(&self) -> &OutboundUploadSession {
        &self.session
    }
}
