//! Twitter chunked media upload (INIT / APPEND / FINALIZE).
//!
//! Session lifecycle: INIT declares total size and media category and returns
//! an opaque media id scoping every later call. APPEND carries the media id,
//! a zero-based segment index, and the raw bytes; the remote rejects gaps, so
//! segments must be issued in order. FINALIZE is an explicit, payload-free
//! call that triggers server-side reassembly and returns the ready media id.

use crate::adapters::require_success;
use crate::error::{PublishError, PublishResult};
use crate::{ChunkOutcome, RemoteMedia, TransferAdapter};
use async_trait::async_trait;
use bytes::Bytes;
use clipdock_core::config::PublishConfig;
use clipdock_core::{OutboundStatus, OutboundUploadSession, Platform, RemoteHandle};
use serde::Deserialize;

const DEFAULT_API_BASE: &str = "https://upload.twitter.com";

#[derive(Debug, Deserialize)]
struct MediaResponse {
    media_id_string: String,
}

/// Adapter for the INIT/APPEND/FINALIZE protocol.
#[derive(Debug)]
pub struct TwitterAdapter {
    http: reqwest::Client,
    api_base: String,
    token: String,
    media_category: String,
    mime_type: String,
    session: OutboundUploadSession,
}

impl TwitterAdapter {
    pub fn new(
        http: reqwest::Client,
        config: &PublishConfig,
        token: String,
        file_name: String,
        file_size: u64,
        mime_type: String,
    ) -> Self {
        let api_base = config
            .twitter_api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let media_category = if mime_type.starts_with("video/") {
            "tweet_video"
        } else {
            "tweet_image"
        }
        .to_string();
        let session = OutboundUploadSession::new(
            Platform::Twitter,
            file_name,
            file_size,
            config.twitter_chunk_size,
        );
        Self {
            http,
            api_base,
            token,
            media_category,
            mime_type,
            session,
        }
    }

    fn media_id(&self) -> PublishResult<&str> {
        match &self.session.remote_handle {
            Some(RemoteHandle::MediaId(id)) => Ok(id),
            _ => Err(PublishError::InvalidState(
                "APPEND before INIT".to_string(),
            )),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/1.1/media/upload.json", self.api_base)
    }
}

#[async_trait]
impl TransferAdapter for TwitterAdapter {
    #[tracing::instrument(skip(self), fields(platform = "twitter", session = %self.session.id))]
    async fn initialize(&mut self) -> PublishResult<()> {
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.token)
            .form(&[
                ("command", "INIT"),
                ("total_bytes", &self.session.file_size.to_string()),
                ("media_type", &self.mime_type),
                ("media_category", &self.media_category),
            ])
            .send()
            .await?;
        let response = require_success(Platform::Twitter, response).await?;

        let media: MediaResponse = response.json().await?;
        tracing::debug!(
            session = %self.session.id,
            media_id = %media.media_id_string,
            "INIT accepted"
        );
        self.session.remote_handle = Some(RemoteHandle::MediaId(media.media_id_string));
        self.session.status = OutboundStatus::Uploading;
        Ok(())
    }

    #[tracing::instrument(skip(self, data), fields(platform = "twitter", session = %self.session.id, segment = index, size = data.len()))]
    async fn upload_chunk(&mut self, index: u32, data: Bytes) -> PublishResult<ChunkOutcome> {
        let media_id = self.media_id()?.to_string();

        // Segment indices are sent exactly as given. The remote enforces
        // ordering; an out-of-order APPEND comes back as a protocol error
        // rather than being reordered here.
        let form = reqwest::multipart::Form::new()
            .text("command", "APPEND")
            .text("media_id", media_id)
            .text("segment_index", index.to_string())
            .part(
                "media",
                reqwest::multipart::Part::bytes(data.to_vec())
                    .file_name(self.session.file_name.clone()),
            );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            self.session.status = OutboundStatus::Failed;
            return Err(crate::adapters::remote_error(Platform::Twitter, response).await);
        }

        if let Some(chunk) = self.session.chunks.get_mut(index as usize) {
            chunk.uploaded = true;
        }
        Ok(ChunkOutcome::Accepted)
    }

    #[tracing::instrument(skip(self), fields(platform = "twitter", session = %self.session.id))]
    async fn finalize(&mut self) -> PublishResult<RemoteMedia> {
        let media_id = self.media_id()?.to_string();

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.token)
            .form(&[("command", "FINALIZE"), ("media_id", &media_id)])
            .send()
            .await?;
        let response = match require_success(Platform::Twitter, response).await {
            Ok(response) => response,
            Err(e) => {
                self.session.status = OutboundStatus::Failed;
                return Err(e);
            }
        };

        let media: MediaResponse = response.json().await?;
        self.session.status = OutboundStatus::Completed;
        Ok(RemoteMedia {
            platform: Platform::Twitter,
            media_ref: media.media_id_string,
        })
    }

    fn session(&self) -> &OutboundUploadSession {
        &self.session
    }
}
