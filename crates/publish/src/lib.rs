//! Outbound chunked-upload adapters for the Clipdock publish pipeline.
//!
//! Three remote platforms, three structurally different chunked-upload
//! protocols, one local capability surface: [`TransferAdapter`]. The wire
//! formats are deliberately NOT unified — each adapter speaks its platform's
//! session lifecycle, ordering rules, and completion semantics, and only the
//! local interface is shared.

pub mod adapters;
pub mod error;

pub use adapters::tiktok::TikTokAdapter;
pub use adapters::twitter::TwitterAdapter;
pub use adapters::youtube::YouTubeAdapter;
pub use error::{PublishError, PublishResult};

use async_trait::async_trait;
use bytes::Bytes;
use clipdock_core::config::PublishConfig;
use clipdock_core::progress::{eta_millis, progress_percent};
use clipdock_core::{OutboundUploadSession, Platform};

/// External source of per-user OAuth access tokens.
///
/// Token acquisition and refresh live outside this crate; adapters only
/// consume a valid bearer token. `None` means the user has no usable token
/// for the platform and the transfer must not start.
#[async_trait]
pub trait TokenProvider: Send + Sync + 'static {
    async fn get_valid_token(&self, user_id: &str, platform: Platform) -> Option<String>;
}

/// Outcome of a single chunk upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Chunk acknowledged; more chunks expected.
    Accepted,
    /// The remote signalled overall completion on this chunk (resumable-PUT
    /// protocols end this way rather than via an explicit finalize call).
    Completed,
}

/// A reference to remote media, produced when a transfer finalizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteMedia {
    pub platform: Platform,
    /// Platform-native identifier for the uploaded media.
    pub media_ref: String,
}

/// Common local interface over the per-platform chunked upload protocols.
///
/// Every call is at-most-one-attempt: a failed chunk is surfaced, never
/// silently retried, so retry policy can stay rate-limit-aware one layer up.
#[async_trait]
pub trait TransferAdapter: Send + std::fmt::Debug {
    /// Negotiate the remote session and obtain the platform handle.
    async fn initialize(&mut self) -> PublishResult<()>;

    /// Upload one chunk. `index` is zero-based and must match the byte range
    /// laid out in the session's chunk plan.
    async fn upload_chunk(&mut self, index: u32, data: Bytes) -> PublishResult<ChunkOutcome>;

    /// Complete the transfer and return the remote media reference.
    async fn finalize(&mut self) -> PublishResult<RemoteMedia>;

    /// The adapter-owned outbound session (read-only to callers).
    fn session(&self) -> &OutboundUploadSession;
}

/// Progress snapshot for an outbound session: `(percent, eta_millis)`.
pub fn outbound_progress(session: &OutboundUploadSession) -> (f64, u64) {
    let bytes = session.bytes_uploaded();
    (
        progress_percent(bytes, session.file_size),
        eta_millis(bytes, session.file_size, session.elapsed_millis()),
    )
}

/// Constructs adapters for a given user, resolving tokens through the
/// provider seam.
pub struct Publisher {
    http: reqwest::Client,
    config: PublishConfig,
    tokens: std::sync::Arc<dyn TokenProvider>,
}

impl Publisher {
    pub fn new(config: PublishConfig, tokens: std::sync::Arc<dyn TokenProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            tokens,
        }
    }

    async fn resolve_token(&self, user_id: &str, platform: Platform) -> PublishResult<String> {
        self.tokens
            .get_valid_token(user_id, platform)
            .await
            .ok_or(PublishError::MissingToken { platform })
    }

    /// Build an adapter for one outbound transfer.
    pub async fn adapter_for(
        &self,
        user_id: &str,
        platform: Platform,
        file_name: &str,
        file_size: u64,
        mime_type: &str,
    ) -> PublishResult<Box<dyn TransferAdapter>> {
        let token = self.resolve_token(user_id, platform).await?;
        Ok(match platform {
            Platform::YouTube => Box::new(YouTubeAdapter::new(
                self.http.clone(),
                &self.config,
                token,
                file_name.to_string(),
                file_size,
                mime_type.to_string(),
            )),
            Platform::Twitter => Box::new(TwitterAdapter::new(
                self.http.clone(),
                &self.config,
                token,
                file_name.to_string(),
                file_size,
                mime_type.to_string(),
            )),
            Platform::TikTok => Box::new(TikTokAdapter::new(
                self.http.clone(),
                &self.config,
                token,
                file_name.to_string(),
                file_size,
            )),
        })
    }
}
