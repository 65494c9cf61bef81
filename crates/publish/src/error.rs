//! Publish error types.

use clipdock_core::Platform;
use thiserror::Error;

/// Errors from outbound transfer adapters.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The token provider had no valid token for this user/platform pair.
    /// A hard precondition failure; never retried here.
    #[error("no valid access token for {platform}")]
    MissingToken { platform: Platform },

    /// The remote API answered with a non-success status. Carries enough
    /// context for the scheduling layer to make its own retry decision.
    #[error("{platform} API error ({status}): {detail}")]
    RemoteProtocol {
        platform: Platform,
        status: u16,
        detail: String,
    },

    /// Transport-level failure before any remote status was produced.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The adapter was driven out of its protocol sequence locally
    /// (e.g. uploading before initialize, finalizing an incomplete transfer).
    #[error("invalid adapter state: {0}")]
    InvalidState(String),
}

/// Result type for publish operations.
pub type PublishResult<T> = std::result::Result<T, PublishError>;
