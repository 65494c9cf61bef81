//! Platform-specific chunked upload protocol implementations.

pub mod tiktok;
pub mod twitter;
pub mod youtube;

use crate::error::{PublishError, PublishResult};
use clipdock_core::Platform;

/// Map a non-success response into a `RemoteProtocol` failure, capturing the
/// body as detail.
pub(crate) async fn remote_error(
    platform: Platform,
    response: reqwest::Response,
) -> PublishError {
    let status = response.status().as_u16();
    let detail = response.text().await.unwrap_or_default();
    PublishError::RemoteProtocol {
        platform,
        status,
        detail,
    }
}

/// Require a success status, otherwise surface the typed failure.
pub(crate) async fn require_success(
    platform: Platform,
    response: reqwest::Response,
) -> PublishResult<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(remote_error(platform, response).await)
    }
}
