//! Background task that sweeps stale sessions.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::manager::UploadManager;

/// Spawn the periodic reaper. The returned handle can be aborted at
/// shutdown; each sweep calls [`UploadManager::reap_stale`] with the current
/// time.
pub fn spawn(manager: Arc<UploadManager>) -> JoinHandle<()> {
    let interval = manager.config().reap_interval();
    info!(
        interval_secs = interval.as_secs(),
        stale_after_secs = manager.config().stale_after_secs,
        "starting session reaper"
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a fresh server does
        // not sweep before any session can exist.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let reaped = manager.reap_stale(OffsetDateTime::now_utc()).await;
            if reaped > 0 {
                info!(reaped, "reaper sweep removed stale sessions");
            } else {
                debug!("reaper sweep found no stale sessions");
            }
        }
    })
}
