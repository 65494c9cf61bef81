mod common;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use clipdock_core::{AppConfig, InitUploadRequest, SessionId, StorageConfig};
use clipdock_server::{reaper, ApiError, UploadManager};
use clipdock_storage::ChunkStore;
use common::RecordingSink;
use time::OffsetDateTime;

async fn manager_with_store(
    config: &AppConfig,
    root: &std::path::Path,
) -> (Arc<UploadManager>, Arc<dyn ChunkStore>) {
    let store = clipdock_storage::from_config(&StorageConfig::Filesystem {
        path: root.to_path_buf(),
    })
    .await
    .unwrap();
    let manager = Arc::new(UploadManager::new(
        config.server.clone(),
        store.clone(),
        Arc::new(RecordingSink::new()),
    ));
    (manager, store)
}

fn init_request() -> InitUploadRequest {
    InitUploadRequest {
        filename: "clip.mp4".to_string(),
        total_size: 2048,
        total_chunks: 2,
    }
}

#[tokio::test]
async fn stale_sessions_are_reaped_and_fresh_ones_spared() {
    let root = tempfile::tempdir().unwrap();
    let config = AppConfig::for_testing();
    let (manager, store) = manager_with_store(&config, root.path()).await;

    let stale = manager.init_upload(init_request()).await.unwrap();
    manager
        .accept_chunk(&stale.session_id, 0, Bytes::from(vec![1u8; 1024]))
        .await
        .unwrap();

    // Idle shorter than the cutoff: nothing to do.
    let soon = OffsetDateTime::now_utc() + config.server.stale_after() / 2;
    assert_eq!(manager.reap_stale(soon).await, 0);
    assert_eq!(manager.active_sessions().await, 1);

    // Idle past the cutoff: reaped, storage deleted, later calls see 404.
    let later = OffsetDateTime::now_utc() + config.server.stale_after() + Duration::from_secs(1);
    assert_eq!(manager.reap_stale(later).await, 1);
    assert_eq!(manager.active_sessions().await, 0);

    let session = SessionId::parse(&stale.session_id).unwrap();
    assert!(store.list_chunks(session).await.unwrap().is_empty());
    assert!(matches!(
        manager.progress(&stale.session_id).await,
        Err(ApiError::Core(clipdock_core::Error::SessionNotFound(_)))
    ));

    // A second sweep finds nothing.
    assert_eq!(manager.reap_stale(later).await, 0);
}

#[tokio::test]
async fn recent_activity_defers_the_reaper() {
    let root = tempfile::tempdir().unwrap();
    let config = AppConfig::for_testing();
    let (manager, _store) = manager_with_store(&config, root.path()).await;

    let upload = manager.init_upload(init_request()).await.unwrap();

    // Sweep exactly at the creation-time cutoff boundary: a resume query has
    // refreshed liveness, so the session survives.
    manager.resume_upload(&upload.session_id).await.unwrap();
    let at_cutoff = OffsetDateTime::now_utc() + config.server.stale_after();
    // The resume touch pushed last_activity to "now", which is inside the
    // window for a sweep at now + stale_after only if strictly newer than
    // the cutoff; a fresh touch always is.
    assert_eq!(manager.reap_stale(at_cutoff - Duration::from_secs(1)).await, 0);
    assert_eq!(manager.active_sessions().await, 1);
}

#[tokio::test]
async fn sweep_only_considers_active_sessions() {
    let root = tempfile::tempdir().unwrap();
    let config = AppConfig::for_testing();
    let (manager, _store) = manager_with_store(&config, root.path()).await;

    // Completed uploads leave the table on finalize; cancelled ones leave it
    // on cancel. Either way the reaper has nothing to visit.
    let upload = manager.init_upload(init_request()).await.unwrap();
    manager.cancel_upload(&upload.session_id).await.unwrap();

    let far_future = OffsetDateTime::now_utc() + Duration::from_secs(7200);
    assert_eq!(manager.reap_stale(far_future).await, 0);
}

// End-to-end with the spawned task: a second-scale staleness window and
// sweep interval let the background reaper fire within the test.
#[tokio::test]
async fn background_task_sweeps_periodically() {
    let root = tempfile::tempdir().unwrap();
    let mut config = AppConfig::for_testing();
    config.server.stale_after_secs = 1;
    config.server.reap_interval_secs = 1;
    let (manager, _store) = manager_with_store(&config, root.path()).await;

    manager.init_upload(init_request()).await.unwrap();
    assert_eq!(manager.active_sessions().await, 1);

    let handle = reaper::spawn(manager.clone());
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(manager.active_sessions().await, 0);
    handle.abort();
}
