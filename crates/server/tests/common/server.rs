use std::sync::Arc;

use clipdock_core::{AppConfig, StorageConfig};
use clipdock_server::{create_router, AppState, UploadManager};
use clipdock_storage::ChunkStore;
use serde_json::json;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use super::RecordingSink;

/// A running server instance bound to an ephemeral port, with its own
/// temporary storage root and recording sink.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub manager: Arc<UploadManager>,
    pub sink: Arc<RecordingSink>,
    pub store: Arc<dyn ChunkStore>,
    pub storage_root: TempDir,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with_chunk_size(1024).await
    }

    pub async fn start_with_chunk_size(chunk_size: u64) -> Self {
        let storage_root = TempDir::new().expect("create temp storage root");

        let mut config = AppConfig::for_testing();
        config.server.chunk_size = chunk_size;
        config.server.max_file_size = 64 * 1024 * 1024;
        config.storage = StorageConfig::Filesystem {
            path: storage_root.path().to_path_buf(),
        };

        let store = clipdock_storage::from_config(&config.storage)
            .await
            .expect("create storage backend");
        let sink = Arc::new(RecordingSink::new());
        let manager = Arc::new(UploadManager::new(
            config.server.clone(),
            store.clone(),
            sink.clone(),
        ));

        let state = AppState::new(config, manager.clone());
        let router = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("test server");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            manager,
            sink,
            store,
            storage_root,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Init a session and return its id.
    pub async fn init_session(
        &self,
        filename: &str,
        total_size: u64,
        total_chunks: u32,
    ) -> String {
        let response = self
            .client
            .post(self.url("/v1/uploads"))
            .json(&json!({
                "filename": filename,
                "total_size": total_size,
                "total_chunks": total_chunks,
            }))
            .send()
            .await
            .expect("init request");
        assert_eq!(response.status(), 201, "init should succeed");
        let body: serde_json::Value = response.json().await.expect("init body");
        body["session_id"].as_str().expect("session_id").to_string()
    }

    /// Send one chunk and return the raw response.
    pub async fn send_chunk(
        &self,
        session_id: &str,
        index: u32,
        payload: Vec<u8>,
    ) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/v1/uploads/{session_id}/chunks/{index}")))
            .body(payload)
            .send()
            .await
            .expect("chunk request")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
