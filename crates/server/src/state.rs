//! Shared application state.

use std::sync::Arc;

use clipdock_core::AppConfig;

use crate::manager::UploadManager;

/// State handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub manager: Arc<UploadManager>,
}

impl AppState {
    pub fn new(config: AppConfig, manager: Arc<UploadManager>) -> Self {
        Self {
            config: Arc::new(config),
            manager,
        }
    }
}
