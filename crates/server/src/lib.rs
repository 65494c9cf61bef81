//! Clipdock upload server: resumable chunked ingest over HTTP.

pub mod assembler;
pub mod error;
pub mod handlers;
pub mod manager;
pub mod metrics;
pub mod reaper;
pub mod routes;
pub mod sessions;
pub mod sink;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use manager::UploadManager;
pub use routes::create_router;
pub use state::AppState;
