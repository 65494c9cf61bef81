//! Router construction.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, uploads};
use crate::state::AppState;

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    // Chunk bodies are at most one chunk; leave headroom for the final
    // remainder being policed at the session layer rather than here.
    let body_limit = (state.config.server.chunk_size as usize).saturating_add(1024);

    let mut router = Router::new()
        .route("/v1/uploads", post(uploads::init_upload))
        .route(
            "/v1/uploads/{id}/chunks/{index}",
            post(uploads::accept_chunk),
        )
        .route("/v1/uploads/{id}/progress", get(uploads::get_progress))
        .route("/v1/uploads/{id}/resume", get(uploads::resume_upload))
        .route("/v1/uploads/{id}/cancel", post(uploads::cancel_upload))
        .route("/v1/health", get(health::health))
        .layer(DefaultBodyLimit::max(body_limit));

    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(health::metrics_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
