//! HTTP handlers for the inbound upload API.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use clipdock_core::{
    ChunkAccepted, InitUploadRequest, InitUploadResponse, ProgressResponse, ResumeResponse,
};
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

/// `POST /v1/uploads`
pub async fn init_upload(
    State(state): State<AppState>,
    Json(req): Json<InitUploadRequest>,
) -> ApiResult<(StatusCode, Json<InitUploadResponse>)> {
    let response = state.manager.init_upload(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /v1/uploads/{id}/chunks/{index}`
///
/// The body is the raw chunk payload. Axum's default body limit is replaced
/// in the router with one derived from the configured chunk size.
pub async fn accept_chunk(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, u32)>,
    body: Bytes,
) -> ApiResult<Json<ChunkAccepted>> {
    let response = state.manager.accept_chunk(&id, index, body).await?;
    Ok(Json(response))
}

/// `GET /v1/uploads/{id}/progress`
pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProgressResponse>> {
    let response = state.manager.progress(&id).await?;
    Ok(Json(response))
}

/// `GET /v1/uploads/{id}/resume`
pub async fn resume_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ResumeResponse>> {
    let response = state.manager.resume_upload(&id).await?;
    Ok(Json(response))
}

/// `POST /v1/uploads/{id}/cancel`
pub async fn cancel_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.manager.cancel_upload(&id).await?;
    Ok(Json(json!({ "success": true })))
}
