//! Upload session lifecycle: init, chunk acceptance, resume, cancel, reap.

use std::sync::Arc;

use bytes::Bytes;
use clipdock_core::{
    chunk_count, eta_millis, progress_percent, validate_filename, ChunkAccepted,
    InitUploadRequest, InitUploadResponse, ProgressResponse, ResumeResponse, ServerConfig,
    SessionId, SessionStatus, UploadSession,
};
use clipdock_storage::ChunkStore;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::assembler;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::sessions::SessionTable;
use crate::sink::UploadSink;

/// Owns the session table and drives every session state transition.
pub struct UploadManager {
    config: ServerConfig,
    store: Arc<dyn ChunkStore>,
    sink: Arc<dyn UploadSink>,
    sessions: SessionTable,
}

impl UploadManager {
    pub fn new(config: ServerConfig, store: Arc<dyn ChunkStore>, sink: Arc<dyn UploadSink>) -> Self {
        Self {
            config,
            store,
            sink,
            sessions: SessionTable::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.len().await
    }

    /// Create a new upload session. All validation happens before any state
    /// is created; a rejected init leaves no trace.
    #[instrument(skip(self))]
    pub async fn init_upload(&self, req: InitUploadRequest) -> ApiResult<InitUploadResponse> {
        validate_filename(&req.filename)?;

        if req.total_size == 0 {
            return Err(clipdock_core::Error::Validation(
                "total_size must be nonzero".to_string(),
            )
            .into());
        }
        if req.total_size > self.config.max_file_size {
            return Err(clipdock_core::Error::SizeLimit {
                size: req.total_size,
                max: self.config.max_file_size,
            }
            .into());
        }
        let expected_chunks = chunk_count(req.total_size, self.config.chunk_size);
        if req.total_chunks != expected_chunks {
            return Err(clipdock_core::Error::Validation(format!(
                "total_chunks {} does not match expected {} for size {} at chunk size {}",
                req.total_chunks, expected_chunks, req.total_size, self.config.chunk_size
            ))
            .into());
        }

        let session = UploadSession::new(
            req.filename,
            req.total_size,
            req.total_chunks,
            self.config.chunk_size,
        );
        let id = session.id;
        self.sessions.insert(session).await;

        metrics::SESSIONS_CREATED.inc();
        metrics::ACTIVE_SESSIONS.inc();
        info!(session_id = %id, total_size = req.total_size, total_chunks = req.total_chunks, "upload session created");

        Ok(InitUploadResponse {
            session_id: id.to_string(),
            chunk_size: self.config.chunk_size,
        })
    }

    /// Accept one chunk. Idempotent per index; the write that completes the
    /// chunk set triggers assembly synchronously before returning.
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn accept_chunk(
        &self,
        session_id: &str,
        index: u32,
        data: Bytes,
    ) -> ApiResult<ChunkAccepted> {
        let id = parse_session_id(session_id)?;
        let shared = self
            .sessions
            .get(&id)
            .await
            .ok_or_else(|| clipdock_core::Error::SessionNotFound(session_id.to_string()))?;

        let mut session = shared.lock().await;

        if session.status.is_terminal() {
            return Err(clipdock_core::Error::SessionNotFound(session_id.to_string()).into());
        }
        if session.status == SessionStatus::Finalizing {
            // A late duplicate racing finalize; nothing left to write.
            return Ok(chunk_response(&session, false, None));
        }

        if index >= session.declared_total_chunks {
            return Err(clipdock_core::Error::InvalidChunkIndex {
                index,
                total: session.declared_total_chunks,
            }
            .into());
        }
        let expected = session.expected_chunk_size(index);
        if data.len() as u64 != expected {
            return Err(clipdock_core::Error::ChunkSizeMismatch {
                index,
                expected,
                actual: data.len() as u64,
            }
            .into());
        }

        let size = data.len() as u64;
        self.store.put_chunk(id, index, data).await?;

        let newly_received = session.record_chunk(index, size);
        if newly_received {
            metrics::CHUNKS_RECEIVED.inc();
            metrics::BYTES_RECEIVED.inc_by(size);
        } else {
            metrics::CHUNKS_DUPLICATE.inc();
            debug!(session_id = %id, index, "duplicate chunk overwritten");
        }

        if session.is_complete() && session.status == SessionStatus::Uploading {
            // Only this request observes the uploading -> finalizing edge, so
            // assembly runs at most once per session.
            session.status = SessionStatus::Finalizing;

            let error = match assembler::assemble(&self.store, &self.sink, &session).await {
                Ok(_path) => {
                    session.status = SessionStatus::Completed;
                    metrics::SESSIONS_COMPLETED.inc();
                    None
                }
                Err(e) => {
                    session.status = SessionStatus::Failed;
                    session.error = Some(e.clone());
                    metrics::SESSIONS_FAILED.inc();
                    Some(e)
                }
            };

            let response = chunk_response(&session, true, error);
            drop(session);
            // A racing cancel may have pulled the entry already; only the
            // caller that actually removes it owns the gauge decrement.
            if self.sessions.remove(&id).await.is_some() {
                metrics::ACTIVE_SESSIONS.dec();
            }
            return Ok(response);
        }

        Ok(chunk_response(&session, true, None))
    }

    /// Current progress for an active session.
    pub async fn progress(&self, session_id: &str) -> ApiResult<ProgressResponse> {
        let id = parse_session_id(session_id)?;
        let shared = self
            .sessions
            .get(&id)
            .await
            .ok_or_else(|| clipdock_core::Error::SessionNotFound(session_id.to_string()))?;
        let session = shared.lock().await;
        let (progress, eta) = progress_of(&session);
        Ok(ProgressResponse {
            progress,
            eta_millis: eta,
            status: session.status,
        })
    }

    /// Report which chunks a session already holds so an interrupted client
    /// can continue. Counts as liveness activity but changes nothing else.
    #[instrument(skip(self))]
    pub async fn resume_upload(&self, session_id: &str) -> ApiResult<ResumeResponse> {
        let id = parse_session_id(session_id)?;
        let shared = self
            .sessions
            .get(&id)
            .await
            .ok_or_else(|| clipdock_core::Error::SessionNotFound(session_id.to_string()))?;

        let mut session = shared.lock().await;
        session.touch();

        let mut received: Vec<u32> = session.received_chunks.iter().copied().collect();
        received.sort_unstable();

        Ok(ResumeResponse {
            received_chunks: received,
            total_chunks: session.declared_total_chunks,
            next_chunk: session.next_missing_chunk(),
        })
    }

    /// Cancel a session and delete its chunk storage. Idempotent: cancelling
    /// an unknown or already-gone session succeeds without effect.
    #[instrument(skip(self))]
    pub async fn cancel_upload(&self, session_id: &str) -> ApiResult<()> {
        let id = match SessionId::parse(session_id) {
            Ok(id) => id,
            // Malformed ids cannot name a live session; cancel is a no-op.
            Err(_) => return Ok(()),
        };
        let Some(shared) = self.sessions.get(&id).await else {
            return Ok(());
        };

        let mut session = shared.lock().await;
        // Acquiring the lock may have waited out an in-flight finalize.
        // Terminal sessions are never mutated; the path that made them
        // terminal already tore them down.
        if session.status.is_terminal() {
            return Ok(());
        }
        session.status = SessionStatus::Cancelled;
        drop(session);

        if self.sessions.remove(&id).await.is_some() {
            metrics::ACTIVE_SESSIONS.dec();
        }
        if let Err(e) = self.store.delete_session(id).await {
            warn!(session_id = %id, error = %e, "failed to delete storage for cancelled session");
        }
        metrics::SESSIONS_CANCELLED.inc();
        info!(session_id = %id, "upload session cancelled");
        Ok(())
    }

    /// Remove sessions idle past the staleness cutoff. Returns how many were
    /// reaped. `now` is injected so sweeps are deterministic under test.
    pub async fn reap_stale(&self, now: OffsetDateTime) -> usize {
        let cutoff = now - self.config.stale_after();
        let mut reaped = 0;

        for id in self.sessions.ids().await {
            let Some(shared) = self.sessions.get(&id).await else {
                continue;
            };
            let mut session = shared.lock().await;
            if !session.status.is_active() || session.last_activity_at >= cutoff {
                continue;
            }
            session.status = SessionStatus::Cancelled;
            drop(session);

            if self.sessions.remove(&id).await.is_some() {
                metrics::ACTIVE_SESSIONS.dec();
            }
            if let Err(e) = self.store.delete_session(id).await {
                warn!(session_id = %id, error = %e, "failed to delete storage for stale session");
            }
            metrics::SESSIONS_REAPED.inc();
            info!(session_id = %id, "stale upload session reaped");
            reaped += 1;
        }
        reaped
    }
}

/// A malformed id can never name a live session, so it gets the same
/// "restart from init" signal as an expired one.
fn parse_session_id(raw: &str) -> ApiResult<SessionId> {
    SessionId::parse(raw)
        .map_err(|_| ApiError::from(clipdock_core::Error::SessionNotFound(raw.to_string())))
}

fn progress_of(session: &UploadSession) -> (f64, u64) {
    let progress = progress_percent(session.bytes_received, session.declared_total_size);
    let eta = eta_millis(
        session.bytes_received,
        session.declared_total_size,
        session.elapsed_millis(),
    );
    (progress, eta)
}

fn chunk_response(session: &UploadSession, accepted: bool, error: Option<String>) -> ChunkAccepted {
    let (progress, eta) = progress_of(session);
    ChunkAccepted {
        accepted,
        received_chunks: session.received_chunks.len() as u32,
        total_chunks: session.declared_total_chunks,
        progress,
        eta_millis: eta,
        status: session.status,
        error,
    }
}
