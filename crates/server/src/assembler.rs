//! Chunk assembly: concatenates received chunks into the final file.
//!
//! Runs synchronously inside the chunk request that completed the set, while
//! the session lock is held, so exactly one assembly ever runs per session.

use std::sync::Arc;

use clipdock_core::{media_type_for, SessionId, UploadSession};
use clipdock_storage::ChunkStore;
use tracing::{info, instrument, warn};

use crate::metrics;
use crate::sink::{NewUploadRecord, UploadSink};

/// Concatenate chunks `0..total` in index order, register the result with the
/// sink, and clean up chunk storage.
///
/// Chunk storage is deleted on success and on failure alike; a failed
/// assembly must not strand per-chunk files. On failure the partial output is
/// kept where the backend left it.
#[instrument(skip(store, sink, session), fields(session_id = %session.id, filename = %session.filename))]
pub async fn assemble(
    store: &Arc<dyn ChunkStore>,
    sink: &Arc<dyn UploadSink>,
    session: &UploadSession,
) -> Result<String, String> {
    let timer = metrics::ASSEMBLY_DURATION.start_timer();
    let result = assemble_inner(store, sink, session).await;
    timer.observe_duration();

    cleanup_chunks(store, session.id).await;

    match &result {
        Ok(path) => {
            info!(path = %path, size = session.declared_total_size, "upload assembled");
        }
        Err(e) => {
            warn!(error = %e, "assembly failed");
        }
    }
    result
}

async fn assemble_inner(
    store: &Arc<dyn ChunkStore>,
    sink: &Arc<dyn UploadSink>,
    session: &UploadSession,
) -> Result<String, String> {
    let mut output = store
        .put_assembled(session.id, &session.filename)
        .await
        .map_err(|e| format!("failed to open assembled output: {e}"))?;

    for index in 0..session.declared_total_chunks {
        let data = match store.get_chunk(session.id, index).await {
            Ok(data) => data,
            Err(e) => {
                let _ = output.abort().await;
                return Err(format!("failed to read chunk {index}: {e}"));
            }
        };
        if let Err(e) = output.write(data).await {
            let _ = output.abort().await;
            return Err(format!("failed to write chunk {index}: {e}"));
        }
    }

    let object = output
        .finish()
        .await
        .map_err(|e| format!("failed to finish assembled file: {e}"))?;

    if object.size != session.declared_total_size {
        return Err(format!(
            "assembled size {} does not match declared size {}",
            object.size, session.declared_total_size
        ));
    }

    let mime_type = media_type_for(&session.filename)
        .map(|m| m.mime_type.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    sink.create_upload_record(NewUploadRecord {
        user_id: None,
        filename: session.filename.clone(),
        path: object.path.clone(),
        size: object.size,
        mime_type,
        status: "uploaded".to_string(),
    })
    .await
    .map_err(|e| format!("failed to record upload: {e}"))?;

    Ok(object.path)
}

async fn cleanup_chunks(store: &Arc<dyn ChunkStore>, session: SessionId) {
    if let Err(e) = store.delete_session(session).await {
        warn!(session_id = %session, error = %e, "failed to delete chunk storage");
    }
}
