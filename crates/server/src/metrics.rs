//! Prometheus metrics for the upload pipeline.

use std::sync::LazyLock;

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Encoder, Histogram,
    IntCounter, IntGauge, TextEncoder,
};

pub static SESSIONS_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "clipdock_sessions_created_total",
        "Upload sessions created"
    )
    .unwrap()
});

pub static SESSIONS_COMPLETED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "clipdock_sessions_completed_total",
        "Upload sessions assembled successfully"
    )
    .unwrap()
});

pub static SESSIONS_FAILED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "clipdock_sessions_failed_total",
        "Upload sessions that failed during assembly"
    )
    .unwrap()
});

pub static SESSIONS_CANCELLED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "clipdock_sessions_cancelled_total",
        "Upload sessions cancelled by the client"
    )
    .unwrap()
});

pub static SESSIONS_REAPED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "clipdock_sessions_reaped_total",
        "Stale upload sessions removed by the reaper"
    )
    .unwrap()
});

pub static CHUNKS_RECEIVED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("clipdock_chunks_received_total", "Chunks accepted").unwrap()
});

pub static CHUNKS_DUPLICATE: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "clipdock_chunks_duplicate_total",
        "Chunk writes for an index already received"
    )
    .unwrap()
});

pub static BYTES_RECEIVED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("clipdock_bytes_received_total", "Chunk payload bytes accepted")
        .unwrap()
});

pub static ACTIVE_SESSIONS: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!("clipdock_active_sessions", "Sessions currently in the table")
        .unwrap()
});

pub static ASSEMBLY_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "clipdock_assembly_duration_seconds",
        "Time spent concatenating chunks into the final file",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0]
    )
    .unwrap()
});

/// Force registration of all metrics at startup so `/metrics` is complete
/// before the first request.
pub fn register_metrics() {
    LazyLock::force(&SESSIONS_CREATED);
    LazyLock::force(&SESSIONS_COMPLETED);
    LazyLock::force(&SESSIONS_FAILED);
    LazyLock::force(&SESSIONS_CANCELLED);
    LazyLock::force(&SESSIONS_REAPED);
    LazyLock::force(&CHUNKS_RECEIVED);
    LazyLock::force(&CHUNKS_DUPLICATE);
    LazyLock::force(&BYTES_RECEIVED);
    LazyLock::force(&ACTIVE_SESSIONS);
    LazyLock::force(&ASSEMBLY_DURATION);
}

/// Render the registry in Prometheus text exposition format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buf) {
        tracing::error!(error = %e, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}
