//! Clipdock server binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use clipdock_core::{AppConfig, StorageConfig};
use clipdock_server::sink::{JsonlSink, UploadSink};
use clipdock_server::{create_router, metrics, reaper, AppState, UploadManager};
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "clipdockd", about = "Resumable chunked upload server")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "CLIPDOCK_CONFIG")]
    config: Option<PathBuf>,
}

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut figment = Figment::new();
    if let Some(path) = &args.config {
        figment = figment.merge(Toml::file(path));
    }
    let config: AppConfig = figment
        .merge(Env::prefixed("CLIPDOCK_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("clipdock_server=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    metrics::register_metrics();

    let store = clipdock_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage backend")?;
    store
        .health_check()
        .await
        .context("storage backend health check failed")?;
    info!(backend = store.backend_name(), "storage backend ready");

    let ledger_path = match &config.storage {
        StorageConfig::Filesystem { path } => path.join("uploads.jsonl"),
    };
    let sink: Arc<dyn UploadSink> = Arc::new(JsonlSink::new(ledger_path));

    let manager = Arc::new(UploadManager::new(
        config.server.clone(),
        store,
        sink,
    ));
    let reaper_handle = reaper::spawn(manager.clone());

    let bind = config.server.bind.clone();
    let state = AppState::new(config, manager);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(addr = %listener.local_addr()?, "clipdockd listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    reaper_handle.abort();
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received sigterm"),
    }
}
