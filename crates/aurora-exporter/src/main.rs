//! Aurora exporter daemon.
//!
//! - Watches a folder for metric files and republishes them as gauges
//! - Scrape endpoint: /metrics (plus /healthz, /readyz)
//! - Graceful shutdown on Ctrl-C / SIGTERM

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use aurora_core::error::{AuroraError, Result};
use aurora_exporter::{app_state, config, router};

const DEFAULT_CONFIG_PATH: &str = "aurora.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    tracing::info!(version = app_state::VERSION, "coming online");

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.exporter.listen_addr()?;

    let state = app_state::AppState::new(cfg)?;

    let mut watcher = state.folder_watcher();
    watcher.start()?;

    let app = router::build_router(state.clone());

    tracing::info!(%listen, "aurora-exporter starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| AuroraError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .map_err(|e| AuroraError::Internal(format!("server failed: {e}")))?;

    watcher.stop().await;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal(state: app_state::AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("interrupt captured, draining");
    state.set_draining();
}
