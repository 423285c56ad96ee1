// THEORY:
// `hold_vision_server` is a thin HTTP shell around the `hold_vision` core. It owns
// nothing the core does not already do: it parses requests, stores uploads, hands
// scans to a shared `ScanPool` and checks logins with a `LaunchDataVerifier`.
//
// Key architectural principles:
// 1.  **Shared, cheap state**: `AppState` is cloned into every handler; the pool and
//     the uploads path sit behind `Arc`s and the verifier is a 32-byte key.
// 2.  **Configuration from the environment**: see `config::ServerConfig`.
// 3.  **Scans off the reactor**: handlers await the pool and never run a scan inline.

pub mod config;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use hold_vision::{DetectionConfig, DetectionError, DetectionPipeline, LaunchDataVerifier, ScanPool};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::info;

pub use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<ScanPool>,
    pub verifier: LaunchDataVerifier,
    pub uploads_dir: Arc<PathBuf>,
}

impl AppState {
    /// Builds the shared state. Spawns the scan pool, so it must run inside a tokio
    /// runtime.
    pub fn new(config: &ServerConfig) -> Result<Self, DetectionError> {
        let pipeline = DetectionPipeline::new(DetectionConfig::with_step(config.scan_step))?;
        Ok(Self {
            pool: Arc::new(ScanPool::new(pipeline, config.scan_workers)),
            verifier: LaunchDataVerifier::from_optional(config.bot_token.as_deref()),
            uploads_dir: Arc::new(config.uploads_dir.clone()),
        })
    }
}

/// Stored uploads are served back under `/uploads/<file>`, the `imageUrl` returned
/// by the upload endpoint.
pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.uploads_dir.as_path());
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/upload-sector", post(routes::upload_sector))
        .route("/api/auth", post(routes::auth))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(config::MAX_BODY_BYTES))
        .with_state(state)
}

/// Binds `config.bind_addr` and serves until Ctrl-C.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.uploads_dir)
        .await
        .with_context(|| format!("creating uploads dir {}", config.uploads_dir.display()))?;

    let state = AppState::new(&config).context("building detection pipeline")?;
    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        workers = config.scan_workers,
        step = config.scan_step,
        "hold_vision_server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
