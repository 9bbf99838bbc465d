//! testpulse -- webhook-driven dashboard for CI test-run results.
//!
//! CI jobs POST outcomes to `/webhook`; the service stores them in SQLite and
//! serves per-project summaries, filtered listings, and an embedded frontend.

pub mod api;
pub mod config;
pub mod storage;
pub mod web;

use anyhow::{Context, Result};

use crate::api::AppState;
use crate::config::AppConfig;

/// Start the testpulse HTTP service and run until Ctrl-C.
pub async fn serve(config: AppConfig) -> Result<()> {
    config.validate()?;

    // 1. Initialize Storage
    tracing::info!(db_path = %config.db_path.display(), "Initializing database");
    let pool = storage::open_pool(&config.db_path)?;

    if config.api_token.is_none() {
        tracing::warn!("API_TOKEN not set, webhook ingestion is unauthenticated");
    }

    // 2. Start API Server
    let addr = config.bind_addr();
    let prefix = config.path_prefix.clone();
    let app = api::router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, prefix = %prefix, "testpulse listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
