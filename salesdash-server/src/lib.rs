//! Salesdash HTTP server
//!
//! Thin axum layer over [`SalesdashContext`]: dashboards, filter options,
//! uploads and SMS notifications. Store work runs on the blocking pool.

pub mod error;
pub mod handlers;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use salesdash_core::{EntryPoint, LoggingService, SalesdashContext};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Environment variable overriding the data directory
pub const ENV_DATA_DIR: &str = "SALESDASH_DIR";

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<SalesdashContext>,
    pub event_log: Arc<LoggingService>,
}

impl AppState {
    /// Open the data directory for serving
    pub fn open(data_dir: &Path) -> Result<Self> {
        let mut ctx = SalesdashContext::new(data_dir)?;
        let event_log = Arc::new(
            LoggingService::new(data_dir, EntryPoint::Server, env!("CARGO_PKG_VERSION"))
                .context("Failed to open event log")?,
        );
        ctx.attach_event_log(Arc::clone(&event_log));
        Ok(Self {
            ctx: Arc::new(ctx),
            event_log,
        })
    }
}

/// Data directory from the environment, else `~/.salesdash`
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".salesdash"))
        .context("Could not find home directory (set SALESDASH_DIR)")
}

/// All routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/filters", get(handlers::filters))
        .route("/api/sales-director-dashboard", get(handlers::director_dashboard))
        .route("/api/sales-manager-dashboard", get(handlers::manager_dashboard))
        .route("/api/sales-trader-dashboard", get(handlers::trader_dashboard))
        .route("/api/aggregate", get(handlers::aggregate))
        .route("/upload-excel", post(handlers::upload))
        .route("/send-sms", post(handlers::send_sms))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
