//! tunehub-api library interface
//!
//! Exposes the router and services so integration tests can drive them
//! without binding a socket.

pub mod analysis;
pub mod api;
pub mod db;
pub mod error;
pub mod services;
pub mod storage;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use anyhow::Context;
use axum::http::HeaderValue;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::{AnalysisService, UploadIntake, WorkerPool};
use crate::storage::ContentStore;
use tunehub_common::config::UploadConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub store: ContentStore,
    pub intake: UploadIntake,
    pub analyzer: AnalysisService,
    pub uploads: UploadConfig,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        store: ContentStore,
        uploads: UploadConfig,
        workers: WorkerPool,
    ) -> Self {
        Self {
            intake: UploadIntake::new(db.clone(), store.clone(), uploads),
            analyzer: AnalysisService::new(workers, db.clone(), store.clone()),
            db,
            store,
            uploads,
            cors_origins: Vec::new(),
            startup_time: Utc::now(),
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }
}

/// CORS for the configured browser origins, credentials allowed
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_origins);
    let upload_limit = state.uploads.request_body_limit();

    Router::new()
        .merge(api::health_routes())
        .merge(api::track_routes(upload_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind the HTTP listener, returning the address actually bound
///
/// Port 0 picks a free port; the returned address carries the real one.
pub async fn bind_listener(bind: &str, port: u16) -> anyhow::Result<(TcpListener, SocketAddr)> {
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local_addr = listener
        .local_addr()
        .context("Failed to read listener address")?;
    Ok((listener, local_addr))
}
