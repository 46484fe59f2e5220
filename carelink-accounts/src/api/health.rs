//! Health check endpoints
//!
//! `/health` is the module liveness probe shared by every CareLink service;
//! `/api/health` reports hosted-configuration flags and a store ping.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Which hosted settings are present (values are never echoed)
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HostedFlags {
    pub has_url: bool,
    pub has_anon: bool,
    pub has_service: bool,
}

/// Store diagnostics response
#[derive(Debug, Serialize)]
pub struct StoreHealthResponse {
    pub env: HostedFlags,
    pub store: &'static str,
    pub store_ok: bool,
    pub error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "carelink-accounts".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

/// GET /api/health
pub async fn store_health(State(state): State<AppState>) -> Json<StoreHealthResponse> {
    let (store_ok, error) = match state.store.ping().await {
        Ok(()) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    Json(StoreHealthResponse {
        env: state.hosted,
        store: state.store.kind(),
        store_ok,
        error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/health", get(store_health))
}
