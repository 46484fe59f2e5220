//! carelink-search library - provider search service
//!
//! Loads the provider CSV export, derives display fields for each listing
//! and serves filtered, paginated results over HTTP.

use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod catalog;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod mapper;
pub mod pagination;

use catalog::ProviderCatalog;

/// Default listen port
pub const DEFAULT_PORT: u16 = 5731;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ProviderCatalog>,
    /// Providers per result page
    pub page_size: i64,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(catalog: Arc<ProviderCatalog>, page_size: i64) -> Self {
        Self {
            catalog,
            page_size,
            started_at: Instant::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::provider_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
