//! carelink-accounts library - profile/children/provider/notify passthrough
//!
//! Thin HTTP layer over a [`DocumentStore`]: every endpoint reads or
//! replaces one JSON document keyed by email.

use axum::Router;
use carelink_common::config::HostedConfig;
use carelink_common::DocumentStore;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod store;

use api::health::HostedFlags;

/// Default listen port
pub const DEFAULT_PORT: u16 = 5732;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    /// Hosted settings present at startup, reported by `/api/health`
    pub hosted: HostedFlags,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, hosted: &HostedConfig) -> Self {
        let present = |v: &Option<String>| v.as_deref().map_or(false, |s| !s.trim().is_empty());

        Self {
            store,
            hosted: HostedFlags {
                has_url: present(&hosted.url),
                has_anon: present(&hosted.anon_key),
                has_service: present(&hosted.service_key),
            },
            started_at: Instant::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::document_routes())
        .merge(api::children_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
