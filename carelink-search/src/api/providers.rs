//! Provider search endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::filter::FilterSelection;
use crate::mapper::ProviderRecord;
use crate::pagination::calculate_pagination;
use crate::AppState;

/// Query parameters for the provider listing
#[derive(Debug, Deserialize)]
pub struct ProviderQuery {
    pub q: Option<String>,
    pub age: Option<String>,
    #[serde(rename = "type")]
    pub facility_type: Option<String>,
    pub availability: Option<String>,
    pub radius: Option<String>,
    pub hours: Option<String>,
    pub subsidy: Option<String>,

    /// Page number (1-indexed); anything unparseable reads as page 1
    pub page: Option<String>,
}

impl ProviderQuery {
    fn requested_page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1)
    }

    fn selection(self) -> FilterSelection {
        FilterSelection {
            q: self.q,
            age: self.age,
            facility_type: self.facility_type,
            availability: self.availability,
            radius: self.radius,
            hours: self.hours,
            subsidy: self.subsidy,
        }
    }
}

/// One page of filtered providers
#[derive(Debug, Serialize)]
pub struct ProviderListResponse {
    pub total_results: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub providers: Vec<ProviderRecord>,
}

/// GET /api/providers
pub async fn list_providers(
    State(state): State<AppState>,
    Query(query): Query<ProviderQuery>,
) -> Json<ProviderListResponse> {
    let requested_page = query.requested_page();
    let selection = query.selection();

    let snapshot = state.catalog.snapshot().await;
    let matched = selection.apply(&snapshot.providers);

    let p = calculate_pagination(matched.len() as i64, requested_page, state.page_size);
    let providers = p.slice(&matched).iter().map(|&r| r.clone()).collect();

    Json(ProviderListResponse {
        total_results: matched.len() as i64,
        page: p.page,
        page_size: p.page_size,
        total_pages: p.total_pages,
        providers,
    })
}

/// GET /api/providers/:id
pub async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> ApiResult<Json<ProviderRecord>> {
    state
        .catalog
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("provider {}", id)))
}

/// POST /api/providers/:id/favorite
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> ApiResult<Json<ProviderRecord>> {
    state
        .catalog
        .toggle_favorite(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("provider {}", id)))
}

/// POST /api/providers/reload
pub async fn reload_providers(State(state): State<AppState>) -> Json<Value> {
    info!("Provider reload requested from {}", state.catalog.source());

    match state.catalog.reload().await {
        Some(count) => Json(json!({ "reloaded": true, "providers": count })),
        None => Json(json!({ "reloaded": false })),
    }
}

/// Build provider routes
pub fn provider_routes() -> Router<AppState> {
    Router::new()
        .route("/api/providers", get(list_providers))
        .route("/api/providers/reload", post(reload_providers))
        .route("/api/providers/:id", get(get_provider))
        .route("/api/providers/:id/favorite", post(toggle_favorite))
}
