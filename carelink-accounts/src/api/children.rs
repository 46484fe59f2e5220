//! Children endpoint
//!
//! The list is stored as one array document per parent email and replaced
//! as a whole on every write. Incoming children are normalized; stored
//! children are upgraded on the way out.

use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use carelink_common::{normalize_value, upgrade_value, Collection};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::documents::EmailQuery;
use super::{body_json, email_field};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/children?email=
pub async fn get_children(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Json<Value>> {
    let email = email_field(query.email.as_deref())
        .ok_or_else(|| ApiError::BadRequest("email required".to_string()))?;

    let stored = state.store.get(Collection::Children, &email).await?;
    let children: Vec<Value> = match stored {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(upgrade_value)
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            warn!("Stored children for {} is not a list; returning none", email);
            Vec::new()
        }
    };

    Ok(Json(json!({ "children": children })))
}

/// POST /api/children with `{email, children: [...]}`
pub async fn post_children(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    let body = body_json(&body);
    let email = email_field(body.get("email").and_then(Value::as_str));

    let (Some(email), Some(Value::Array(items))) = (email, body.get("children")) else {
        return Err(ApiError::BadRequest("email and children[] required".to_string()));
    };

    let children: Vec<Value> = items.iter().cloned().map(normalize_value).collect();

    debug!("Replacing {} children for {}", children.len(), email);
    state
        .store
        .put(Collection::Children, &email, Value::Array(children))
        .await?;
    Ok(Json(json!({ "ok": true })))
}

/// Build children routes
pub fn children_routes() -> Router<AppState> {
    Router::new().route("/api/children", get(get_children).post(post_children))
}
