//! Profile, provider and notification document endpoints
//!
//! Three near-identical passthroughs keyed by email:
//! - `GET  /api/<key>?email=` -> `{"<key>": <document or null>}`
//! - `POST /api/<key>` with `{email, <key>}` -> `{"ok": true}`
//!
//! Writes replace the stored document.

use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use carelink_common::{is_truthy, Collection};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{body_json, email_field};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Query string for document reads
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

/// One passthrough document type
#[derive(Debug, Clone, Copy)]
pub struct DocumentKind {
    pub collection: Collection,
    /// Field name in request and response bodies
    pub key: &'static str,
    /// Whether a POST may store `null`
    pub nullable: bool,
}

pub const PROFILE: DocumentKind = DocumentKind {
    collection: Collection::Profiles,
    key: "profile",
    nullable: true,
};

pub const PROVIDER: DocumentKind = DocumentKind {
    collection: Collection::ProviderProfiles,
    key: "provider",
    nullable: false,
};

pub const NOTIFY: DocumentKind = DocumentKind {
    collection: Collection::NotifySettings,
    key: "notify",
    nullable: false,
};

/// GET handler body shared by all document kinds
pub async fn get_document(
    kind: DocumentKind,
    state: &AppState,
    query: EmailQuery,
) -> ApiResult<Json<Value>> {
    let email = email_field(query.email.as_deref())
        .ok_or_else(|| ApiError::BadRequest("email required".to_string()))?;

    let document = state.store.get(kind.collection, &email).await?;
    Ok(Json(json!({ kind.key: document.unwrap_or(Value::Null) })))
}

/// POST handler body shared by all document kinds
pub async fn put_document(kind: DocumentKind, state: &AppState, body: Value) -> ApiResult<Json<Value>> {
    let email = email_field(body.get("email").and_then(Value::as_str));
    let document = body.get(kind.key).cloned().unwrap_or(Value::Null);

    let missing = || {
        if kind.nullable {
            ApiError::BadRequest("email required".to_string())
        } else {
            ApiError::BadRequest(format!("email and {} required", kind.key))
        }
    };

    let email = email.ok_or_else(missing)?;
    if !kind.nullable && !is_truthy(&document) {
        return Err(missing());
    }

    debug!("Storing {} for {}", kind.collection, email);
    state.store.put(kind.collection, &email, document).await?;
    Ok(Json(json!({ "ok": true })))
}

fn kind_routes(path: &str, kind: DocumentKind) -> Router<AppState> {
    Router::new().route(
        path,
        get(
            move |State(state): State<AppState>, Query(query): Query<EmailQuery>| async move {
                get_document(kind, &state, query).await
            },
        )
        .post(move |State(state): State<AppState>, body: Bytes| async move {
            put_document(kind, &state, body_json(&body)).await
        }),
    )
}

/// Build profile/provider/notify routes
pub fn document_routes() -> Router<AppState> {
    Router::new()
        .merge(kind_routes("/api/profile", PROFILE))
        .merge(kind_routes("/api/provider", PROVIDER))
        .merge(kind_routes("/api/notify", NOTIFY))
}
