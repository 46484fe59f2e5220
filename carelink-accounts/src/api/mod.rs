//! HTTP API handlers for carelink-accounts

pub mod children;
pub mod documents;
pub mod health;

pub use children::children_routes;
pub use documents::document_routes;
pub use health::health_routes;

use axum::body::Bytes;
use serde_json::Value;

/// Request body as JSON; anything unparsable reads as `null`
pub(crate) fn body_json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

/// Non-blank `email` string from a query or body value
pub(crate) fn email_field(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|e| !e.is_empty()).map(str::to_string)
}
