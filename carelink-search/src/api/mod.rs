//! HTTP API handlers for carelink-search

pub mod health;
pub mod providers;

pub use health::health_routes;
pub use providers::provider_routes;
