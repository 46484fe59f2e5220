//! Common error types for CareLink

use thiserror::Error;

/// Common result type for CareLink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across CareLink services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Hosted service (auth or store) rejected or failed a call
    #[error("Remote error: {0}")]
    Remote(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
