//! Session bridge error types

use thiserror::Error;

pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Hosted auth refused sign-in until the email is confirmed
    #[error("Email not confirmed")]
    EmailNotConfirmed,

    #[error("Not signed in")]
    NotSignedIn,

    #[error("No account for this email")]
    UserNotFound,

    #[error("An account already exists for {0}")]
    AlreadyExists(String),

    /// Verify/reset links are issued and redeemed by the hosted auth service
    #[error("Verification and reset links are handled by the hosted auth service")]
    TokenFlowDelegated,

    #[error("Invalid or expired link")]
    InvalidToken,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("{0}")]
    Validation(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Session store error: {0}")]
    Store(String),
}

impl From<carelink_common::Error> for AuthError {
    fn from(err: carelink_common::Error) -> Self {
        match err {
            carelink_common::Error::InvalidInput(msg) => AuthError::Validation(msg),
            carelink_common::Error::Remote(msg) => AuthError::Remote(msg),
            other => AuthError::Store(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Store(err.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(err: std::io::Error) -> Self {
        AuthError::Store(err.to_string())
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Remote(err.to_string())
    }
}
