//! Hosted auth port

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AuthResult;

/// User as reported by the hosted auth service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteUser {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
}

impl RemoteUser {
    pub fn is_confirmed(&self) -> bool {
        self.email_confirmed_at
            .as_deref()
            .is_some_and(|at| !at.is_empty())
    }
}

/// Signed-in session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: RemoteUser,
}

#[async_trait]
pub trait RemoteAuth: Send + Sync {
    /// Register an account; the service sends the confirmation email
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> AuthResult<RemoteUser>;

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<RemoteSession>;

    /// Current session, if any
    async fn get_session(&self) -> AuthResult<Option<RemoteSession>>;

    /// Redeem an authorization code from a confirmation or OAuth redirect
    async fn exchange_code(&self, code: &str, code_verifier: Option<&str>)
        -> AuthResult<RemoteSession>;

    async fn sign_out(&self) -> AuthResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_flag() {
        let mut user = RemoteUser::default();
        assert!(!user.is_confirmed());
        user.email_confirmed_at = Some(String::new());
        assert!(!user.is_confirmed());
        user.email_confirmed_at = Some("2024-05-01T10:00:00Z".to_string());
        assert!(user.is_confirmed());
    }
}
