//! REST client for the hosted auth service
//!
//! Endpoints live under `<url>/auth/v1`. The current session is persisted
//! in the session store under `StoreKey::RemoteSession` so it survives
//! across process runs.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};
use crate::remote::{RemoteAuth, RemoteSession, RemoteUser};
use crate::store::{SessionStore, StoreKey};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HostedAuthClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    store: Arc<dyn SessionStore>,
}

impl HostedAuthClient {
    pub fn new(base_url: &str, anon_key: &str, store: Arc<dyn SessionStore>) -> AuthResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("carelink-session/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            store,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header("apikey", &self.anon_key)
    }

    fn stored_session(&self) -> AuthResult<Option<RemoteSession>> {
        Ok(self
            .store
            .get(StoreKey::RemoteSession)?
            .and_then(|v| serde_json::from_value(v).ok()))
    }

    fn save_session(&self, session: &RemoteSession) -> AuthResult<()> {
        self.store
            .set(StoreKey::RemoteSession, serde_json::to_value(session)?)
    }

    fn clear_session(&self) -> AuthResult<()> {
        self.store.delete(StoreKey::RemoteSession)
    }

    /// POST to the token endpoint and keep the resulting session
    async fn token_grant(&self, grant_type: &str, body: Value) -> AuthResult<RemoteSession> {
        let request = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", grant_type)])
            .json(&body);
        let response = self.with_key(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            return Err(grant_error(status, &body));
        }

        let session: RemoteSession = response
            .json()
            .await
            .map_err(|e| AuthError::Remote(format!("Invalid token response: {}", e)))?;
        self.save_session(&session)?;
        Ok(session)
    }
}

/// Human-readable message from an auth error body
fn error_message(body: &Value) -> String {
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .unwrap_or("unknown error")
        .to_string()
}

/// Map a failed token grant to an error
fn grant_error(status: reqwest::StatusCode, body: &Value) -> AuthError {
    let message = error_message(body);
    let lower = message.to_lowercase();
    let code = body.get("error_code").and_then(Value::as_str).unwrap_or("");

    if code == "email_not_confirmed" || (lower.contains("email") && lower.contains("confirm")) {
        AuthError::EmailNotConfirmed
    } else if status == reqwest::StatusCode::BAD_REQUEST {
        AuthError::InvalidCredentials
    } else {
        AuthError::Remote(format!("{} - {}", status, message))
    }
}

#[async_trait]
impl RemoteAuth for HostedAuthClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> AuthResult<RemoteUser> {
        let mut request = self
            .client
            .post(self.endpoint("signup"))
            .json(&json!({ "email": email, "password": password }));
        if let Some(redirect) = redirect_to {
            request = request.query(&[("redirect_to", redirect)]);
        }
        let response = self.with_key(request).send().await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(AuthError::Remote(format!(
                "Sign-up failed: {} - {}",
                status,
                error_message(&body)
            )));
        }

        // Either a bare user (confirmation pending) or a full session
        if body.get("access_token").is_some() {
            if let Ok(session) = serde_json::from_value::<RemoteSession>(body.clone()) {
                self.save_session(&session)?;
                return Ok(session.user);
            }
        }
        let user = body.get("user").cloned().unwrap_or(body);
        serde_json::from_value(user)
            .map_err(|e| AuthError::Remote(format!("Invalid sign-up response: {}", e)))
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<RemoteSession> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn get_session(&self) -> AuthResult<Option<RemoteSession>> {
        let Some(mut session) = self.stored_session()? else {
            return Ok(None);
        };

        let request = self
            .client
            .get(self.endpoint("user"))
            .bearer_auth(&session.access_token);
        let response = self.with_key(request).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            debug!("Stored session rejected ({}), dropping it", status);
            self.clear_session()?;
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AuthError::Remote(format!("Session check failed: {}", status)));
        }

        session.user = response
            .json()
            .await
            .map_err(|e| AuthError::Remote(format!("Invalid user response: {}", e)))?;
        self.save_session(&session)?;
        Ok(Some(session))
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> AuthResult<RemoteSession> {
        self.token_grant(
            "pkce",
            json!({ "auth_code": code, "code_verifier": code_verifier }),
        )
        .await
    }

    async fn sign_out(&self) -> AuthResult<()> {
        let session = self.stored_session()?;
        self.clear_session()?;

        let Some(session) = session else {
            return Ok(());
        };
        let request = self
            .client
            .post(self.endpoint("logout"))
            .bearer_auth(&session.access_token);
        let response = self.with_key(request).send().await?;
        if !response.status().is_success() {
            warn!("Remote sign-out returned {}", response.status());
            return Err(AuthError::Remote(format!(
                "Sign-out failed: {}",
                response.status()
            )));
        }
        Ok(())
    }
}
