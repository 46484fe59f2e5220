//! Account data port
//!
//! Profile, children, provider profile and notification settings go through
//! one port chosen at startup. `LocalAccounts` keeps them in the mirrored
//! `UserRecord`. `RemoteAccounts` writes to the passthrough API and caches
//! what it wrote in the mirror so gating stays synchronous.

use async_trait::async_trait;
use carelink_common::ChildRecord;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::{AuthError, AuthResult};
use crate::store::Mirror;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait AccountPort: Send + Sync {
    async fn load_profile(&self, email: &str) -> AuthResult<Option<Value>>;
    async fn save_profile(&self, email: &str, profile: Value) -> AuthResult<()>;
    async fn save_children(&self, email: &str, children: Vec<ChildRecord>) -> AuthResult<()>;
    /// Shallow-merge `fragment` into the stored provider profile
    async fn merge_provider_profile(&self, email: &str, fragment: Value) -> AuthResult<Value>;
    async fn load_notify(&self, email: &str) -> AuthResult<Option<Value>>;
    async fn save_notify(&self, email: &str, notify: Value) -> AuthResult<()>;
}

/// Top-level keys of `fragment` overwrite those of `base`
pub fn shallow_merge(base: Option<Value>, fragment: Value) -> Value {
    let mut merged = match base {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    match fragment {
        Value::Object(fields) => merged.extend(fields),
        other => return other,
    }
    Value::Object(merged)
}

/// Account data stored in the local mirror only
pub struct LocalAccounts {
    mirror: Mirror,
}

impl LocalAccounts {
    pub fn new(mirror: Mirror) -> Self {
        Self { mirror }
    }
}

#[async_trait]
impl AccountPort for LocalAccounts {
    async fn load_profile(&self, email: &str) -> AuthResult<Option<Value>> {
        Ok(self.mirror.user(email)?.and_then(|u| u.profile))
    }

    async fn save_profile(&self, email: &str, profile: Value) -> AuthResult<()> {
        self.mirror
            .update_existing(email, |u| u.profile = Some(profile))?
            .ok_or(AuthError::UserNotFound)?;
        Ok(())
    }

    async fn save_children(&self, email: &str, children: Vec<ChildRecord>) -> AuthResult<()> {
        self.mirror
            .update_existing(email, |u| u.children = Some(children))?
            .ok_or(AuthError::UserNotFound)?;
        Ok(())
    }

    async fn merge_provider_profile(&self, email: &str, fragment: Value) -> AuthResult<Value> {
        let updated = self
            .mirror
            .update_existing(email, |u| {
                u.provider_profile = Some(shallow_merge(u.provider_profile.take(), fragment));
            })?
            .ok_or(AuthError::UserNotFound)?;
        Ok(updated.provider_profile.unwrap_or(Value::Null))
    }

    async fn load_notify(&self, email: &str) -> AuthResult<Option<Value>> {
        Ok(self.mirror.user(email)?.and_then(|u| u.notify))
    }

    async fn save_notify(&self, email: &str, notify: Value) -> AuthResult<()> {
        self.mirror
            .update_existing(email, |u| u.notify = Some(notify))?
            .ok_or(AuthError::UserNotFound)?;
        Ok(())
    }
}

/// Account data stored through the passthrough API
pub struct RemoteAccounts {
    client: reqwest::Client,
    base_url: String,
    mirror: Mirror,
}

impl RemoteAccounts {
    pub fn new(base_url: &str, mirror: Mirror) -> AuthResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("carelink-session/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            mirror,
        })
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/api/{}", self.base_url, resource)
    }

    async fn fetch(&self, resource: &str, email: &str) -> AuthResult<Value> {
        let response = self
            .client
            .get(self.url(resource))
            .query(&[("email", email)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Remote(format!("GET /api/{} failed: {}", resource, status)));
        }
        let body: Value = response.json().await?;
        Ok(body.get(resource).cloned().unwrap_or(Value::Null))
    }

    async fn store(&self, resource: &str, email: &str, document: Value) -> AuthResult<()> {
        debug!("Posting {} for {}", resource, email);
        let response = self
            .client
            .post(self.url(resource))
            .json(&json!({ "email": email, resource: document }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body["error"]["message"].as_str().unwrap_or("").to_string();
            return Err(AuthError::Remote(format!(
                "POST /api/{} failed: {} {}",
                resource, status, message
            )));
        }
        Ok(())
    }

    /// Cache a stored value in the mirror when the record exists
    fn cache<F>(&self, email: &str, f: F) -> AuthResult<()>
    where
        F: FnOnce(&mut carelink_common::UserRecord),
    {
        self.mirror.update_existing(email, f)?;
        Ok(())
    }
}

fn non_null(value: Value) -> Option<Value> {
    Some(value).filter(|v| !v.is_null())
}

#[async_trait]
impl AccountPort for RemoteAccounts {
    async fn load_profile(&self, email: &str) -> AuthResult<Option<Value>> {
        let profile = non_null(self.fetch("profile", email).await?);
        if let Some(profile) = &profile {
            self.cache(email, |u| u.profile = Some(profile.clone()))?;
        }
        Ok(profile)
    }

    async fn save_profile(&self, email: &str, profile: Value) -> AuthResult<()> {
        self.store("profile", email, profile.clone()).await?;
        self.cache(email, |u| u.profile = Some(profile))
    }

    async fn save_children(&self, email: &str, children: Vec<ChildRecord>) -> AuthResult<()> {
        let payload = Value::Array(children.iter().map(ChildRecord::to_value).collect());
        self.store("children", email, payload).await?;
        self.cache(email, |u| u.children = Some(children))
    }

    async fn merge_provider_profile(&self, email: &str, fragment: Value) -> AuthResult<Value> {
        let current = non_null(self.fetch("provider", email).await?);
        let merged = shallow_merge(current, fragment);
        self.store("provider", email, merged.clone()).await?;
        self.cache(email, |u| u.provider_profile = Some(merged.clone()))?;
        Ok(merged)
    }

    async fn load_notify(&self, email: &str) -> AuthResult<Option<Value>> {
        Ok(non_null(self.fetch("notify", email).await?))
    }

    async fn save_notify(&self, email: &str, notify: Value) -> AuthResult<()> {
        self.store("notify", email, notify).await
    }
}
