//! Session bridge
//!
//! Reconciles the hosted auth session with the local mirror and decides
//! where each user goes next. Gating reads only the mirror, so it never
//! waits on the network. Remote checks update the mirror when they succeed
//! and are logged and skipped when they fail.

use carelink_common::validation::{prepare_parent_profile, prepare_provider_profile};
use carelink_common::{normalize, ChildRecord, Role, UserRecord};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::accounts::AccountPort;
use crate::error::{AuthError, AuthResult};
use crate::password::{hash_password, verify_password};
use crate::remote::{RemoteAuth, RemoteSession};
use crate::store::{Mirror, TokenKind};

pub const TOKEN_LEN: usize = 32;

/// Where credentials are checked
#[derive(Clone)]
pub enum AuthMode {
    /// No hosted auth configured: Argon2 hashes and local tokens
    Local,
    Hosted(Arc<dyn RemoteAuth>),
}

/// Gating state of the current user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    PendingVerification,
    VerifiedNoRole,
    ParentIncompleteProfile,
    ParentComplete,
    Provider,
}

impl SessionState {
    /// State for a mirrored record (`None` when nobody is signed in)
    pub fn of(user: Option<&UserRecord>) -> Self {
        let Some(user) = user else {
            return SessionState::Anonymous;
        };
        if !user.verified {
            return SessionState::PendingVerification;
        }
        match user.role {
            None => SessionState::VerifiedNoRole,
            Some(Role::Provider) => SessionState::Provider,
            Some(Role::Parent) if has_parent_profile(user) => SessionState::ParentComplete,
            Some(Role::Parent) => SessionState::ParentIncompleteProfile,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "anonymous",
            SessionState::PendingVerification => "pending-verification",
            SessionState::VerifiedNoRole => "verified-no-role",
            SessionState::ParentIncompleteProfile => "verified-parent-incomplete-profile",
            SessionState::ParentComplete => "verified-parent-complete",
            SessionState::Provider => "verified-provider",
        }
    }
}

/// A parent profile counts once the contact step has stored a phone.
/// The `{email}` seed written at first sign-in does not.
fn has_parent_profile(user: &UserRecord) -> bool {
    user.profile
        .as_ref()
        .and_then(|p| p.get("phone"))
        .and_then(Value::as_str)
        .is_some_and(|phone| !phone.is_empty())
}

/// Navigation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    VerifySent,
    Role,
    ParentOnboarding,
    ParentChildren,
    ProviderOnboarding,
    ProviderServices,
    ParentDashboard,
    ProviderDashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::VerifySent => "/verify-sent",
            Route::Role => "/role",
            Route::ParentOnboarding => "/onboarding/parent/step-a",
            Route::ParentChildren => "/onboarding/parent/step-b",
            Route::ProviderOnboarding => "/onboarding/provider/step-a",
            Route::ProviderServices => "/onboarding/provider/step-b",
            Route::ParentDashboard => "/dashboard",
            Route::ProviderDashboard => "/provider/dashboard",
        }
    }
}

/// Where a user in `state` belongs
pub fn next_route(state: SessionState) -> Route {
    match state {
        SessionState::Anonymous => Route::Login,
        SessionState::PendingVerification => Route::VerifySent,
        SessionState::VerifiedNoRole => Route::Role,
        SessionState::ParentIncompleteProfile => Route::ParentOnboarding,
        SessionState::ParentComplete => Route::ParentDashboard,
        SessionState::Provider => Route::ProviderDashboard,
    }
}

/// Result of a sign-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub verified: bool,
    /// Local verification token; hosted sign-ups are confirmed by email
    pub verify_token: Option<String>,
}

/// Parameters of an auth redirect
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub code_verifier: Option<String>,
}

/// Opaque random token
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn required(value: &str, field: &str) -> AuthResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::Validation(format!("{} required", field)));
    }
    Ok(value.to_string())
}

fn default_notify() -> Value {
    json!({ "applicationUpdates": true, "messageNotifications": true })
}

pub struct SessionBridge {
    mirror: Mirror,
    mode: AuthMode,
    accounts: Arc<dyn AccountPort>,
    redirect_to: Option<String>,
}

impl SessionBridge {
    pub fn new(mirror: Mirror, mode: AuthMode, accounts: Arc<dyn AccountPort>) -> Self {
        Self {
            mirror,
            mode,
            accounts,
            redirect_to: None,
        }
    }

    /// Redirect target passed to hosted sign-up
    pub fn with_redirect(mut self, redirect_to: Option<String>) -> Self {
        self.redirect_to = redirect_to;
        self
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub fn is_hosted(&self) -> bool {
        matches!(self.mode, AuthMode::Hosted(_))
    }

    fn require_current(&self) -> AuthResult<String> {
        self.mirror.current_user()?.ok_or(AuthError::NotSignedIn)
    }

    fn route_for(&self, email: &str) -> AuthResult<Route> {
        Ok(next_route(SessionState::of(self.mirror.user(email)?.as_ref())))
    }

    // -------------------------------------------------------------------------
    // Sign-up / sign-in
    // -------------------------------------------------------------------------

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        let email = required(email, "email")?;
        let password = required(password, "password")?;

        match &self.mode {
            AuthMode::Hosted(remote) => {
                let user = remote
                    .sign_up(&email, &password, self.redirect_to.as_deref())
                    .await?;
                let verified = user.is_confirmed();
                self.mirror.update_user(&email, |u| {
                    if verified {
                        u.verified = true;
                    }
                })?;
                info!("Signed up {} (confirmed: {})", email, verified);
                Ok(SignUpOutcome {
                    verified,
                    verify_token: None,
                })
            }
            AuthMode::Local => {
                if self
                    .mirror
                    .user(&email)?
                    .is_some_and(|u| u.password_hash.is_some())
                {
                    return Err(AuthError::AlreadyExists(email));
                }
                let hash = hash_password(&password)?;
                self.mirror.update_user(&email, |u| {
                    u.password_hash = Some(hash);
                    u.verified = false;
                })?;
                let token = self.create_token(TokenKind::Verify, &email)?;
                info!("Created local account {}", email);
                Ok(SignUpOutcome {
                    verified: false,
                    verify_token: Some(token),
                })
            }
        }
    }

    /// Sign in and return the next route
    ///
    /// An unconfirmed hosted account routes to verify-sent without
    /// signing in.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Route> {
        let email = required(email, "email")?;
        let password = required(password, "password")?;

        match &self.mode {
            AuthMode::Hosted(remote) => match remote.sign_in(&email, &password).await {
                Ok(session) => {
                    self.adopt_session(&session, &email)?;
                    self.hydrate_profile(&email).await;
                }
                Err(AuthError::EmailNotConfirmed) => return Ok(Route::VerifySent),
                Err(e) => return Err(e),
            },
            AuthMode::Local => {
                let record = self.mirror.user(&email)?;
                let hash = record
                    .and_then(|u| u.password_hash)
                    .ok_or(AuthError::InvalidCredentials)?;
                if !verify_password(&password, &hash)? {
                    return Err(AuthError::InvalidCredentials);
                }
                self.mirror.set_current_user(Some(&email))?;
            }
        }

        info!("Signed in {}", email);
        self.route_for(&email)
    }

    /// Make `email` the current user, creating its record if needed
    ///
    /// A confirmed remote email force-sets `verified`; an unconfirmed one
    /// never clears it.
    fn adopt_remote_user(&self, email: &str, confirmed: bool) -> AuthResult<()> {
        self.mirror.set_current_user(Some(email))?;
        self.mirror.update_user(email, |u| {
            if confirmed {
                u.verified = true;
            }
        })?;
        Ok(())
    }

    fn adopt_session(&self, session: &RemoteSession, fallback_email: &str) -> AuthResult<String> {
        let email = session
            .user
            .email
            .clone()
            .unwrap_or_else(|| fallback_email.to_string());
        self.adopt_remote_user(&email, session.user.is_confirmed())?;
        Ok(email)
    }

    /// Pull the stored profile into the mirror if it is not there yet
    async fn hydrate_profile(&self, email: &str) {
        match self.mirror.user(email) {
            Ok(Some(user)) if user.profile.is_some() => return,
            Ok(_) => {}
            Err(e) => {
                warn!("Mirror read failed for {}: {}", email, e);
                return;
            }
        }
        match self.accounts.load_profile(email).await {
            Ok(Some(profile)) => {
                if let Err(e) = self
                    .mirror
                    .update_existing(email, |u| u.profile = Some(profile))
                {
                    warn!("Could not cache profile for {}: {}", email, e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Profile lookup failed for {}: {}", email, e),
        }
    }

    // -------------------------------------------------------------------------
    // Remote session reconciliation
    // -------------------------------------------------------------------------

    /// Check the hosted session and fold it into the mirror
    ///
    /// Without a remote session (or when the check fails) the mirror
    /// decides on its own.
    pub async fn sync_remote_session(&self) -> AuthResult<SessionState> {
        if let AuthMode::Hosted(remote) = &self.mode {
            match remote.get_session().await {
                Ok(Some(session)) => match session.user.email.as_deref() {
                    Some(email) => self.adopt_remote_user(email, session.user.is_confirmed())?,
                    None => debug!("Remote session has no email, keeping local state"),
                },
                Ok(None) => debug!("No remote session, gating on local state"),
                Err(e) => warn!("Remote session check failed: {}", e),
            }
        }
        self.gate()
    }

    /// Complete an auth redirect and return where to go
    ///
    /// Any failure to obtain a session routes to login.
    pub async fn handle_callback(&self, params: &CallbackParams) -> AuthResult<Route> {
        let AuthMode::Hosted(remote) = &self.mode else {
            return Ok(Route::Login);
        };

        if let Some(code) = params.code.as_deref() {
            if let Err(e) = remote
                .exchange_code(code, params.code_verifier.as_deref())
                .await
            {
                debug!("Code exchange failed, checking for an existing session: {}", e);
            }
        }

        let session = match remote.get_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return Ok(Route::Login),
            Err(e) => {
                warn!("Callback session lookup failed: {}", e);
                return Ok(Route::Login);
            }
        };
        let Some(email) = session.user.email.clone() else {
            return Ok(Route::Login);
        };

        self.adopt_remote_user(&email, session.user.is_confirmed())?;

        self.provision_defaults(&email).await;
        Ok(Route::Role)
    }

    /// Seed profile and notification settings when missing; failures are logged
    async fn provision_defaults(&self, email: &str) {
        let profile = async {
            if self.accounts.load_profile(email).await?.is_none() {
                self.accounts
                    .save_profile(email, json!({ "email": email }))
                    .await?;
            }
            Ok::<_, AuthError>(())
        };
        let notify = async {
            if self.accounts.load_notify(email).await?.is_none() {
                self.accounts.save_notify(email, default_notify()).await?;
            }
            Ok::<_, AuthError>(())
        };

        let (profile, notify) = tokio::join!(profile, notify);
        if let Err(e) = profile {
            warn!("Default profile for {} not provisioned: {}", email, e);
        }
        if let Err(e) = notify {
            warn!("Default notify settings for {} not provisioned: {}", email, e);
        }
    }

    /// Clear the local session, then the remote one
    ///
    /// Only a local failure is an error.
    pub async fn logout(&self) -> AuthResult<()> {
        let email = self.mirror.current_user()?;
        self.mirror.set_current_user(None)?;

        if let AuthMode::Hosted(remote) = &self.mode {
            if let Err(e) = remote.sign_out().await {
                warn!("Remote sign-out failed: {}", e);
            }
        }
        if let Some(email) = email {
            info!("Signed out {}", email);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Role and onboarding
    // -------------------------------------------------------------------------

    pub fn select_role(&self, role: Role) -> AuthResult<Route> {
        let email = self.require_current()?;
        self.mirror
            .update_existing(&email, |u| u.role = Some(role))?
            .ok_or(AuthError::UserNotFound)?;
        info!("{} selected role {}", email, role);

        Ok(match role {
            Role::Parent => Route::ParentOnboarding,
            Role::Provider => Route::ProviderOnboarding,
        })
    }

    pub async fn submit_parent_profile(&self, profile: Value) -> AuthResult<Route> {
        let email = self.require_current()?;
        let profile = prepare_parent_profile(profile)?;
        self.accounts.save_profile(&email, profile).await?;
        Ok(Route::ParentChildren)
    }

    pub async fn submit_children(&self, children: Vec<Value>) -> AuthResult<Route> {
        let email = self.require_current()?;
        let children: Vec<ChildRecord> = children
            .into_iter()
            .map(|c| normalize(ChildRecord::from_value(c)))
            .collect();
        self.accounts.save_children(&email, children).await?;
        Ok(Route::ParentDashboard)
    }

    /// Validate and merge one provider onboarding step
    ///
    /// The organisation step (no `services`) continues to the services
    /// step; the services step finishes onboarding.
    pub async fn submit_provider_profile(&self, fragment: Value) -> AuthResult<Route> {
        let email = self.require_current()?;
        let fragment = prepare_provider_profile(fragment)?;
        let finishes = fragment.get("services").is_some();
        self.accounts.merge_provider_profile(&email, fragment).await?;

        Ok(if finishes {
            Route::ProviderDashboard
        } else {
            Route::ProviderServices
        })
    }

    // -------------------------------------------------------------------------
    // Gating
    // -------------------------------------------------------------------------

    /// Current state from the mirror alone
    pub fn gate(&self) -> AuthResult<SessionState> {
        let Some(email) = self.mirror.current_user()? else {
            return Ok(SessionState::Anonymous);
        };
        Ok(SessionState::of(self.mirror.user(&email)?.as_ref()))
    }

    pub fn next_route(&self) -> AuthResult<Route> {
        Ok(next_route(self.gate()?))
    }

    // -------------------------------------------------------------------------
    // Local verify / reset tokens
    // -------------------------------------------------------------------------

    fn create_token(&self, kind: TokenKind, email: &str) -> AuthResult<String> {
        let token = generate_token();
        self.mirror.insert_token(kind, &token, email)?;
        Ok(token)
    }

    /// A token redeems once
    fn consume_token(&self, kind: TokenKind, token: &str) -> AuthResult<Option<String>> {
        self.mirror.take_token(kind, token)
    }

    fn local_only(&self) -> AuthResult<()> {
        if self.is_hosted() {
            return Err(AuthError::TokenFlowDelegated);
        }
        Ok(())
    }

    pub fn create_verify_token(&self, email: &str) -> AuthResult<String> {
        self.local_only()?;
        self.create_token(TokenKind::Verify, email)
    }

    pub fn consume_verify_token(&self, token: &str) -> AuthResult<Option<String>> {
        self.local_only()?;
        self.consume_token(TokenKind::Verify, token)
    }

    pub fn create_reset_token(&self, email: &str) -> AuthResult<String> {
        self.local_only()?;
        self.create_token(TokenKind::Reset, email)
    }

    pub fn consume_reset_token(&self, token: &str) -> AuthResult<Option<String>> {
        self.local_only()?;
        self.consume_token(TokenKind::Reset, token)
    }

    /// Redeem a verification link: mark verified, sign in, route onward
    pub fn verify_email(&self, token: &str) -> AuthResult<Route> {
        let email = self
            .consume_verify_token(token)?
            .ok_or(AuthError::InvalidToken)?;
        self.mirror.update_user(&email, |u| u.verified = true)?;
        self.mirror.set_current_user(Some(&email))?;
        info!("Verified {}", email);
        self.route_for(&email)
    }

    /// Start a password reset for a known local account
    pub fn forgot_password(&self, email: &str) -> AuthResult<String> {
        self.local_only()?;
        let email = required(email, "email")?;
        if self.mirror.user(&email)?.is_none() {
            return Err(AuthError::UserNotFound);
        }
        self.create_reset_token(&email)
    }

    /// Redeem a reset link and store the new password hash
    ///
    /// The token is spent even when the passwords do not match.
    pub fn reset_password(&self, token: &str, password: &str, confirm: &str) -> AuthResult<()> {
        let email = self
            .consume_reset_token(token)?
            .ok_or(AuthError::InvalidToken)?;
        if password != confirm {
            return Err(AuthError::PasswordMismatch);
        }
        let password = required(password, "password")?;
        let hash = hash_password(&password)?;
        self.mirror
            .update_existing(&email, |u| u.password_hash = Some(hash))?
            .ok_or(AuthError::UserNotFound)?;
        info!("Password reset for {}", email);
        Ok(())
    }
}
