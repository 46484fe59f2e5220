//! # CareLink session bridge
//!
//! Client-side auth state for CareLink:
//! - Session store port (`store`) with memory and JSON-file backends
//! - Hosted auth port (`remote`) and its REST client (`hosted`)
//! - Account data port (`accounts`), local mirror or passthrough API
//! - Gating state machine, routing and local-fallback tokens (`bridge`)

pub mod accounts;
pub mod bridge;
pub mod error;
pub mod hosted;
pub mod password;
pub mod remote;
pub mod store;

pub use bridge::{AuthMode, CallbackParams, Route, SessionBridge, SessionState, SignUpOutcome};
pub use error::{AuthError, AuthResult};

use accounts::{AccountPort, LocalAccounts, RemoteAccounts};
use carelink_common::config::TomlConfig;
use hosted::HostedAuthClient;
use std::sync::Arc;
use store::{Mirror, SessionStore};
use tracing::info;

/// File name of the mirror inside the data directory
pub const SESSION_FILE: &str = "session.json";

/// Wire a bridge from configuration
///
/// Hosted auth is used when a URL and anon key are configured; account data
/// goes to the passthrough API when `session.accounts_url` is set.
pub fn build_bridge(config: &TomlConfig, store: Arc<dyn SessionStore>) -> AuthResult<SessionBridge> {
    let mirror = Mirror::new(store.clone());

    let mode = match config.hosted.auth_credentials() {
        Some((url, anon_key)) => {
            info!("Auth mode: hosted ({})", url);
            AuthMode::Hosted(Arc::new(HostedAuthClient::new(url, anon_key, store)?))
        }
        None => {
            info!("Auth mode: local fallback");
            AuthMode::Local
        }
    };

    let accounts_url = config
        .session
        .accounts_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty());
    let accounts: Arc<dyn AccountPort> = match accounts_url {
        Some(url) => {
            info!("Account data: passthrough API at {}", url);
            Arc::new(RemoteAccounts::new(url, mirror.clone())?)
        }
        None => Arc::new(LocalAccounts::new(mirror.clone())),
    };

    Ok(SessionBridge::new(mirror, mode, accounts).with_redirect(config.session.redirect_to.clone()))
}
