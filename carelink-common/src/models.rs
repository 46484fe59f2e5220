//! Account records shared by the session bridge and the services

use crate::children::ChildRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Account role chosen after verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(alias = "parent")]
    Parent,
    #[serde(alias = "provider")]
    Provider,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "Parent",
            Role::Provider => "Provider",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parent" => Ok(Role::Parent),
            "provider" => Ok(Role::Provider),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown role '{}' (expected Parent or Provider)",
                other
            ))),
        }
    }
}

/// Locally mirrored identity, one per email
///
/// The hosted auth service is authoritative once reachable. The password
/// hash only exists for accounts created through the local fallback path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    #[serde(default)]
    pub verified: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ChildRecord>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_profile: Option<Value>,

    /// Notification preferences, only kept here without an account service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<Value>,
}

impl UserRecord {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            password_hash: None,
            verified: false,
            role: None,
            profile: None,
            children: None,
            provider_profile: None,
            notify: None,
        }
    }
}
