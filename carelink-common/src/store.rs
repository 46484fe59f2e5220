//! Document store port
//!
//! The passthrough API keeps one JSON document per (collection, email).
//! Writes replace the whole document; there is no partial update.
//! Implementations live with the service that selects them at startup.

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Stored document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Profiles,
    Children,
    ProviderProfiles,
    NotifySettings,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Profiles,
        Collection::Children,
        Collection::ProviderProfiles,
        Collection::NotifySettings,
    ];

    /// Backing table name
    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Profiles => "profiles",
            Collection::Children => "children",
            Collection::ProviderProfiles => "provider_profiles",
            Collection::NotifySettings => "notify_settings",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Whole-document storage keyed by email
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Current document, or `None` when nothing is stored
    async fn get(&self, collection: Collection, email: &str) -> Result<Option<Value>>;

    /// Replace the stored document
    async fn put(&self, collection: Collection, email: &str, document: Value) -> Result<()>;

    /// Cheap reachability check
    async fn ping(&self) -> Result<()>;

    /// Short name for logs and health output
    fn kind(&self) -> &'static str;
}
