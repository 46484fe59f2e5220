//! Document store selection
//!
//! The store is chosen once at startup: the hosted REST store when a hosted
//! URL and service key are configured, otherwise SQLite under the data
//! directory. Handlers only ever see `Arc<dyn DocumentStore>`.

pub mod hosted;
pub mod sqlite;

pub use hosted::HostedDocumentStore;
pub use sqlite::SqliteDocumentStore;

use carelink_common::config::TomlConfig;
use carelink_common::{DocumentStore, Result};
use std::sync::Arc;
use tracing::info;

/// Build the document store described by `config`
pub async fn select_store(config: &TomlConfig) -> Result<Arc<dyn DocumentStore>> {
    if let Some((url, key)) = config.hosted.store_credentials() {
        info!("Using hosted document store at {}", url);
        return Ok(Arc::new(HostedDocumentStore::new(url, key)?));
    }

    let db_path = config.data_dir().join(sqlite::DATABASE_FILE);
    info!("Using local document store at {}", db_path.display());
    Ok(Arc::new(SqliteDocumentStore::open(&db_path).await?))
}
