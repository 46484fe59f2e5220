//! Local document store backed by SQLite
//!
//! One table per collection: `(email TEXT PRIMARY KEY, data TEXT, updated_at TEXT)`.
//! Documents are stored as JSON text.

use async_trait::async_trait;
use carelink_common::{Collection, DocumentStore, Error, Result};
use chrono::Utc;
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "carelink.db";

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Open (creating if needed) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        if newly_created {
            info!("Initialized new database: {}", db_path.display());
        } else {
            info!("Opened existing database: {}", db_path.display());
        }

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the collection tables if missing
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        for collection in Collection::ALL {
            create_collection_table(&pool, collection).await?;
        }
        Ok(Self { pool })
    }
}

async fn create_collection_table(pool: &SqlitePool, collection: Collection) -> Result<()> {
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (
            email TEXT PRIMARY KEY NOT NULL,
            data TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        collection.table_name()
    );
    sqlx::query(&sql).execute(pool).await?;
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: Collection, email: &str) -> Result<Option<Value>> {
        let sql = format!("SELECT data FROM {} WHERE email = ?", collection.table_name());
        let data: Option<String> = sqlx::query_scalar(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        match data {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, collection: Collection, email: &str, document: Value) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (email, data, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(email) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            collection.table_name()
        );
        sqlx::query(&sql)
            .bind(email)
            .bind(serde_json::to_string(&document)?)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        if one == 1 {
            Ok(())
        } else {
            Err(Error::Internal("unexpected ping result".to_string()))
        }
    }

    fn kind(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn memory_store() -> SqliteDocumentStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteDocumentStore::from_pool(pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = memory_store().await;
        assert!(store
            .get(Collection::Profiles, "nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_whole_document() {
        let store = memory_store().await;
        let email = "ana@example.com";

        store
            .put(Collection::Profiles, email, json!({"firstName": "Ana", "phone": "+12045550123"}))
            .await
            .unwrap();
        store
            .put(Collection::Profiles, email, json!({"firstName": "Ana M."}))
            .await
            .unwrap();

        let doc = store.get(Collection::Profiles, email).await.unwrap().unwrap();
        assert_eq!(doc, json!({"firstName": "Ana M."}));
    }

    #[tokio::test]
    async fn test_collections_are_separate() {
        let store = memory_store().await;
        let email = "sam@example.com";
        store
            .put(Collection::NotifySettings, email, json!({"applicationUpdates": true}))
            .await
            .unwrap();

        assert!(store.get(Collection::Profiles, email).await.unwrap().is_none());
        assert!(store
            .get(Collection::NotifySettings, email)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DATABASE_FILE);

        let store = SqliteDocumentStore::open(&path).await.unwrap();
        store
            .put(Collection::Children, "p@example.com", json!([{"name": "Leo"}]))
            .await
            .unwrap();
        store.ping().await.unwrap();
        drop(store);

        let reopened = SqliteDocumentStore::open(&path).await.unwrap();
        let doc = reopened
            .get(Collection::Children, "p@example.com")
            .await
            .unwrap();
        assert_eq!(doc, Some(json!([{"name": "Leo"}])));
    }
}
