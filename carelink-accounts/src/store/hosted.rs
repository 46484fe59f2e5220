//! Hosted document store (PostgREST-style REST API)
//!
//! Each collection is a table `(email text primary key, data jsonb)` reached
//! at `<url>/rest/v1/<table>`. Writes are upserts on `email`.

use async_trait::async_trait;
use carelink_common::{Collection, DocumentStore, Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct HostedDocumentStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

#[derive(Debug, Deserialize)]
struct DataRow {
    #[serde(default)]
    data: Value,
}

impl HostedDocumentStore {
    pub fn new(base_url: &str, service_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Remote(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    fn table_url(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.table_name())
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(Error::Remote(format!("{} failed: {} - {}", action, status, text)))
    }
}

#[async_trait]
impl DocumentStore for HostedDocumentStore {
    async fn get(&self, collection: Collection, email: &str) -> Result<Option<Value>> {
        let filter = format!("eq.{}", email);
        let request = self
            .client
            .get(self.table_url(collection))
            .query(&[("select", "data"), ("email", filter.as_str())]);

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| Error::Remote(e.to_string()))?;
        let response = Self::check(response, &format!("Read {}", collection)).await?;

        let rows: Vec<DataRow> = response
            .json()
            .await
            .map_err(|e| Error::Remote(format!("Invalid {} response: {}", collection, e)))?;

        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.data)
            .filter(|data| !data.is_null()))
    }

    async fn put(&self, collection: Collection, email: &str, document: Value) -> Result<()> {
        debug!("Upserting {} for {}", collection, email);

        let request = self
            .client
            .post(self.table_url(collection))
            .query(&[("on_conflict", "email")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&json!([{ "email": email, "data": document }]));

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| Error::Remote(e.to_string()))?;
        Self::check(response, &format!("Upsert {}", collection)).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let request = self
            .client
            .get(self.table_url(Collection::Profiles))
            .query(&[("select", "email"), ("limit", "1")]);

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| Error::Remote(e.to_string()))?;
        Self::check(response, "Ping").await?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "hosted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url_trims_trailing_slash() {
        let store = HostedDocumentStore::new("https://project.example.co/", "key").unwrap();
        assert_eq!(
            store.table_url(Collection::ProviderProfiles),
            "https://project.example.co/rest/v1/provider_profiles"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_remote_error() {
        let store = HostedDocumentStore::new("http://127.0.0.1:9", "key").unwrap();
        match store.ping().await {
            Err(Error::Remote(_)) => {}
            other => panic!("expected remote error, got {:?}", other),
        }
    }
}
