//! Provider catalog
//!
//! Holds the currently published provider list. Loads may overlap (startup
//! load plus a reload request, or two reloads); each load takes a sequence
//! number when it starts and a result is only published if no newer load
//! has been published already. Favorites live on the published records and
//! are lost on reload because ids are only stable within one load.

use crate::ingest::parse_csv;
use crate::mapper::{map_rows, ProviderRecord};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("carelink-search/", env!("CARGO_PKG_VERSION"));
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// CSV load failures
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Read {path} failed: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0} fetching {1}")]
    Status(u16, String),
}

/// Where the provider CSV comes from
#[derive(Debug, Clone, PartialEq)]
pub enum CsvSource {
    File(PathBuf),
    Url(String),
}

impl CsvSource {
    /// `http://` and `https://` locations are URLs, anything else a path
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            CsvSource::Url(location.to_string())
        } else {
            CsvSource::File(PathBuf::from(location))
        }
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<String, CatalogError> {
        match self {
            CsvSource::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| CatalogError::Read {
                        path: path.clone(),
                        source,
                    })
            }
            CsvSource::Url(url) => {
                let response = http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| CatalogError::Network(e.to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(CatalogError::Status(status.as_u16(), url.clone()));
                }

                response
                    .text()
                    .await
                    .map_err(|e| CatalogError::Network(e.to_string()))
            }
        }
    }
}

impl std::fmt::Display for CsvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CsvSource::File(path) => write!(f, "{}", path.display()),
            CsvSource::Url(url) => f.write_str(url),
        }
    }
}

/// One published load
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Sequence number of the load that produced this list (0 = nothing yet)
    pub seq: u64,
    pub providers: Vec<ProviderRecord>,
    pub loaded_at: Option<DateTime<Utc>>,
}

pub struct ProviderCatalog {
    source: CsvSource,
    http: reqwest::Client,
    snapshot: RwLock<Snapshot>,
    next_seq: AtomicU64,
}

impl ProviderCatalog {
    pub fn new(source: CsvSource) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Ok(Self {
            source,
            http,
            snapshot: RwLock::new(Snapshot::default()),
            next_seq: AtomicU64::new(0),
        })
    }

    pub fn source(&self) -> &CsvSource {
        &self.source
    }

    /// Reserve the sequence number for a load that is starting now
    pub fn begin_load(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish a finished load unless a newer one is already published
    ///
    /// Returns whether the list was published.
    pub async fn publish(&self, seq: u64, providers: Vec<ProviderRecord>) -> bool {
        let mut snapshot = self.snapshot.write().await;
        if seq <= snapshot.seq {
            debug!(
                "Discarding stale provider load #{} (published #{})",
                seq, snapshot.seq
            );
            return false;
        }

        snapshot.seq = seq;
        snapshot.providers = providers;
        snapshot.loaded_at = Some(Utc::now());
        true
    }

    /// Re-read the CSV source and publish the result
    ///
    /// A failed fetch publishes an empty list. Returns the number of
    /// providers published, or `None` when a newer load won.
    pub async fn reload(&self) -> Option<usize> {
        let seq = self.begin_load();

        let providers = match self.source.fetch(&self.http).await {
            Ok(text) => map_rows(&parse_csv(&text)),
            Err(e) => {
                warn!("Provider CSV load from {} failed: {}", self.source, e);
                Vec::new()
            }
        };

        let count = providers.len();
        if self.publish(seq, providers).await {
            info!("Loaded {} providers from {} (load #{})", count, self.source, seq);
            Some(count)
        } else {
            None
        }
    }

    /// Read access to the published snapshot
    pub async fn snapshot(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.snapshot.read().await
    }

    pub async fn get(&self, id: u32) -> Option<ProviderRecord> {
        self.snapshot
            .read()
            .await
            .providers
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    /// Flip the favorite flag; returns the updated record
    pub async fn toggle_favorite(&self, id: u32) -> Option<ProviderRecord> {
        let mut snapshot = self.snapshot.write().await;
        let provider = snapshot.providers.iter_mut().find(|p| p.id == id)?;
        provider.is_favorite = !provider.is_favorite;
        Some(provider.clone())
    }
}
