//! Bootstrap configuration loading and resolution
//!
//! Every service reads one small TOML file at startup. Resolution order:
//! 1. Explicit path (command-line `--config` or `CARELINK_CONFIG`)
//! 2. `~/.config/carelink/<module>.toml`
//! 3. Compiled defaults
//!
//! A missing or unparsable file never aborts startup: a warning is logged
//! and the compiled defaults are used instead. Hosted-service secrets can be
//! supplied (or overridden) through environment variables.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding `[hosted] url`
pub const ENV_HOSTED_URL: &str = "CARELINK_HOSTED_URL";
/// Environment variable overriding `[hosted] anon_key`
pub const ENV_HOSTED_ANON_KEY: &str = "CARELINK_HOSTED_ANON_KEY";
/// Environment variable overriding `[hosted] service_key`
pub const ENV_HOSTED_SERVICE_KEY: &str = "CARELINK_HOSTED_SERVICE_KEY";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Listen address; each binary supplies its own default port
    #[serde(default)]
    pub bind: Option<SocketAddr>,

    /// Directory for local state (SQLite store, session mirror)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub hosted: HostedConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error).
    /// `RUST_LOG` still wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Provider search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// CSV location: a file path or an http(s) URL
    #[serde(default)]
    pub csv_source: Option<String>,

    /// Providers per result page
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            csv_source: None,
            page_size: default_page_size(),
        }
    }
}

/// Session bridge settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Base URL of the account passthrough service. Account data stays in
    /// the local mirror when unset.
    #[serde(default)]
    pub accounts_url: Option<String>,

    /// Redirect target handed to the hosted auth service on sign-up
    #[serde(default)]
    pub redirect_to: Option<String>,
}

/// Hosted auth/store connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostedConfig {
    /// Base URL of the hosted project (e.g. `https://xyz.example.co`)
    #[serde(default)]
    pub url: Option<String>,

    /// Public key used by clients for the auth endpoints
    #[serde(default)]
    pub anon_key: Option<String>,

    /// Privileged key used by the passthrough API for table access
    #[serde(default)]
    pub service_key: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_page_size() -> i64 {
    20
}

impl HostedConfig {
    /// Overlay non-empty environment variables on top of the TOML values
    pub fn apply_env(&mut self) {
        if let Some(url) = non_empty_env(ENV_HOSTED_URL) {
            self.url = Some(url);
        }
        if let Some(key) = non_empty_env(ENV_HOSTED_ANON_KEY) {
            self.anon_key = Some(key);
        }
        if let Some(key) = non_empty_env(ENV_HOSTED_SERVICE_KEY) {
            self.service_key = Some(key);
        }
    }

    /// URL and service key, when both are present
    pub fn store_credentials(&self) -> Option<(&str, &str)> {
        match (non_empty(&self.url), non_empty(&self.service_key)) {
            (Some(url), Some(key)) => Some((url, key)),
            _ => None,
        }
    }

    /// URL and anon key, when both are present
    pub fn auth_credentials(&self) -> Option<(&str, &str)> {
        match (non_empty(&self.url), non_empty(&self.anon_key)) {
            (Some(url), Some(key)) => Some((url, key)),
            _ => None,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TomlConfig {
    /// Configured data directory or the platform default
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Configured listen address or the module's default
    pub fn bind_or(&self, default: SocketAddr) -> SocketAddr {
        self.bind.unwrap_or(default)
    }
}

/// OS-dependent default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("carelink"))
        .unwrap_or_else(|| PathBuf::from("./carelink_data"))
}

/// Parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Where the resolved configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// No file found; compiled defaults
    Defaults,
    /// A file was found but could not be used; compiled defaults
    Fallback(String),
}

/// Resolution result
///
/// The tracing level is itself a config value, so resolution does not log.
/// Binaries call [`ResolvedConfig::log_source`] once tracing is up.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: TomlConfig,
    pub source: ConfigSource,
}

impl ResolvedConfig {
    pub fn log_source(&self) {
        match &self.source {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Defaults => info!("No configuration file found; using compiled defaults"),
            ConfigSource::Fallback(reason) => warn!("{}; using compiled defaults", reason),
        }
    }
}

/// Resolves the bootstrap configuration for one module
pub struct ConfigResolver {
    module_name: String,
    explicit_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            explicit_path: None,
        }
    }

    /// Use an explicit config path (highest priority)
    pub fn with_path(mut self, path: Option<PathBuf>) -> Self {
        self.explicit_path = path;
        self
    }

    /// Per-user config file location for this module
    pub fn user_config_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|d| {
            d.join("carelink")
                .join(format!("{}.toml", self.module_name))
        })
    }

    /// First config file that should be read, if any
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit_path {
            return Some(path.clone());
        }
        self.user_config_path().filter(|p| p.exists())
    }

    /// Load configuration, falling back to defaults on any failure
    pub fn resolve(&self) -> ResolvedConfig {
        let (mut config, source) = match self.config_path() {
            Some(path) => match load_toml_config(&path) {
                Ok(config) => (config, ConfigSource::File(path)),
                Err(e) => (TomlConfig::default(), ConfigSource::Fallback(e.to_string())),
            },
            None => (TomlConfig::default(), ConfigSource::Defaults),
        };

        config.hosted.apply_env();
        ResolvedConfig { config, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.search.page_size, 20);
        assert!(config.search.csv_source.is_none());
        assert!(config.hosted.store_credentials().is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            bind = "127.0.0.1:9000"

            [search]
            csv_source = "data/childcare_results.csv"
            "#,
        )
        .unwrap();

        assert_eq!(config.bind, Some("127.0.0.1:9000".parse().unwrap()));
        assert_eq!(config.search.page_size, 20);
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.search.csv_source.as_deref(),
            Some("data/childcare_results.csv")
        );
    }

    #[test]
    fn test_credentials_require_both_parts() {
        let hosted = HostedConfig {
            url: Some("https://project.example.co".to_string()),
            anon_key: Some("   ".to_string()),
            service_key: Some("service".to_string()),
        };
        assert_eq!(
            hosted.store_credentials(),
            Some(("https://project.example.co", "service"))
        );
        assert!(hosted.auth_credentials().is_none());
    }
}
