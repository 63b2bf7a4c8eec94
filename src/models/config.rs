//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Largest page the timeline endpoint returns in a single request.
pub const MAX_BACKFILL_COUNT: usize = 200;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Upstream status source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Document store settings and persisted layout
    #[serde(default)]
    pub store: StoreConfig,

    /// Startup backfill
    #[serde(default)]
    pub backfill: BackfillConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.source.api_url)
            .map_err(|e| AppError::validation(format!("source.api_url: {e}")))?;
        Url::parse(&self.source.stream_url)
            .map_err(|e| AppError::validation(format!("source.stream_url: {e}")))?;
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        if self.store.backend == StoreBackend::Elasticsearch {
            Url::parse(&self.store.url)
                .map_err(|e| AppError::validation(format!("store.url: {e}")))?;
        }
        if self.store.partition_prefix.is_empty() {
            return Err(AppError::validation("store.partition_prefix is empty"));
        }
        if self.store.partition_date_format.is_empty() {
            return Err(AppError::validation("store.partition_date_format is empty"));
        }
        if self.store.kind.trim().is_empty() {
            return Err(AppError::validation("store.kind is empty"));
        }
        if self.backfill.count == 0 || self.backfill.count > MAX_BACKFILL_COUNT {
            return Err(AppError::validation(format!(
                "backfill.count must be within 1..={MAX_BACKFILL_COUNT}"
            )));
        }
        Ok(())
    }
}

/// Status source (API and user stream) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the REST API, with trailing slash
    #[serde(default = "defaults::api_url")]
    pub api_url: String,

    /// URL of the newline-delimited user stream
    #[serde(default = "defaults::stream_url")]
    pub stream_url: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Timeout for lookups and backfill, and connect timeout for the stream
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::api_url(),
            stream_url: defaults::stream_url(),
            bearer_token: None,
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Which document store implementation to use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Elasticsearch,
    Local,
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Elasticsearch base URL
    #[serde(default = "defaults::store_url")]
    pub url: String,

    /// Root directory for the local backend
    #[serde(default = "defaults::root_dir")]
    pub root_dir: PathBuf,

    /// Partition name prefix, followed by the formatted date
    #[serde(default = "defaults::partition_prefix")]
    pub partition_prefix: String,

    /// `chrono` format of the date part of partition names
    #[serde(default = "defaults::partition_date_format")]
    pub partition_date_format: String,

    /// Document kind
    #[serde(default = "defaults::kind")]
    pub kind: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: defaults::store_url(),
            root_dir: defaults::root_dir(),
            partition_prefix: defaults::partition_prefix(),
            partition_date_format: defaults::partition_date_format(),
            kind: defaults::kind(),
        }
    }
}

/// Startup backfill settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillConfig {
    /// Backfill posts newer than this id; 0 disables backfill
    #[serde(default)]
    pub since_id: u64,

    /// Maximum posts to backfill
    #[serde(default = "defaults::backfill_count")]
    pub count: usize,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            since_id: 0,
            count: defaults::backfill_count(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level filter when RUST_LOG is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Append logs to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            file: None,
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Source defaults
    pub fn api_url() -> String {
        "https://api.twitter.com/1.1/".into()
    }
    pub fn stream_url() -> String {
        "https://userstream.twitter.com/1.1/user.json".into()
    }
    pub fn user_agent() -> String {
        concat!("tweet-indexer/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Store defaults
    pub fn store_url() -> String {
        "http://localhost:9200/".into()
    }
    pub fn root_dir() -> PathBuf {
        PathBuf::from("storage")
    }
    pub fn partition_prefix() -> String {
        "twitter-".into()
    }
    pub fn partition_date_format() -> String {
        "%Y.%m.%d".into()
    }
    pub fn kind() -> String {
        "tweet".into()
    }

    // Backfill defaults
    pub fn backfill_count() -> usize {
        super::MAX_BACKFILL_COUNT
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
