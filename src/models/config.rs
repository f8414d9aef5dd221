//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Environment variable overriding `feed.url`.
pub const ENV_FEED_URL: &str = "COUPON_FEED_URL";
/// Environment variable overriding `storage.dir`.
pub const ENV_CACHE_DIR: &str = "COUPON_FEED_CACHE_DIR";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote feed and retry behavior
    #[serde(default)]
    pub feed: FeedConfig,

    /// Refresh cadence and staleness gate
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Local cache location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Spreadsheet header names used by the card view
    #[serde(default)]
    pub fields: FieldNames,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply environment overrides on top of the file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_FEED_URL) {
            if !url.trim().is_empty() {
                self.feed.url = url.trim().to_string();
            }
        }
        if let Ok(dir) = std::env::var(ENV_CACHE_DIR) {
            if !dir.trim().is_empty() {
                self.storage.dir = PathBuf::from(dir.trim());
            }
        }
        self
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.feed.url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::validation(format!(
                "feed.url must be http(s), got '{}'",
                url.scheme()
            )));
        }
        if self.feed.user_agent.trim().is_empty() {
            return Err(AppError::validation("feed.user_agent is empty"));
        }
        if self.feed.timeout_secs == 0 {
            return Err(AppError::validation("feed.timeout_secs must be > 0"));
        }
        if self.refresh.update_interval_ms == 0 {
            return Err(AppError::validation(
                "refresh.update_interval_ms must be > 0",
            ));
        }
        let key = self.storage.cache_key.trim();
        if key.is_empty() {
            return Err(AppError::validation("storage.cache_key is empty"));
        }
        if key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(AppError::validation(format!(
                "storage.cache_key '{}' must be a plain file name",
                key
            )));
        }
        Ok(())
    }
}

/// Backoff strategy between fetch attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay before every retry
    #[default]
    Constant,
    /// Delay doubles per retry, capped at `max_backoff_ms`
    Exponential,
}

/// Remote feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Published spreadsheet CSV URL
    #[serde(default = "defaults::feed_url")]
    pub url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Retries after the first attempt
    #[serde(default = "defaults::max_retries")]
    pub max_retries: usize,

    /// Delay before a retry in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,

    #[serde(default)]
    pub backoff: BackoffKind,

    /// Upper bound for exponential backoff in milliseconds
    #[serde(default = "defaults::max_backoff")]
    pub max_backoff_ms: u64,
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: defaults::feed_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            retry_delay_ms: defaults::retry_delay(),
            backoff: BackoffKind::default(),
            max_backoff_ms: defaults::max_backoff(),
        }
    }
}

/// Refresh cadence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Interval between scheduled refreshes in milliseconds
    #[serde(default = "defaults::update_interval")]
    pub update_interval_ms: u64,

    /// Maximum age of the in-memory snapshot before a refresh hits the network.
    ///
    /// Defaults to 30 minutes.
    #[serde(default = "defaults::cache_duration")]
    pub cache_duration_ms: u64,

    /// Interval of the cache-state log line in milliseconds (0 disables it)
    #[serde(default = "defaults::status_interval")]
    pub status_interval_ms: u64,
}

impl RefreshConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn cache_duration(&self) -> Duration {
        Duration::from_millis(self.cache_duration_ms)
    }

    pub fn status_interval(&self) -> Option<Duration> {
        (self.status_interval_ms > 0).then(|| Duration::from_millis(self.status_interval_ms))
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: defaults::update_interval(),
            cache_duration_ms: defaults::cache_duration(),
            status_interval_ms: defaults::status_interval(),
        }
    }
}

/// Local cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the cache file
    #[serde(default = "defaults::storage_dir")]
    pub dir: PathBuf,

    /// Cache key; the entry lives at `{dir}/{cache_key}.json`
    #[serde(default = "defaults::cache_key")]
    pub cache_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: defaults::storage_dir(),
            cache_key: defaults::cache_key(),
        }
    }
}

/// Header names of the fields shown on a coupon card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldNames {
    #[serde(default = "defaults::field_store")]
    pub store: String,
    #[serde(default = "defaults::field_discount")]
    pub discount: String,
    #[serde(default = "defaults::field_category")]
    pub category: String,
    #[serde(default = "defaults::field_validity")]
    pub validity: String,
    #[serde(default = "defaults::field_code")]
    pub code: String,
    #[serde(default = "defaults::field_link")]
    pub link: String,

    /// Shown when the validity field is empty
    #[serde(default = "defaults::validity_fallback")]
    pub validity_fallback: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            store: defaults::field_store(),
            discount: defaults::field_discount(),
            category: defaults::field_category(),
            validity: defaults::field_validity(),
            code: defaults::field_code(),
            link: defaults::field_link(),
            validity_fallback: defaults::validity_fallback(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Feed defaults
    pub fn feed_url() -> String {
        "https://docs.google.com/spreadsheets/d/e/2PACX-1vTCh8ynrVLz-2ir_EJI8YP4b1_jozi5tx-vD39JK7IS33Z-zJlsSiY2QkqSnfMfd1Bh-ouBIvFaOogf/pub?output=csv".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; coupon-feed/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_retries() -> usize {
        3
    }
    pub fn retry_delay() -> u64 {
        1_000
    }
    pub fn max_backoff() -> u64 {
        30_000
    }

    // Refresh defaults
    pub fn update_interval() -> u64 {
        30_000
    }
    pub fn cache_duration() -> u64 {
        30 * 60 * 1_000
    }
    pub fn status_interval() -> u64 {
        10_000
    }

    // Storage defaults
    pub fn storage_dir() -> PathBuf {
        PathBuf::from("storage")
    }
    pub fn cache_key() -> String {
        "cuponsCache".into()
    }

    // Spreadsheet headers
    pub fn field_store() -> String {
        "nome da loja".into()
    }
    pub fn field_discount() -> String {
        "Desconto".into()
    }
    pub fn field_category() -> String {
        "Categoria".into()
    }
    pub fn field_validity() -> String {
        "Validade".into()
    }
    pub fn field_code() -> String {
        "cupom".into()
    }
    pub fn field_link() -> String {
        "Link".into()
    }
    pub fn validity_fallback() -> String {
        "Limitado".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
