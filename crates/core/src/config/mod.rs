//! Application configuration with layered loading.
//!
//! Configuration is assembled with figment from multiple sources:
//!
//! 1. Environment variables (WEBTRAIL_*)
//! 2. TOML config file (if WEBTRAIL_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The CLI layer applies its flag overrides on top of the loaded value
//! and re-validates before any work starts.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (WEBTRAIL_*)
/// 2. TOML config file (if WEBTRAIL_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite page cache.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes accepted per response body.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum simultaneous in-flight fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Delay between dispatching new requests, in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// How many days of history to search.
    #[serde(default = "default_days_back")]
    pub days_back: i64,

    /// Cache entries older than this are re-fetched.
    #[serde(default = "default_cache_max_age_hours")]
    pub cache_max_age_hours: i64,

    /// Characters of context captured on each side of a match.
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Extracted text shorter than this is discarded.
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,

    /// Extracted text is hard-truncated to this many characters.
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./webtrail-cache.sqlite")
}

fn default_user_agent() -> String {
    "webtrail/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_concurrency() -> usize {
    4
}

fn default_pacing_ms() -> u64 {
    250
}

fn default_days_back() -> i64 {
    7
}

fn default_cache_max_age_hours() -> i64 {
    24
}

fn default_context_window() -> usize {
    100
}

fn default_min_text_length() -> usize {
    50
}

fn default_max_text_length() -> usize {
    10_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            concurrency: default_concurrency(),
            pacing_ms: default_pacing_ms(),
            days_back: default_days_back(),
            cache_max_age_hours: default_cache_max_age_hours(),
            context_window: default_context_window(),
            min_text_length: default_min_text_length(),
            max_text_length: default_max_text_length(),
        }
    }
}

impl AppConfig {
    /// Request timeout as a Duration for reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Pacing delay between request dispatches.
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Cache freshness horizon.
    pub fn cache_max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cache_max_age_hours)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, a value cannot
    /// be parsed, or validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("WEBTRAIL_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("WEBTRAIL_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
