//! Configuration validation rules.
//!
//! Validation runs after loading and again after CLI overrides, so a bad
//! value is rejected before any history is read or network touched.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `concurrency` is 0 or exceeds 64
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `days_back` or `cache_max_age_hours` is not positive
    /// - `context_window` is 0
    /// - the text length bounds are inverted
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(invalid("concurrency", "must be at least 1"));
        }
        if self.concurrency > 64 {
            return Err(invalid("concurrency", "must not exceed 64"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.days_back < 1 {
            return Err(invalid("days_back", "must be at least 1"));
        }
        if self.cache_max_age_hours < 1 {
            return Err(invalid("cache_max_age_hours", "must be at least 1"));
        }

        if self.context_window == 0 {
            return Err(invalid("context_window", "must be at least 1"));
        }

        if self.min_text_length >= self.max_text_length {
            return Err(invalid("min_text_length", "must be below max_text_length"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}
