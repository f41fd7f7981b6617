//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` or `provider_timeout_ms` is under 100ms or over 5 minutes
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `recheck_interval_secs` is under a minute
    /// - `cache_version` is empty or not `[A-Za-z0-9._-]`
    /// - `app_origin` is not an http(s) origin
    /// - `air_hour_utc` is not a valid hour
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("timeout_ms", self.timeout_ms), ("provider_timeout_ms", self.provider_timeout_ms)] {
            if value < 100 {
                return Err(invalid(field, "must be at least 100ms"));
            }
            if value > 300_000 {
                return Err(invalid(field, "must not exceed 5 minutes (300000ms)"));
            }
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.recheck_interval_secs < 60 {
            return Err(invalid("recheck_interval_secs", "must be at least 60 seconds"));
        }

        if self.cache_version.is_empty()
            || !self
                .cache_version
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(invalid("cache_version", "must be non-empty and contain only [A-Za-z0-9._-]"));
        }

        if !(self.app_origin.starts_with("http://") || self.app_origin.starts_with("https://")) {
            return Err(invalid("app_origin", "must be an http:// or https:// origin"));
        }

        if self.air_hour_utc > 23 {
            return Err(invalid("air_hour_utc", "must be between 0 and 23"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.provider_timeout_ms < self.timeout_ms {
            tracing::warn!(
                provider_timeout_ms = self.provider_timeout_ms,
                timeout_ms = self.timeout_ms,
                "provider_timeout_ms is shorter than the HTTP timeout; \
                 slow metadata lookups will be cut off by the provider bound"
            );
        }

        Ok(())
    }
}
