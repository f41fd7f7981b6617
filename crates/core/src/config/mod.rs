//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHOWBELL_*)
//! 2. TOML config file (if SHOWBELL_CONFIG_FILE set)
//! 3. Built-in defaults

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
/// 1. Environment variables (SHOWBELL_*)
/// 2. TOML config file (if SHOWBELL_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite store.
    ///
    /// Set via SHOWBELL_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds, applied to every network call.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Upper bound on one show's metadata lookup during a reconciliation pass.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Maximum bytes to read per fetched response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Cache generation tag. Bumping it makes activation drop every older generation.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin of the host app; same-origin requests are static assets.
    #[serde(default = "default_app_origin")]
    pub app_origin: String,

    /// Hosts served with stale-while-revalidate.
    ///
    /// Set via SHOWBELL_IMAGE_HOSTS environment variable (comma-separated in TOML arrays).
    #[serde(default = "default_image_hosts")]
    pub image_hosts: Vec<String>,

    /// Hosts served network-first.
    #[serde(default = "default_api_hosts")]
    pub api_hosts: Vec<String>,

    /// Same-origin path prefix that is also treated as API traffic.
    #[serde(default = "default_api_path_prefix")]
    pub api_path_prefix: String,

    /// App-shell URLs cached on install.
    #[serde(default)]
    pub precache_urls: Vec<String>,

    /// Image served when an image is neither cached nor reachable.
    #[serde(default)]
    pub offline_image_url: Option<String>,

    /// Icon used when a show has no poster.
    #[serde(default = "default_icon")]
    pub default_icon: String,

    /// Seconds between periodic reconciliation passes.
    #[serde(default = "default_recheck_interval_secs")]
    pub recheck_interval_secs: u64,

    /// Base URL of the show metadata API.
    #[serde(default = "default_metadata_base_url")]
    pub metadata_base_url: String,

    /// Show metadata API key.
    ///
    /// Set via SHOWBELL_METADATA_API_KEY environment variable.
    #[serde(default)]
    pub metadata_api_key: Option<String>,

    /// Hour of day (UTC) assumed for air dates that carry no time.
    #[serde(default)]
    pub air_hour_utc: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./showbell.sqlite")
}

fn default_user_agent() -> String {
    "showbell/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_provider_timeout_ms() -> u64 {
    15_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_app_origin() -> String {
    "http://localhost:3000".into()
}

fn default_image_hosts() -> Vec<String> {
    vec!["image.tmdb.org".into()]
}

fn default_api_hosts() -> Vec<String> {
    vec!["api.themoviedb.org".into()]
}

fn default_api_path_prefix() -> String {
    "/api/".into()
}

fn default_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_recheck_interval_secs() -> u64 {
    3_600
}

fn default_metadata_base_url() -> String {
    "https://api.themoviedb.org/3".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            provider_timeout_ms: default_provider_timeout_ms(),
            max_bytes: default_max_bytes(),
            cache_version: default_cache_version(),
            app_origin: default_app_origin(),
            image_hosts: default_image_hosts(),
            api_hosts: default_api_hosts(),
            api_path_prefix: default_api_path_prefix(),
            precache_urls: Vec::new(),
            offline_image_url: None,
            default_icon: default_icon(),
            recheck_interval_secs: default_recheck_interval_secs(),
            metadata_base_url: default_metadata_base_url(),
            metadata_api_key: None,
            air_hour_utc: 0,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn recheck_interval(&self) -> Duration {
        Duration::from_secs(self.recheck_interval_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHOWBELL_`
    /// 2. TOML file from `SHOWBELL_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHOWBELL_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHOWBELL_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Metadata API key, required before the reconciler can reach the provider.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is not set.
    pub fn require_metadata_api_key(&self) -> Result<&str, ConfigError> {
        self.metadata_api_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "metadata_api_key".into(),
            hint: "Set SHOWBELL_METADATA_API_KEY environment variable".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./showbell.sqlite"));
        assert_eq!(config.user_agent, "showbell/0.1");
        assert_eq!(config.cache_version, "v1");
        assert_eq!(config.image_hosts, vec!["image.tmdb.org".to_string()]);
        assert_eq!(config.api_path_prefix, "/api/");
        assert!(config.precache_urls.is_empty());
        assert!(config.metadata_api_key.is_none());
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(10_000));
        assert_eq!(config.provider_timeout(), Duration::from_millis(15_000));
        assert_eq!(config.recheck_interval(), Duration::from_secs(3_600));
    }

    #[test]
    fn test_require_metadata_api_key_missing() {
        let config = AppConfig::default();
        let result = config.require_metadata_api_key();
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_metadata_api_key_present() {
        let config = AppConfig { metadata_api_key: Some("test-key".into()), ..Default::default() };
        assert_eq!(config.require_metadata_api_key().unwrap(), "test-key");
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(
                r#"
                cache_version = "v7"
                recheck_interval_secs = 900
                image_hosts = ["img.example.com", "cdn.example.com"]
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(config.cache_version, "v7");
        assert_eq!(config.recheck_interval_secs, 900);
        assert_eq!(config.image_hosts.len(), 2);
        assert_eq!(config.timeout_ms, 10_000);
    }
}
