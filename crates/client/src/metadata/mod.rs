//! Show metadata API client.
//!
//! Answers "which episodes of this show air next" for the reconciler.
//!
//! ### Specification
//!
//! - **Endpoint**: `GET {base_url}/tv/{show_id}?api_key=…` (TMDB-style)
//! - **Fields read**: `next_episode_to_air` and, when present, `upcoming_episodes`
//! - **Air dates**: `YYYY-MM-DD` is taken at the configured UTC air hour
//! - **Rate Limiting**: minimum interval between requests (token-free)

pub mod error;
pub mod response;

pub use error::MetadataError;
pub use response::{EpisodeResponse, ShowDetailsResponse, parse_air_date};

use async_trait::async_trait;
use reqwest::header;
use showbell_core::reconcile::ShowMetadataProvider;
use showbell_core::{AppConfig, EpisodeCandidate};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Default base URL for the metadata API.
pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "showbell/0.1";

/// Minimum interval between requests.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);

/// Metadata client configuration.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    /// UTC hour assumed for date-only air dates.
    pub air_hour_utc: u32,
    pub min_request_interval: Duration,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            air_hour_utc: 0,
            min_request_interval: MIN_REQUEST_INTERVAL,
        }
    }
}

impl MetadataConfig {
    /// Build from application configuration.
    ///
    /// Returns error if no API key is configured.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, MetadataError> {
        let api_key = config
            .require_metadata_api_key()
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(MetadataError::MissingApiKey)?
            .to_string();

        Ok(Self {
            api_key,
            base_url: config.metadata_base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            air_hour_utc: config.air_hour_utc,
            ..Default::default()
        })
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self { last_request: Mutex::new(None), min_interval }
    }

    /// Acquire permission to make a request, waiting if necessary.
    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Show metadata API client.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: reqwest::Client,
    config: MetadataConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl MetadataClient {
    /// Create a new metadata client with the given configuration.
    pub fn new(config: MetadataConfig) -> Result<Self, MetadataError> {
        if config.api_key.is_empty() {
            return Err(MetadataError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MetadataError::Network(Arc::new(e)))?;

        let rate_limiter = Arc::new(RateLimiter::new(config.min_request_interval));
        Ok(Self { http, config, rate_limiter })
    }

    /// Fetch the show details document.
    pub async fn show_details(&self, show_id: i64) -> Result<ShowDetailsResponse, MetadataError> {
        self.rate_limiter.acquire().await;

        let start = Instant::now();
        let url = format!("{}/tv/{}", self.config.base_url, show_id);

        tracing::debug!(show_id, "fetching show details");

        let http_response = self
            .http
            .get(&url)
            .query(&[("api_key", self.config.api_key.as_str())])
            .header("Accept", "application/json")
            .header(header::USER_AGENT, &self.config.user_agent)
            .send()
            .await?;

        let status = http_response.status();
        tracing::debug!(show_id, "metadata API response status: {}", status);

        if status == 401 || status == 403 {
            return Err(MetadataError::AuthError);
        }

        if status == 404 {
            return Err(MetadataError::NotFound(show_id));
        }

        if status == 429 {
            return Err(MetadataError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(MetadataError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await?;
        let details: ShowDetailsResponse =
            serde_json::from_slice(&bytes).map_err(|e| MetadataError::Parse(e.to_string()))?;

        tracing::debug!(show_id, "show details fetched in {:?}", start.elapsed());

        Ok(details)
    }

    /// Upcoming episodes of a show, normalized for the reconciler.
    pub async fn fetch_upcoming(&self, show_id: i64) -> Result<Vec<EpisodeCandidate>, MetadataError> {
        let details = self.show_details(show_id).await?;
        Ok(details.into_candidates(show_id, self.config.air_hour_utc))
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &MetadataConfig {
        &self.config
    }
}

#[async_trait]
impl ShowMetadataProvider for MetadataClient {
    async fn upcoming_episodes(&self, show_id: i64) -> Result<Vec<EpisodeCandidate>, showbell_core::Error> {
        Ok(self.fetch_upcoming(show_id).await?)
    }
}
