//! Show metadata client error types.

use std::sync::Arc;

/// Errors from the show metadata API client.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// No API key configured.
    #[error("missing API key: SHOWBELL_METADATA_API_KEY not set")]
    MissingApiKey,

    /// Authentication failed (invalid API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// The provider does not know the show.
    #[error("show {0} not found")]
    NotFound(i64),

    /// Rate limited by the provider.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for MetadataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { MetadataError::Timeout } else { MetadataError::Network(Arc::new(err)) }
    }
}

impl From<MetadataError> for showbell_core::Error {
    fn from(err: MetadataError) -> Self {
        showbell_core::Error::Provider(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert!(MetadataError::MissingApiKey.to_string().contains("API key"));
        assert_eq!(MetadataError::NotFound(42).to_string(), "show 42 not found");
        assert_eq!(MetadataError::HttpError { status: 502 }.to_string(), "HTTP error: 502");
    }

    #[test]
    fn test_converts_to_provider_failure() {
        let err: showbell_core::Error = MetadataError::RateLimited.into();
        assert!(matches!(err, showbell_core::Error::Provider(_)));
        assert!(err.to_string().starts_with("PROVIDER_FAILURE"));
    }
}
