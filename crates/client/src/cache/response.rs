//! Responses handed back to the intercepted request.

use bytes::Bytes;
use serde::Serialize;
use showbell_core::CachedResponse;

use crate::fetch::FetchResponse;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    /// The cached offline image standing in for an unreachable one.
    Placeholder,
    /// Made up locally because neither network nor cache could answer.
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl CacheResponse {
    pub fn from_network(response: FetchResponse) -> Self {
        Self {
            status: response.status.as_u16(),
            content_type: response.content_type,
            body: response.bytes,
            source: ResponseSource::Network,
        }
    }

    pub fn from_cached(cached: CachedResponse, source: ResponseSource) -> Self {
        Self { status: cached.status, content_type: cached.content_type, body: Bytes::from(cached.body), source }
    }

    pub fn not_found() -> Self {
        Self::synthetic(404, "Not Found")
    }

    pub fn service_unavailable() -> Self {
        Self::synthetic(503, "Offline")
    }

    fn synthetic(status: u16, text: &'static str) -> Self {
        Self {
            status,
            content_type: Some("text/plain".into()),
            body: Bytes::from_static(text.as_bytes()),
            source: ResponseSource::Synthetic,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
