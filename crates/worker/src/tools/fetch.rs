//! fetch tool implementation.
//!
//! Serves an intercepted request through the cache manager once the worker
//! controls the page, straight from the network before that.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use showbell_client::fetch::canonicalize;
use showbell_client::{CacheResponse, Destination, RequestMode, ResourceRequest, ResponseSource};
use showbell_core::Error;

use super::json_result;
use crate::runtime::Worker;

/// Input parameters for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute URL, or a path on the app origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "cors", "no-cors" or "same-origin".
    #[serde(default)]
    pub mode: Option<String>,

    /// Request destination, e.g. "image", "script", "document".
    #[serde(default)]
    pub destination: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the fetch tool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutput {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub source: ResponseSource,
    pub body_length: usize,
    pub body_base64: String,
}

impl FetchOutput {
    fn new(url: String, response: CacheResponse) -> Self {
        Self {
            url,
            status: response.status,
            content_type: response.content_type,
            source: response.source,
            body_length: response.body.len(),
            body_base64: BASE64.encode(&response.body),
        }
    }
}

pub fn build_request(worker: &Worker, params: &FetchParams) -> Result<ResourceRequest, Error> {
    let url = canonicalize(&params.url, Some(worker.cache.origin()))?;
    let mut request = ResourceRequest::get(url).with_method(&params.method);
    if let Some(mode) = params.mode.as_deref() {
        request = request.with_mode(mode.parse::<RequestMode>()?);
    }
    if let Some(destination) = params.destination.as_deref() {
        request = request.with_destination(destination.parse::<Destination>()?);
    }
    if request.method.is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()));
    }
    Ok(request)
}

pub async fn fetch(worker: &Worker, params: FetchParams) -> Result<FetchOutput, Error> {
    let request = build_request(worker, &params)?;
    let response = if worker.lifecycle.is_controlling() {
        worker.cache.handle(&request).await
    } else {
        tracing::debug!(request = %request, "not controlling yet, passing through");
        worker.cache.passthrough(&request).await
    };
    Ok(FetchOutput::new(request.url.to_string(), response))
}

pub async fn fetch_impl(worker: &Worker, params: FetchParams) -> Result<CallToolResult, McpError> {
    json_result(&fetch(worker, params).await?)
}
