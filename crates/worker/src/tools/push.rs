//! push tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use showbell_core::Error;
use showbell_core::notify::Notification;

use super::json_result;
use crate::runtime::Worker;

/// Input parameters for the push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Raw push message text, usually JSON with title, body, showId, url and tag.
    #[serde(default)]
    pub payload: Option<String>,
}

pub async fn push(worker: &Worker, params: PushParams) -> Result<Notification, Error> {
    worker.dispatcher.dispatch_push(params.payload.as_deref()).await
}

pub async fn push_impl(worker: &Worker, params: PushParams) -> Result<CallToolResult, McpError> {
    json_result(&push(worker, params).await?)
}
