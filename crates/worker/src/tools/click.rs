//! notification_click tool implementation.
//!
//! Routing uses only the notification's persisted data. The host may pass
//! that data back with the click; otherwise it is read from the shown record.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use showbell_core::Error;
use showbell_core::notify::{ClickOutcome, NotificationData};

use super::json_result;
use crate::error::WorkerError;
use crate::runtime::Worker;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClickParams {
    /// Tag of the clicked notification.
    pub tag: String,

    /// Clicked action ("view", "dismiss"), absent for a body click.
    #[serde(default)]
    pub action: Option<String>,

    #[serde(default)]
    pub data: Option<NotificationData>,
}

pub async fn click(worker: &Worker, params: ClickParams) -> Result<ClickOutcome, Error> {
    let data = match params.data {
        Some(data) => data,
        None => worker
            .store
            .get_shown(&params.tag)
            .await?
            .map(|n| n.data)
            .ok_or_else(|| WorkerError::UnknownNotification(params.tag.clone()))?,
    };
    Ok(worker.clicks.handle(&params.tag, &data, params.action.as_deref()).await)
}

pub async fn click_impl(worker: &Worker, params: ClickParams) -> Result<CallToolResult, McpError> {
    json_result(&click(worker, params).await?)
}
