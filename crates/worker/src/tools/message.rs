//! message tool implementation: the host's control channel.

use chrono::DateTime;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use showbell_client::WarmReport;
use showbell_core::notify::scheduled_tag;
use showbell_core::{Error, ScheduledNotification};

use super::json_result;
use crate::error::WorkerError;
use crate::runtime::Worker;

/// A control message, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Pre-warm the image cache.
    CacheImages { urls: Vec<String> },
    /// Delete every cached response.
    ClearCache,
    /// Count cached responses.
    GetCacheSize,
    /// Show a notification at `timestamp` (Unix milliseconds).
    ScheduleNotification {
        id: String,
        title: String,
        body: String,
        timestamp: i64,
        #[serde(default, rename = "showId")]
        show_id: Option<i64>,
    },
    /// Drop a pending scheduled notification and close it if already shown.
    CancelNotification { id: String },
}

/// Input parameters for the message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageParams {
    pub message: ControlMessage,
}

/// Reply to a control message, tagged like the message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageReply {
    CacheImages {
        #[serde(flatten)]
        report: WarmReport,
    },
    ClearCache {
        deleted: u64,
    },
    GetCacheSize {
        size: u64,
    },
    #[serde(rename_all = "camelCase")]
    ScheduleNotification {
        id: String,
        fire_at: String,
        fired_now: bool,
    },
    CancelNotification {
        id: String,
        cancelled: bool,
    },
}

pub async fn handle_message(worker: &Worker, message: ControlMessage) -> Result<MessageReply, Error> {
    match message {
        ControlMessage::CacheImages { urls } => {
            if urls.is_empty() {
                return Err(Error::InvalidInput("urls cannot be empty".into()));
            }
            let report = worker.cache.cache_urls(&urls).await;
            Ok(MessageReply::CacheImages { report })
        }
        ControlMessage::ClearCache => {
            let deleted = worker.cache.clear().await?;
            if let Err(e) = worker.store.append_audit("cache_cleared", &json!({ "deleted": deleted })).await {
                tracing::warn!(error = %e, "failed to write audit entry");
            }
            Ok(MessageReply::ClearCache { deleted })
        }
        ControlMessage::GetCacheSize => Ok(MessageReply::GetCacheSize { size: worker.cache.size().await? }),
        ControlMessage::ScheduleNotification { id, title, body, timestamp, show_id } => {
            if id.trim().is_empty() {
                return Err(Error::InvalidInput("id cannot be empty".into()));
            }
            let fire_at = DateTime::from_timestamp_millis(timestamp).ok_or(WorkerError::InvalidTimestamp(timestamp))?;
            let scheduled = ScheduledNotification { id: id.clone(), title, body, fire_at, show_id };
            worker.store.schedule_notification(&scheduled).await?;

            let fired_now = fire_at <= worker.clock.now() && worker.reconciler.fire_scheduled().await > 0;
            tracing::info!(id = %id, fire_at = %fire_at, fired_now, "notification scheduled");
            Ok(MessageReply::ScheduleNotification {
                id,
                fire_at: showbell_core::store::timestamp(fire_at),
                fired_now,
            })
        }
        ControlMessage::CancelNotification { id } => {
            let cancelled = worker.store.cancel_scheduled(&id).await?;
            if let Err(e) = worker.dispatcher.cancel(&scheduled_tag(&id)).await {
                tracing::warn!(id = %id, error = %e, "failed to close scheduled notification");
            }
            Ok(MessageReply::CancelNotification { id, cancelled })
        }
    }
}

pub async fn message_impl(worker: &Worker, params: MessageParams) -> Result<CallToolResult, McpError> {
    json_result(&handle_message(worker, params.message).await?)
}
