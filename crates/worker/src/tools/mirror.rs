//! put_watchlist and put_settings tools.
//!
//! The host owns the watchlist and the notification settings; these tools
//! replace the worker's mirrored copies wholesale.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use showbell_core::{Error, NotificationSettings, WatchlistEntry};

use super::json_result;
use crate::runtime::Worker;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PutWatchlistParams {
    /// The complete watchlist, in display order.
    pub entries: Vec<WatchlistEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PutSettingsParams {
    pub settings: NotificationSettings,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorOutput {
    pub stored: usize,
}

pub async fn put_watchlist(worker: &Worker, params: PutWatchlistParams) -> Result<MirrorOutput, Error> {
    let mut seen = std::collections::HashSet::new();
    if let Some(dup) = params.entries.iter().find(|e| !seen.insert(e.show_id)) {
        return Err(Error::InvalidInput(format!("show {} listed twice", dup.show_id)));
    }

    worker.store.replace_watchlist(&params.entries).await?;
    tracing::info!(shows = params.entries.len(), "watchlist mirrored");
    audit(worker, "watchlist_replaced", json!({ "shows": params.entries.len() })).await;
    Ok(MirrorOutput { stored: params.entries.len() })
}

pub async fn put_settings(worker: &Worker, params: PutSettingsParams) -> Result<MirrorOutput, Error> {
    worker.store.put_settings(&params.settings).await?;
    tracing::info!(
        enabled = params.settings.global_enabled,
        tier = ?params.settings.tier,
        "notification settings mirrored"
    );
    audit(worker, "settings_replaced", serde_json::to_value(&params.settings)?).await;
    Ok(MirrorOutput { stored: 1 })
}

async fn audit(worker: &Worker, kind: &str, payload: serde_json::Value) {
    if let Err(e) = worker.store.append_audit(kind, &payload).await {
        tracing::warn!(kind, error = %e, "failed to write audit entry");
    }
}

pub async fn put_watchlist_impl(worker: &Worker, params: PutWatchlistParams) -> Result<CallToolResult, McpError> {
    json_result(&put_watchlist(worker, params).await?)
}

pub async fn put_settings_impl(worker: &Worker, params: PutSettingsParams) -> Result<CallToolResult, McpError> {
    json_result(&put_settings(worker, params).await?)
}
