//! sync tool implementation.
//!
//! An explicit sync trigger runs the same work as a timer tick.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use showbell_core::reconcile::PassReport;

use super::json_result;
use crate::runtime::Worker;

/// Input parameters for the sync tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    /// Sync registration tag, logged only.
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutput {
    pub pass: PassReport,
    pub scheduled_fired: usize,
}

pub async fn sync(worker: &Worker, params: SyncParams) -> SyncOutput {
    tracing::info!(tag = params.tag.as_deref().unwrap_or("-"), "sync requested");
    let pass = worker.reconciler.run_pass().await;
    let scheduled_fired = worker.reconciler.fire_scheduled().await;
    SyncOutput { pass, scheduled_fired }
}

pub async fn sync_impl(worker: &Worker, params: SyncParams) -> Result<CallToolResult, McpError> {
    json_result(&sync(worker, params).await)
}
