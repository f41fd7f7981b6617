//! install and activate tools.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use showbell_client::{ActivateReport, InstallReport};
use showbell_core::Error;

use super::json_result;
use crate::runtime::Worker;

pub async fn install(worker: &Worker) -> Result<InstallReport, Error> {
    worker.lifecycle.install(&worker.cache).await
}

/// Activation also starts the periodic recheck.
pub async fn activate(worker: &Worker) -> ActivateReport {
    let report = worker.lifecycle.activate(&worker.cache).await;
    worker.start_schedule();
    report
}

pub async fn install_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    json_result(&install(worker).await?)
}

pub async fn activate_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    json_result(&activate(worker).await)
}
