//! Errors raised by the worker's tool layer.
//!
//! Everything below the tools reports `showbell_core::Error`; these cover the
//! checks that only make sense at the tool boundary.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use showbell_core::Error;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// A timestamp outside the representable range.
    #[error("INVALID_INPUT: timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    /// A click for a notification that was never shown, with no data supplied.
    #[error("NOT_FOUND: no shown notification with tag {0}")]
    UnknownNotification(String),
}

impl From<WorkerError> for Error {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::InvalidTimestamp(ts) => Error::InvalidInput(format!("timestamp {ts} is out of range")),
            WorkerError::UnknownNotification(tag) => Error::NotFound(format!("no shown notification with tag {tag}")),
        }
    }
}

impl From<WorkerError> for McpError {
    fn from(err: WorkerError) -> Self {
        let code = match &err {
            WorkerError::InvalidTimestamp(_) => -32602,
            WorkerError::UnknownNotification(_) => -32001,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
