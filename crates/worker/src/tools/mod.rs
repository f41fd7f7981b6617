//! MCP tool implementations.
//!
//! One tool per platform event (install, activate, fetch, sync, message,
//! push, notification_click) plus the two mirror tools the host uses to keep
//! the watchlist and settings current.

pub mod click;
pub mod fetch;
pub mod lifecycle;
pub mod message;
pub mod mirror;
pub mod push;
pub mod sync;

pub use click::{ClickParams, click_impl};
pub use fetch::{FetchParams, fetch_impl};
pub use lifecycle::{activate_impl, install_impl};
pub use message::{ControlMessage, MessageParams, message_impl};
pub use mirror::{PutSettingsParams, PutWatchlistParams, put_settings_impl, put_watchlist_impl};
pub use push::{PushParams, push_impl};
pub use sync::{SyncParams, sync_impl};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use showbell_core::Error;

/// Pretty JSON text result, the way every tool answers.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
