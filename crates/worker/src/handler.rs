//! MCP server handler implementation.
//!
//! Each platform event the worker reacts to is one tool; the handler only
//! routes calls to the implementations in [`crate::tools`].

use std::sync::Arc;

use crate::runtime::Worker;
use crate::tools::{
    ClickParams, FetchParams, MessageParams, PushParams, PutSettingsParams, PutWatchlistParams, SyncParams,
    activate_impl, click_impl, fetch_impl, install_impl, message_impl, push_impl, put_settings_impl,
    put_watchlist_impl, sync_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for the showbell worker.
#[derive(Clone)]
pub struct ShowbellWorker {
    worker: Arc<Worker>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ShowbellWorker {
    pub fn new(worker: Arc<Worker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install event. Opens the cache generations and precaches the app shell and offline image.")]
    async fn install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(
        description = "Activate event. Deletes stale cache generations, claims open pages and starts the periodic episode check."
    )]
    async fn activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Intercepted request.
    ///
    /// Navigations, non-GET requests and unmatched URLs go straight to the
    /// network; images, API calls and static assets follow their cache policy.
    #[tool(description = "Fetch event. Serves a request through the offline cache. Returns status, source and base64 body.")]
    async fn fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Background sync event. Runs one episode check pass and fires due scheduled notifications.")]
    async fn sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Control message from the app: CACHE_IMAGES, CLEAR_CACHE, GET_CACHE_SIZE, SCHEDULE_NOTIFICATION or CANCEL_NOTIFICATION."
    )]
    async fn message(&self, params: Parameters<MessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Push event. Shows a notification built from the payload, or a generic one.")]
    async fn push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Notification click. Closes the notification and returns where the app should navigate.")]
    async fn notification_click(&self, params: Parameters<ClickParams>) -> Result<CallToolResult, McpError> {
        click_impl(&self.worker, params.0).await
    }

    #[tool(description = "Replace the mirrored watchlist with the app's current one.")]
    async fn put_watchlist(&self, params: Parameters<PutWatchlistParams>) -> Result<CallToolResult, McpError> {
        put_watchlist_impl(&self.worker, params.0).await
    }

    #[tool(description = "Replace the mirrored notification settings.")]
    async fn put_settings(&self, params: Parameters<PutSettingsParams>) -> Result<CallToolResult, McpError> {
        put_settings_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for ShowbellWorker {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "showbell-worker".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
