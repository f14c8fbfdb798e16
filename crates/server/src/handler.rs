//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::state::AppState;
use crate::tools::cache::{CachePurgeParams, CacheGetParams, get_impl, list_impl, purge_impl};
use crate::tools::client::{ClientMessagesParams, ClientOpenParams, messages_impl, open_impl};
use crate::tools::sw_activate::activate_impl;
use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};
use crate::tools::sw_notification_click::{SwNotificationClickParams, click_impl};
use crate::tools::sw_push::{SwPushParams, push_impl};
use crate::tools::sw_status::status_impl;
use crate::tools::sw_update::{SwUpdateParams, update_impl};

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

/// The main MCP server handler for spasi-sw.
#[derive(Clone)]
pub struct SwServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwServer {
    /// Create a new server handler.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install a worker generation: precache the app shell, then activate unless told to wait.")]
    async fn sw_update(&self, params: Parameters<SwUpdateParams>) -> Result<CallToolResult, McpError> {
        update_impl(&self.state, params.0).await
    }

    #[tool(description = "Activate the waiting worker. Claims windows, deletes old generations, posts UPDATE_READY.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.state).await
    }

    /// Dispatch a fetch event.
    ///
    /// Documents and API calls go network-first with cache fallback; other GETs
    /// are served cache-first. Non-GET and push SDK requests pass through.
    #[tool(description = "Fetch a URL through the worker. Returns status, headers, body and whether it came from network, cache or passthrough.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state, params.0).await
    }

    #[tool(description = "Deliver a push message. Shows a notification unless the payload belongs to the push SDK.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.state, params.0).await
    }

    #[tool(description = "Click a notification: close it, then focus an open window or open the app root.")]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        click_impl(&self.state, params.0).await
    }

    #[tool(description = "Show active and waiting workers, open windows and notifications.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.state).await
    }

    #[tool(description = "Open an application window at a URL. Returns its client id.")]
    async fn client_open(&self, params: Parameters<ClientOpenParams>) -> Result<CallToolResult, McpError> {
        open_impl(&self.state, params.0).await
    }

    #[tool(description = "Drain the messages the worker posted to a window.")]
    async fn client_messages(&self, params: Parameters<ClientMessagesParams>) -> Result<CallToolResult, McpError> {
        messages_impl(&self.state, params.0).await
    }

    #[tool(description = "List cache generations with entry counts, oldest first.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.state).await
    }

    #[tool(description = "Get a cached entry by URL from the current or a named generation.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.state, params.0).await
    }

    #[tool(description = "Delete a named cache generation, or every generation except the current one.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.state, params.0).await
    }
}

impl ServerHandler for SwServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "spasi-sw".into(),
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
