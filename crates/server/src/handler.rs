//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker and the cache store.
use std::sync::Arc;

use crate::tools::{
    SwFetchParams,
    cache::{CacheDeleteParams, CacheGetParams, delete_impl, get_impl, list_impl},
    activate_impl, fetch_impl, install_impl,
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
use swcache_client::ServiceWorker;
use swcache_core::CacheDb;

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    worker: Arc<ServiceWorker>,
    cache: CacheDb,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler.
    ///
    /// `cache` must be the same store the worker was built over.
    pub fn new(worker: Arc<ServiceWorker>, cache: CacheDb) -> Self {
        Self { worker, cache, tool_router: Self::tool_router() }
    }

    fn active(&self) -> &str {
        self.worker.config().version.as_str()
    }

    #[tool(
        description = "Run the install step: fetch every manifest URL and store it in the configured cache generation."
    )]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Run the activate step: delete every cache generation except the configured one.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Route a request through the worker.
    ///
    /// Static assets are served cache-first; everything else network-first
    /// with a cache fallback. Non-GET requests go straight to the network.
    #[tool(
        description = "Fetch a URL through the offline cache. Returns the response and whether it came from the cache or the network."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache generations with their entry counts.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.cache, self.active()).await
    }

    #[tool(description = "Show the cached entries for a URL, optionally within one generation.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.cache, self.worker.config(), params.0).await
    }

    #[tool(description = "Delete a stale cache generation. The active generation cannot be deleted.")]
    async fn cache_delete(&self, params: Parameters<CacheDeleteParams>) -> Result<CallToolResult, McpError> {
        delete_impl(&self.cache, self.active(), params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
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
