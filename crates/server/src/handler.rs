//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls into the hosted agent.
use crate::tools::{
    AgentFetchParams, AgentMessageParams, CacheListParams, CachePurgeParams, cache, fetch::fetch_impl,
    message::message_impl,
};

use offline_client::{Agent, Network};
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
use std::sync::Arc;

/// The MCP server handler hosting one offline agent.
#[derive(Clone)]
pub struct OfflineAgentServer {
    agent: Arc<Agent>,
    network: Arc<dyn Network>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OfflineAgentServer {
    /// Create a new server handler around `agent`.
    ///
    /// `network` performs requests the agent passes through.
    pub fn new(agent: Arc<Agent>, network: Arc<dyn Network>) -> Self {
        Self { agent, network, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Submit a request to the offline agent as if intercepted from the application. Returns status, source (network, cache or synthetic) and body."
    )]
    async fn agent_fetch(&self, params: Parameters<AgentFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.agent, &self.network, params.0).await
    }

    #[tool(description = "Post a lifecycle message such as {\"type\": \"SKIP_WAITING\"}. Returns the lifecycle state.")]
    async fn agent_message(&self, params: Parameters<AgentMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.agent, params.0).await
    }

    #[tool(description = "List cache partitions, or the entries of one partition.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        cache::list_impl(self.agent.store().as_ref(), self.agent.version(), params.0).await
    }

    #[tool(description = "Delete one cache partition, or every partition left by an older version.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        cache::purge_impl(self.agent.store().as_ref(), self.agent.version(), params.0).await
    }
}

impl ServerHandler for OfflineAgentServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offline-agent".into(),
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
