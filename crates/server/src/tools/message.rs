//! agent_message tool implementation.
//!
//! Posts a lifecycle message to the agent, as the application shell would.

use offline_client::{Agent, LifecycleMessage};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the agent_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentMessageParams {
    /// The message object, e.g. `{"type": "SKIP_WAITING"}`.
    pub message: serde_json::Value,
}

/// Output from the agent_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentMessageOutput {
    /// Whether the message was recognised.
    pub accepted: bool,
    /// Lifecycle state after the message was applied.
    pub state: String,
    pub controlling: bool,
    /// Stale partitions deleted if the message triggered activation.
    pub deleted_partitions: Vec<String>,
}

/// Implementation of the agent_message tool.
pub async fn message_impl(agent: &Agent, params: AgentMessageParams) -> Result<CallToolResult, McpError> {
    let (accepted, deleted_partitions) = match LifecycleMessage::parse(&params.message.to_string()) {
        Some(message) => {
            let report = agent.post_message(message).await;
            (true, report.map(|r| r.deleted).unwrap_or_default())
        }
        None => (false, Vec::new()),
    };

    let output = AgentMessageOutput {
        accepted,
        state: agent.state().to_string(),
        controlling: agent.is_controlling(),
        deleted_partitions,
    };
    json_result(&output)
}
