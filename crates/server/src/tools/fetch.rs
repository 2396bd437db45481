//! agent_fetch tool implementation.
//!
//! Submits one request to the agent as if it had been intercepted. Requests
//! the agent does not handle are performed directly against the network.

use offline_client::{
    Agent, AgentResponse, Destination, InterceptedRequest, Network, Outcome, RequestMode, ResponseSource, Route,
};
use offline_client::fetch::resolve;
use offline_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::json_result;

/// Parameters for the agent_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentFetchParams {
    /// Absolute URL, or a path resolved against the agent's origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Request mode: "navigate", "same-origin", "no-cors" or "cors".
    #[serde(default)]
    pub mode: Option<String>,

    /// Request destination: "document", "style", "script", "image", ...
    #[serde(default)]
    pub destination: Option<String>,

    /// Raw Accept header.
    #[serde(default)]
    pub accept: Option<String>,
}

/// Output from the agent_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentFetchOutput {
    /// "respond" when the agent answered, "pass_through" otherwise.
    pub outcome: String,
    /// Category the agent handled the request as, if any.
    pub category: Option<String>,
    pub status: u16,
    pub content_type: Option<String>,
    /// "network", "cache" or "synthetic".
    pub source: String,
    /// Partition the response was read from, for cache hits.
    pub partition: Option<String>,
    /// Whether a background refresh was still running when this returned.
    pub revalidating: bool,
    pub body: String,
}

fn hint<T: serde::de::DeserializeOwned + Default>(value: Option<String>) -> T {
    value
        .and_then(|v| serde_json::from_value(serde_json::Value::String(v)).ok())
        .unwrap_or_default()
}

/// Build the intercepted request described by `params`.
pub fn build_request(agent: &Agent, params: AgentFetchParams) -> Result<InterceptedRequest, Error> {
    let mut request = if params.url.starts_with('/') {
        let url = resolve(agent.origin(), &params.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
        InterceptedRequest::get(url)
    } else {
        InterceptedRequest::parse(&params.url)?
    };

    if let Some(method) = params.method.as_deref() {
        request = request.with_method_name(method)?;
    }
    request = request
        .with_mode(hint::<RequestMode>(params.mode))
        .with_destination(hint::<Destination>(params.destination));
    if let Some(accept) = params.accept {
        request = request.with_accept(accept);
    }
    Ok(request)
}

fn output(outcome: &str, category: Option<String>, response: AgentResponse, revalidating: bool) -> AgentFetchOutput {
    let (source, partition) = match &response.source {
        ResponseSource::Network => ("network", None),
        ResponseSource::Cache { partition } => ("cache", Some(partition.clone())),
        ResponseSource::Synthetic => ("synthetic", None),
    };

    AgentFetchOutput {
        outcome: outcome.to_string(),
        category,
        status: response.status.as_u16(),
        content_type: response.content_type().map(str::to_string),
        source: source.to_string(),
        partition,
        revalidating,
        body: response.text(),
    }
}

/// Implementation of the agent_fetch tool.
pub async fn fetch_impl(
    agent: &Agent, network: &Arc<dyn Network>, params: AgentFetchParams,
) -> Result<CallToolResult, McpError> {
    let request = build_request(agent, params)?;
    let category = match agent.classifier().classify(&request) {
        Route::Handle(category) => Some(category.to_string()),
        Route::PassThrough => None,
    };

    let result = match agent.handle(&request).await {
        Outcome::Respond(handled) => {
            let revalidating = handled.revalidation.as_ref().is_some_and(|task| !task.is_finished());
            output("respond", category, handled.response, revalidating)
        }
        Outcome::PassThrough => {
            let response = network.fetch(&request).await?;
            output("pass_through", None, AgentResponse::from_network(response), false)
        }
    };

    json_result(&result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{UNREACHABLE_ORIGIN, offline_agent, output as parse_output};
    use offline_client::offline::OFFLINE_MARKER;
    use offline_core::{CacheStore, MemoryStore, RequestKey, ResponseSnapshot};

    fn params(url: &str) -> AgentFetchParams {
        AgentFetchParams { url: url.to_string(), method: None, mode: None, destination: None, accept: None }
    }

    #[tokio::test]
    async fn test_build_request_resolves_paths() {
        let (agent, _) = offline_agent(MemoryStore::new());
        let request = build_request(
            &agent,
            AgentFetchParams { mode: Some("navigate".into()), method: Some("get".into()), ..params("/about?x=1") },
        )
        .unwrap();
        assert_eq!(request.url.as_str(), format!("{UNREACHABLE_ORIGIN}/about?x=1"));
        assert_eq!(request.mode, RequestMode::Navigate);
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let (agent, network) = offline_agent(MemoryStore::new());
        let result = fetch_impl(&agent, &network, params("")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_offline_navigation_returns_offline_page() {
        let (agent, network) = offline_agent(MemoryStore::new());
        let result = fetch_impl(&agent, &network, AgentFetchParams { mode: Some("navigate".into()), ..params("/") })
            .await
            .unwrap();

        let out: AgentFetchOutput = parse_output(&result);
        assert_eq!(out.outcome, "respond");
        assert_eq!(out.category.as_deref(), Some("navigation"));
        assert_eq!(out.status, 200);
        assert_eq!(out.source, "synthetic");
        assert!(out.body.contains(OFFLINE_MARKER));
    }

    #[tokio::test]
    async fn test_cached_stylesheet_served_offline() {
        let store = MemoryStore::new();
        let url = url::Url::parse(&format!("{UNREACHABLE_ORIGIN}/styles/app.css")).unwrap();
        let snapshot = ResponseSnapshot::new(200, vec![("content-type".into(), "text/css".into())], b"body{}".to_vec());
        store.put("static-v3", &RequestKey::get(&url), &snapshot).await.unwrap();
        let (agent, network) = offline_agent(store);

        let result = fetch_impl(&agent, &network, params("/styles/app.css")).await.unwrap();
        let out: AgentFetchOutput = parse_output(&result);
        assert_eq!(out.body, "body{}");
        assert_eq!(out.source, "cache");
        assert_eq!(out.partition.as_deref(), Some("static-v3"));
    }

    #[tokio::test]
    async fn test_api_offline_is_structured() {
        let (agent, network) = offline_agent(MemoryStore::new());
        let result = fetch_impl(&agent, &network, params("/api/items")).await.unwrap();
        let out: AgentFetchOutput = parse_output(&result);
        assert_eq!(out.status, 503);
        let body: serde_json::Value = serde_json::from_str(&out.body).unwrap();
        assert_eq!(body["offline"], true);
    }

    #[tokio::test]
    async fn test_pass_through_surfaces_network_error() {
        let (agent, network) = offline_agent(MemoryStore::new());
        let result =
            fetch_impl(&agent, &network, AgentFetchParams { method: Some("POST".into()), ..params("/api/items") }).await;
        assert!(result.is_err());
    }
}
