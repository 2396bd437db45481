//! API handling: network only.
//!
//! API responses are treated as dynamic and possibly sensitive, so this
//! strategy never opens a partition. Any HTTP answer is passed on as-is. Only
//! an unreachable network is reported as offline.

use offline_core::Error;

use super::StrategyContext;
use crate::request::InterceptedRequest;
use crate::response::AgentResponse;

pub async fn handle(ctx: &StrategyContext, request: &InterceptedRequest) -> Result<AgentResponse, Error> {
    match ctx.network.fetch(request).await {
        Ok(response) => Ok(AgentResponse::from_network(response)),
        Err(e) if e.is_transient() => {
            tracing::info!(url = %request.url, "API unreachable: {e}");
            Ok(AgentResponse::api_offline())
        }
        Err(e) => {
            tracing::warn!(url = %request.url, "API response unusable: {e}");
            Ok(AgentResponse::resource_unavailable())
        }
    }
}
