//! Stale-while-revalidate for everything without a stricter rule.
//!
//! The refresh runs as its own task so a cached answer is returned without
//! waiting on the network. The task's handle is the value that may arrive
//! later: it is awaited when there is nothing cached, and handed back to the
//! caller otherwise.

use offline_core::cache::Role;
use offline_core::{Error, Partition};
use std::sync::Arc;

use super::{Handled, StrategyContext};
use crate::request::InterceptedRequest;
use crate::response::AgentResponse;

pub async fn handle(ctx: &Arc<StrategyContext>, request: &InterceptedRequest) -> Result<Handled, Error> {
    let key = request.key();
    let dynamic = ctx.version.dynamic_name();

    let cached = match Partition::open(ctx.store.as_ref(), dynamic.as_str()).await {
        Ok(partition) => partition.get(&key).await.unwrap_or_else(|e| {
            tracing::warn!(%key, "cache read failed, treating as miss: {e}");
            None
        }),
        Err(e) => {
            tracing::warn!(%key, "cache unavailable, treating as miss: {e}");
            None
        }
    };

    let refresh = tokio::spawn(revalidate(Arc::clone(ctx), request.clone()));

    if let Some(snapshot) = cached {
        tracing::debug!(%key, "serving cached copy while revalidating");
        return Ok(Handled { response: AgentResponse::from_snapshot(snapshot, dynamic), revalidation: Some(refresh) });
    }

    match refresh.await {
        Ok(result) => result.map(Handled::new),
        Err(e) => Err(Error::Network(format!("revalidation task failed: {e}"))),
    }
}

async fn revalidate(ctx: Arc<StrategyContext>, request: InterceptedRequest) -> Result<AgentResponse, Error> {
    let response = AgentResponse::from_network(ctx.network.fetch(&request).await?);
    if response.is_success() {
        ctx.store(Role::Dynamic, &request.key(), &response).await;
    }
    Ok(response)
}
