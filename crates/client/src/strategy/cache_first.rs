//! Cache-first handling for stylesheets and script bundles.
//!
//! The two categories share one shape and differ only in what is served when
//! neither the cache nor the network can answer.

use offline_core::Error;
use offline_core::cache::Role;

use super::StrategyContext;
use crate::request::InterceptedRequest;
use crate::response::AgentResponse;

/// Synthetic answer when a cache-first resource is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFirstFallback {
    /// 200 with an empty stylesheet: unstyled beats blocked rendering.
    EmptyStylesheet,
    /// 404 so the caller can detect missing logic.
    Unavailable,
}

impl CacheFirstFallback {
    pub fn response(&self) -> AgentResponse {
        match self {
            CacheFirstFallback::EmptyStylesheet => AgentResponse::empty_stylesheet(),
            CacheFirstFallback::Unavailable => AgentResponse::script_unavailable(),
        }
    }
}

pub async fn handle(
    ctx: &StrategyContext, request: &InterceptedRequest, fallback: CacheFirstFallback,
) -> Result<AgentResponse, Error> {
    let key = request.key();

    if let Some(hit) = ctx.lookup(&key).await {
        tracing::debug!(url = %request.url, partition = %hit.partition, "served from cache");
        return Ok(AgentResponse::from_cache(hit));
    }

    match ctx.network.fetch(request).await {
        Ok(response) if response.status.is_success() => {
            let response = AgentResponse::from_network(response);
            ctx.store(Role::Static, &key, &response).await;
            return Ok(response);
        }
        Ok(response) => {
            tracing::warn!(url = %request.url, status = response.status.as_u16(), "static asset fetch not successful");
        }
        Err(e) => tracing::warn!(url = %request.url, "static asset fetch failed: {e}"),
    }

    Ok(fallback.response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{ResponseSource, STYLESHEET_FALLBACK_BODY};
    use crate::testing::{FailingStore, FakeNetwork, context, context_with_store, get};
    use offline_core::{CacheStore, MemoryStore};
    use std::sync::Arc;

    const CSS: CacheFirstFallback = CacheFirstFallback::EmptyStylesheet;
    const JS: CacheFirstFallback = CacheFirstFallback::Unavailable;

    #[tokio::test]
    async fn test_stylesheet_fetched_then_served_offline() {
        let network = Arc::new(FakeNetwork::new());
        network.serve("https://app.test/styles/app.css", 200, "text/css", "body{margin:0}");
        let store = MemoryStore::new();
        let ctx = context_with_store(network.clone(), Arc::new(store.clone()));

        let first = handle(&ctx, &get("/styles/app.css"), CSS).await.unwrap();
        assert_eq!(first.status.as_u16(), 200);
        assert_eq!(first.text(), "body{margin:0}");
        assert!(store.get("static-v3", &get("/styles/app.css").key()).await.unwrap().is_some());

        network.go_offline();
        let second = handle(&ctx, &get("/styles/app.css"), CSS).await.unwrap();
        assert_eq!(second.status.as_u16(), 200);
        assert_eq!(second.body, first.body);
        assert_ne!(second.text(), STYLESHEET_FALLBACK_BODY);
        assert_eq!(second.source, ResponseSource::Cache { partition: "static-v3".into() });
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let network = Arc::new(FakeNetwork::new());
        network.serve("https://app.test/app.js", 200, "text/javascript", "v1");
        let ctx = context(network.clone());

        handle(&ctx, &get("/app.js"), JS).await.unwrap();
        network.serve("https://app.test/app.js", 200, "text/javascript", "v2");
        let response = handle(&ctx, &get("/app.js"), JS).await.unwrap();

        assert_eq!(response.text(), "v1");
        assert_eq!(network.calls_to("https://app.test/app.js"), 1);
    }

    #[tokio::test]
    async fn test_stylesheet_fallback_when_unreachable() {
        let network = Arc::new(FakeNetwork::new());
        network.go_offline();
        let ctx = context(network);

        let response = handle(&ctx, &get("/styles/app.css"), CSS).await.unwrap();
        assert_eq!(response.status.as_u16(), 200);
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(response.text(), STYLESHEET_FALLBACK_BODY);
    }

    #[tokio::test]
    async fn test_script_fallback_is_not_success() {
        let network = Arc::new(FakeNetwork::new());
        network.go_offline();
        let ctx = context(network);

        let response = handle(&ctx, &get("/app.js"), JS).await.unwrap();
        assert_eq!(response.status.as_u16(), 404);
    }

    #[tokio::test]
    async fn test_non_success_is_not_cached() {
        let network = Arc::new(FakeNetwork::new());
        network.serve("https://app.test/app.js", 500, "text/plain", "oops");
        let store = MemoryStore::new();
        let ctx = context_with_store(network, Arc::new(store.clone()));

        let response = handle(&ctx, &get("/app.js"), JS).await.unwrap();
        assert_eq!(response.status.as_u16(), 404);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades_to_network() {
        let network = Arc::new(FakeNetwork::new());
        network.serve("https://app.test/styles/app.css", 200, "text/css", "body{}");
        let ctx = context_with_store(network, Arc::new(FailingStore));

        let response = handle(&ctx, &get("/styles/app.css"), CSS).await.unwrap();
        assert_eq!(response.text(), "body{}");
        assert_eq!(response.source, ResponseSource::Network);
    }
}
