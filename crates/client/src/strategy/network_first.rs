//! Navigation handling: network first with a bounded wait.
//!
//! The network attempt is abandoned if no response head arrives before the
//! navigation timeout; dropping the in-flight send cancels the request. A
//! response that started in time is read to the end. After that the request falls back to the exact cached URL, the same URL
//! without its query string, and finally the offline document.

use offline_core::Error;
use offline_core::cache::Role;

use super::StrategyContext;
use crate::request::InterceptedRequest;
use crate::response::AgentResponse;

pub async fn handle(ctx: &StrategyContext, request: &InterceptedRequest) -> Result<AgentResponse, Error> {
    let key = request.key();

    match ctx.network.fetch_within(request, ctx.navigation_timeout).await {
        Ok(response) if response.status.is_success() => {
            let response = AgentResponse::from_network(response);
            ctx.store(Role::Dynamic, &key, &response).await;
            return Ok(response);
        }
        Ok(response) => {
            tracing::debug!(url = %request.url, status = response.status.as_u16(), "navigation not successful");
        }
        Err(Error::FetchTimeout(_)) => tracing::debug!(
            url = %request.url,
            timeout_ms = ctx.navigation_timeout.as_millis() as u64,
            "navigation network timed out"
        ),
        Err(e) => tracing::debug!(url = %request.url, "navigation network failed: {e}"),
    }

    if let Some(hit) = ctx.lookup(&key).await {
        tracing::debug!(url = %request.url, partition = %hit.partition, "navigation served from cache");
        return Ok(AgentResponse::from_cache(hit));
    }

    let base = key.without_query();
    if base != key
        && let Some(hit) = ctx.lookup(&base).await
    {
        tracing::debug!(url = %base.url, partition = %hit.partition, "navigation served from cache without query");
        return Ok(AgentResponse::from_cache(hit));
    }

    tracing::info!(url = %request.url, "serving offline document");
    Ok(ctx.offline_response().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::OFFLINE_MARKER;
    use crate::response::ResponseSource;
    use crate::fetch::{FetchClient, FetchConfig};
    use crate::testing::{FakeNetwork, context, context_with_store, nav, serve_slow_body_once};
    use offline_core::{CacheStore, MemoryStore, RequestKey, ResponseSnapshot};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_success_is_returned_and_cached() {
        let network = Arc::new(FakeNetwork::new());
        network.serve("https://app.test/about", 200, "text/html", "<h1>About</h1>");
        let store = MemoryStore::new();
        let ctx = context_with_store(network.clone(), Arc::new(store.clone()));

        let response = handle(&ctx, &nav("/about")).await.unwrap();
        assert_eq!(response.text(), "<h1>About</h1>");
        assert_eq!(response.source, ResponseSource::Network);

        let key = nav("/about").key();
        let cached = store.get("dynamic-v3", &key).await.unwrap().unwrap();
        assert_eq!(cached.body, b"<h1>About</h1>");
    }

    #[tokio::test]
    async fn test_offline_serves_previous_body() {
        let network = Arc::new(FakeNetwork::new());
        network.serve("https://app.test/about", 200, "text/html", "<h1>About</h1>");
        let ctx = context(network.clone());

        handle(&ctx, &nav("/about")).await.unwrap();
        network.go_offline();

        let response = handle(&ctx, &nav("/about")).await.unwrap();
        assert_eq!(response.text(), "<h1>About</h1>");
        assert_eq!(response.source, ResponseSource::Cache { partition: "dynamic-v3".into() });
    }

    #[tokio::test]
    async fn test_non_success_falls_back_to_cache() {
        let network = Arc::new(FakeNetwork::new());
        network.serve("https://app.test/about", 200, "text/html", "good");
        let ctx = context(network.clone());
        handle(&ctx, &nav("/about")).await.unwrap();

        network.serve("https://app.test/about", 502, "text/html", "bad gateway");
        let response = handle(&ctx, &nav("/about")).await.unwrap();
        assert_eq!(response.text(), "good");
    }

    #[tokio::test]
    async fn test_query_stripped_fallback() {
        let network = Arc::new(FakeNetwork::new());
        network.serve("https://app.test/search", 200, "text/html", "search page");
        let ctx = context(network.clone());
        handle(&ctx, &nav("/search")).await.unwrap();
        network.go_offline();

        let response = handle(&ctx, &nav("/search?q=rust")).await.unwrap();
        assert_eq!(response.text(), "search page");
    }

    #[tokio::test]
    async fn test_exact_match_preferred_over_stripped() {
        let network = Arc::new(FakeNetwork::new());
        network.serve("https://app.test/search", 200, "text/html", "plain");
        network.serve("https://app.test/search?q=rust", 200, "text/html", "rust results");
        let ctx = context(network.clone());
        handle(&ctx, &nav("/search")).await.unwrap();
        handle(&ctx, &nav("/search?q=rust")).await.unwrap();
        network.go_offline();

        let response = handle(&ctx, &nav("/search?q=rust")).await.unwrap();
        assert_eq!(response.text(), "rust results");
    }

    #[tokio::test]
    async fn test_offline_without_cache_serves_offline_document() {
        let network = Arc::new(FakeNetwork::new());
        network.go_offline();
        let store = MemoryStore::new();
        let ctx = context_with_store(network, Arc::new(store.clone()));

        for _ in 0..2 {
            let response = handle(&ctx, &nav("/never-seen")).await.unwrap();
            assert_eq!(response.status.as_u16(), 200);
            assert!(response.text().contains(OFFLINE_MARKER));
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_offline_prefers_cached_offline_page() {
        let network = Arc::new(FakeNetwork::new());
        network.go_offline();
        let store = MemoryStore::new();
        let offline_key = RequestKey::get(&reqwest::Url::parse("https://app.test/offline").unwrap());
        store
            .put("static-v3", &offline_key, &ResponseSnapshot::new(200, vec![], b"app offline page".to_vec()))
            .await
            .unwrap();
        let ctx = context_with_store(network, Arc::new(store));

        let response = handle(&ctx, &nav("/never-seen")).await.unwrap();
        assert_eq!(response.text(), "app offline page");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_network_times_out_to_cache() {
        let network = Arc::new(FakeNetwork::new());
        network.serve("https://app.test/", 200, "text/html", "home v1");
        let ctx = context(network.clone());
        handle(&ctx, &nav("/")).await.unwrap();

        network.serve_slowly("https://app.test/", Duration::from_secs(5), "home v2");
        let response = handle(&ctx, &nav("/")).await.unwrap();
        assert_eq!(response.text(), "home v1");
        assert!(matches!(response.source, ResponseSource::Cache { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_within_timeout_wins() {
        let network = Arc::new(FakeNetwork::new());
        network.serve_slowly("https://app.test/", Duration::from_millis(100), "fresh");
        let ctx = context(network);

        let response = handle(&ctx, &nav("/")).await.unwrap();
        assert_eq!(response.text(), "fresh");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_body_after_timely_head_is_served() {
        let network = Arc::new(FakeNetwork::new());
        network.serve_slow_body("https://app.test/report", Duration::from_millis(800), "full report");
        let store = MemoryStore::new();
        let ctx = context_with_store(network, Arc::new(store.clone()));

        let response = handle(&ctx, &nav("/report")).await.unwrap();
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(response.text(), "full report");
        assert!(store.get("dynamic-v3", &nav("/report").key()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_http_head_in_time_keeps_streaming_body() {
        let base = serve_slow_body_once(Duration::from_millis(800)).await;
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let ctx = context_with_store(Arc::new(client), Arc::new(MemoryStore::new()));
        let request = InterceptedRequest::navigate(reqwest::Url::parse(&format!("{base}/about")).unwrap());

        let response = handle(&ctx, &request).await.unwrap();
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(response.text(), "<p>hello</p>");
    }

    #[tokio::test]
    async fn test_does_not_remove_stale_partitions() {
        let network = Arc::new(FakeNetwork::new());
        network.serve("https://app.test/", 200, "text/html", "home");
        let store = MemoryStore::new();
        store.open_partition("static-v2").await.unwrap();
        let ctx = context_with_store(network, Arc::new(store.clone()));

        handle(&ctx, &nav("/")).await.unwrap();
        assert!(store.partitions().await.unwrap().contains(&"static-v2".to_string()));
    }
}
