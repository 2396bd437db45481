//! Caching strategies.
//!
//! Each category maps to exactly one [`Strategy`]. Strategies recover from
//! transient network failures and unavailable stores themselves; an `Err`
//! leaving [`Strategy::run`] means there is nothing left to serve and the
//! dispatcher's guard takes over.

pub mod cache_first;
pub mod network_first;
pub mod network_only;
pub mod stale_while_revalidate;

use offline_core::cache::{CacheMatch, Role};
use offline_core::{CacheStore, CacheVersion, Error, Partition, RequestKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::classify::Category;
use crate::fetch::Network;
use crate::offline::OfflineFallback;
use crate::request::InterceptedRequest;
use crate::response::AgentResponse;

pub use cache_first::CacheFirstFallback;

/// Everything a strategy may touch while answering one request.
pub struct StrategyContext {
    pub store: Arc<dyn CacheStore>,
    pub network: Arc<dyn Network>,
    pub version: CacheVersion,
    pub navigation_timeout: Duration,
    pub offline: OfflineFallback,
}

impl StrategyContext {
    /// Exact-match lookup over the current version's partitions.
    ///
    /// An unavailable store is logged and reported as a miss.
    pub async fn lookup(&self, key: &RequestKey) -> Option<CacheMatch> {
        match self.store.match_in(&self.version.lookup_order(), key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(%key, "cache lookup failed, treating as miss: {e}");
                None
            }
        }
    }

    /// Store a network response in the current partition for `role`.
    ///
    /// Synthetic responses are never written. Failures are logged only.
    pub async fn store(&self, role: Role, key: &RequestKey, response: &AgentResponse) {
        if response.is_synthetic() {
            tracing::debug!(%key, "refusing to cache synthetic response");
            return;
        }

        let result = async {
            let partition = Partition::open(self.store.as_ref(), self.version.name(role)).await?;
            partition.put(key, &response.to_snapshot()).await
        }
        .await;

        match result {
            Ok(()) => tracing::debug!(%key, %role, "cached"),
            Err(e) => tracing::warn!(%key, %role, "failed to cache response: {e}"),
        }
    }

    pub async fn offline_response(&self) -> AgentResponse {
        self.offline.respond(self.store.as_ref(), &self.version).await
    }
}

/// Result of running a strategy.
#[derive(Debug)]
pub struct Handled {
    pub response: AgentResponse,
    /// Background refresh still running after the response was produced.
    pub revalidation: Option<JoinHandle<Result<AgentResponse, Error>>>,
}

impl Handled {
    pub fn new(response: AgentResponse) -> Self {
        Self { response, revalidation: None }
    }
}

/// The closed set of caching strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Network with a bounded wait, then cache, then the offline document.
    NetworkFirst,
    /// Cache, then network (stored on success), then a synthetic fallback.
    CacheFirst(CacheFirstFallback),
    /// Network only; nothing is read from or written to any partition.
    NetworkOnly,
    /// Cached value now, refreshed from the network in the background.
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Navigation => Strategy::NetworkFirst,
            Category::Stylesheet => Strategy::CacheFirst(CacheFirstFallback::EmptyStylesheet),
            Category::Script => Strategy::CacheFirst(CacheFirstFallback::Unavailable),
            Category::Api => Strategy::NetworkOnly,
            Category::Other => Strategy::StaleWhileRevalidate,
        }
    }

    pub async fn run(&self, ctx: &Arc<StrategyContext>, request: &InterceptedRequest) -> Result<Handled, Error> {
        match self {
            Strategy::NetworkFirst => network_first::handle(ctx, request).await.map(Handled::new),
            Strategy::CacheFirst(fallback) => cache_first::handle(ctx, request, *fallback).await.map(Handled::new),
            Strategy::NetworkOnly => network_only::handle(ctx, request).await.map(Handled::new),
            Strategy::StaleWhileRevalidate => stale_while_revalidate::handle(ctx, request).await,
        }
    }
}
