//! The agent: classification, dispatch, and lifecycle in one place.
//!
//! [`Agent::handle`] is the interception entry point. Pass-through requests
//! are reported back untouched; everything else is dispatched to the strategy
//! for its category under a guard that always produces a response.

use offline_core::{AgentConfig, CacheStore, CacheVersion, Error};
use reqwest::Url;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use crate::classify::{Category, Classifier, Route};
use crate::fetch::{Network, resolve};
use crate::lifecycle::{ActivateReport, InstallReport, LifecycleMessage, VersionLifecycle, WorkerState};
use crate::offline::OfflineFallback;
use crate::request::InterceptedRequest;
use crate::response::AgentResponse;
use crate::strategy::{Handled, Strategy, StrategyContext};

/// What the agent did with an intercepted request.
#[derive(Debug)]
pub enum Outcome {
    /// Not handled; the host performs the request itself.
    PassThrough,
    /// Answered by the agent.
    Respond(Handled),
}

pub struct Agent {
    origin: Url,
    ctx: Arc<StrategyContext>,
    classifier: Classifier,
    lifecycle: VersionLifecycle,
}

impl Agent {
    pub fn new(config: &AgentConfig, store: Arc<dyn CacheStore>, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let version = config.cache_version();

        let critical = config
            .critical_resources
            .iter()
            .map(|path| {
                resolve(&origin, path)
                    .map(InterceptedRequest::get)
                    .map_err(|e| Error::InvalidInput(format!("critical resource {path}: {e}")))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let ctx = Arc::new(StrategyContext {
            store: Arc::clone(&store),
            network: Arc::clone(&network),
            version: version.clone(),
            navigation_timeout: config.navigation_timeout(),
            offline: OfflineFallback::new(&origin, &config.offline_path)?,
        });

        Ok(Self {
            origin,
            ctx,
            classifier: Classifier::new(config)?,
            lifecycle: VersionLifecycle::new(store, network, version, critical, config.offline_path.as_str()),
        })
    }

    /// The application origin this agent serves.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn version(&self) -> &CacheVersion {
        &self.ctx.version
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.ctx.store
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Answer `request`, or report that it passes through.
    pub async fn handle(&self, request: &InterceptedRequest) -> Outcome {
        match self.classifier.classify(request) {
            Route::PassThrough => {
                tracing::debug!(url = %request.url, method = %request.method, "passing through");
                Outcome::PassThrough
            }
            Route::Handle(category) => Outcome::Respond(self.dispatch(category, request).await),
        }
    }

    /// Run the strategy for `category`. Never fails: a strategy error is
    /// converted to the category's last-resort response.
    pub async fn dispatch(&self, category: Category, request: &InterceptedRequest) -> Handled {
        let strategy = Strategy::for_category(category);
        let start = Instant::now();

        match strategy.run(&self.ctx, request).await {
            Ok(handled) => {
                tracing::debug!(
                    url = %request.url,
                    %category,
                    status = handled.response.status.as_u16(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "request handled"
                );
                handled
            }
            Err(e) => {
                tracing::warn!(url = %request.url, %category, "strategy failed, serving fallback: {e}");
                Handled::new(self.last_resort(category).await)
            }
        }
    }

    /// Response for a request whose strategy produced nothing.
    ///
    /// Only stale-while-revalidate currently returns `Err`; the navigation arm
    /// backs a network-first that always answers on its own.
    pub async fn last_resort(&self, category: Category) -> AgentResponse {
        match category {
            Category::Navigation => self.ctx.offline_response().await,
            _ => AgentResponse::resource_unavailable(),
        }
    }

    pub async fn install(&self) -> InstallReport {
        self.lifecycle.install().await
    }

    pub async fn activate(&self) -> ActivateReport {
        self.lifecycle.activate().await
    }

    /// Apply a lifecycle message. Returns the activation report when the
    /// message caused this instance to activate.
    pub async fn post_message(&self, message: LifecycleMessage) -> Option<ActivateReport> {
        match message {
            LifecycleMessage::SkipWaiting => {
                self.lifecycle.skip_waiting();
                if self.lifecycle.state() == WorkerState::Installed {
                    Some(self.lifecycle.activate().await)
                } else {
                    tracing::debug!(state = ?self.lifecycle.state(), "skip-waiting recorded");
                    None
                }
            }
        }
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.lifecycle.subscribe()
    }

    pub fn is_controlling(&self) -> bool {
        self.lifecycle.is_controlling()
    }

    /// Take this instance out of service.
    pub fn retire(&self) {
        self.lifecycle.retire();
    }
}
