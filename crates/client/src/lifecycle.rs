//! Version lifecycle: install, activate, and the control message.
//!
//! Install pre-caches the critical resource set into the current static
//! partition. Activate deletes every partition that does not carry the
//! current version tag and then claims the open application instances.
//! Neither phase fails: problems are logged and reported, and the agent
//! moves on with whatever was cached.

use offline_core::cache::Role;
use offline_core::{CacheStore, CacheVersion, Error, Partition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

use crate::fetch::Network;
use crate::request::InterceptedRequest;
use crate::response::AgentResponse;

/// Observable state of an agent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Out of service: superseded or shut down.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// Control messages accepted from the application shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleMessage {
    /// Activate the waiting instance now instead of after all clients close.
    SkipWaiting,
}

impl LifecycleMessage {
    /// Parse a message; unrecognised shapes yield None.
    pub fn parse(json: &str) -> Option<Self> {
        match serde_json::from_str(json) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!("ignoring unrecognised lifecycle message: {e}");
                None
            }
        }
    }
}

/// Outcome of the install phase.
#[derive(Debug, Default, Clone, Serialize)]
pub struct InstallReport {
    pub cached: Vec<String>,
    /// (path, reason) for every critical resource that could not be cached.
    pub failed: Vec<(String, String)>,
}

/// Outcome of the activate phase.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub retained: Vec<String>,
}

/// Drives one agent instance through install and activation.
pub struct VersionLifecycle {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    version: CacheVersion,
    critical: Vec<InterceptedRequest>,
    offline_path: String,
    state: watch::Sender<WorkerState>,
    skip_waiting: AtomicBool,
    claimed: AtomicBool,
}

impl VersionLifecycle {
    pub fn new(
        store: Arc<dyn CacheStore>, network: Arc<dyn Network>, version: CacheVersion,
        critical: Vec<InterceptedRequest>, offline_path: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Parsed);
        Self {
            store,
            network,
            version,
            critical,
            offline_path: offline_path.into(),
            state,
            skip_waiting: AtomicBool::new(false),
            claimed: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    fn transition(&self, next: WorkerState) {
        let previous = self.state.send_replace(next);
        tracing::info!(version = self.version.tag(), ?previous, ?next, "agent lifecycle transition");
    }

    /// Request activation without waiting for open instances to close.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn is_skipping_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Whether this instance has claimed the open application instances.
    pub fn is_controlling(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    /// Stop controlling application instances and mark this one redundant.
    pub fn retire(&self) {
        self.claimed.store(false, Ordering::SeqCst);
        self.transition(WorkerState::Redundant);
    }

    /// Pre-cache the critical resource set, tolerating per-resource failure.
    pub async fn install(&self) -> InstallReport {
        self.transition(WorkerState::Installing);
        let mut report = InstallReport::default();

        match Partition::open(self.store.as_ref(), self.version.static_name()).await {
            Ok(partition) => {
                for request in &self.critical {
                    let path = request.path().to_string();
                    match self.precache(&partition, request).await {
                        Ok(()) => {
                            tracing::info!(%path, "pre-cached critical resource");
                            report.cached.push(path);
                        }
                        Err(e) => {
                            tracing::warn!(%path, "failed to pre-cache critical resource: {e}");
                            report.failed.push((path, e.to_string()));
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!("install could not open the static partition: {e}");
                report
                    .failed
                    .extend(self.critical.iter().map(|r| (r.path().to_string(), e.to_string())));
            }
        }

        self.skip_waiting();
        self.transition(WorkerState::Installed);
        report
    }

    async fn precache(&self, partition: &Partition<'_>, request: &InterceptedRequest) -> Result<(), Error> {
        let response = self.network.fetch(request).await?;
        if !response.status.is_success() {
            return Err(Error::HttpError(format!("status {}", response.status.as_u16())));
        }

        let snapshot = AgentResponse::from_network(response).to_snapshot();
        let key = request.key();
        partition.put(&key, &snapshot).await?;

        if request.path() == self.offline_path {
            let offline = Partition::open(self.store.as_ref(), self.version.name(Role::Offline)).await?;
            offline.put(&key, &snapshot).await?;
        }

        Ok(())
    }

    /// Delete stale partitions, then claim open application instances.
    ///
    /// Partition deletion has completed for every name in the report by the
    /// time this returns.
    pub async fn activate(&self) -> ActivateReport {
        self.transition(WorkerState::Activating);
        let mut report = ActivateReport::default();

        match self.store.partitions().await {
            Ok(names) => {
                for name in names {
                    if self.version.is_current(&name) {
                        report.retained.push(name);
                        continue;
                    }
                    match self.store.delete_partition(&name).await {
                        Ok(_) => {
                            tracing::info!(partition = %name, "deleted stale partition");
                            report.deleted.push(name);
                        }
                        Err(e) => tracing::warn!(partition = %name, "failed to delete stale partition: {e}"),
                    }
                }
            }
            Err(e) => tracing::error!("activation could not enumerate partitions: {e}"),
        }

        self.claim();
        self.transition(WorkerState::Activated);
        report
    }

    fn claim(&self) {
        self.claimed.store(true, Ordering::SeqCst);
        tracing::info!(version = self.version.tag(), "controlling all application instances");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingStore, FakeNetwork, get};
    use offline_core::{MemoryStore, ResponseSnapshot};

    fn lifecycle(network: Arc<FakeNetwork>, store: Arc<dyn CacheStore>, tag: &str) -> VersionLifecycle {
        let critical = vec![get("/"), get("/offline"), get("/manifest.json")];
        VersionLifecycle::new(store, network, CacheVersion::new(tag), critical, "/offline")
    }

    fn serve_all(network: &FakeNetwork) {
        network.serve("https://app.test/", 200, "text/html", "home");
        network.serve("https://app.test/offline", 200, "text/html", "offline page");
        network.serve("https://app.test/manifest.json", 200, "application/json", "{}");
    }

    #[test]
    fn test_parse_skip_waiting() {
        assert_eq!(LifecycleMessage::parse(r#"{"type":"SKIP_WAITING"}"#), Some(LifecycleMessage::SkipWaiting));
        assert_eq!(LifecycleMessage::parse(r#"{"type":"CLAIM"}"#), None);
        assert_eq!(LifecycleMessage::parse("not json"), None);
    }

    #[tokio::test]
    async fn test_install_precaches_critical_set() {
        let network = Arc::new(FakeNetwork::new());
        serve_all(&network);
        let store = MemoryStore::new();
        let lc = lifecycle(network, Arc::new(store.clone()), "v3");

        let report = lc.install().await;
        assert_eq!(report.cached, vec!["/", "/offline", "/manifest.json"]);
        assert!(report.failed.is_empty());

        let keys: Vec<String> = store.keys("static-v3").await.unwrap().into_iter().map(|m| m.key.url).collect();
        assert_eq!(keys.len(), 3);
        assert!(store.get("offline-v3", &get("/offline").key()).await.unwrap().is_some());
        assert_eq!(lc.state(), WorkerState::Installed);
        assert!(lc.is_skipping_waiting());
    }

    #[tokio::test]
    async fn test_install_tolerates_missing_resource() {
        let network = Arc::new(FakeNetwork::new());
        network.serve("https://app.test/", 200, "text/html", "home");
        network.serve("https://app.test/offline", 200, "text/html", "offline page");
        let store = MemoryStore::new();
        let lc = lifecycle(network, Arc::new(store.clone()), "v3");

        let report = lc.install().await;
        assert_eq!(report.cached, vec!["/", "/offline"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "/manifest.json");
        assert!(store.get("static-v3", &get("/manifest.json").key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_install_with_unavailable_store_still_completes() {
        let network = Arc::new(FakeNetwork::new());
        serve_all(&network);
        let lc = lifecycle(network, Arc::new(FailingStore), "v3");

        let report = lc.install().await;
        assert_eq!(report.failed.len(), 3);
        assert_eq!(lc.state(), WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_partitions() {
        let network = Arc::new(FakeNetwork::new());
        let store = MemoryStore::new();
        let snapshot = ResponseSnapshot::new(200, vec![], b"x".to_vec());
        store.put("static-v2", &get("/").key(), &snapshot).await.unwrap();
        store.put("dynamic-v2", &get("/a").key(), &snapshot).await.unwrap();
        store.put("static-v3", &get("/").key(), &snapshot).await.unwrap();
        store.open_partition("third-party").await.unwrap();
        let lc = lifecycle(network, Arc::new(store.clone()), "v3");

        let report = lc.activate().await;
        assert_eq!(report.deleted, vec!["static-v2", "dynamic-v2", "third-party"]);
        assert_eq!(report.retained, vec!["static-v3"]);
        assert_eq!(store.partitions().await.unwrap(), vec!["static-v3"]);
        assert!(lc.is_controlling());
        assert_eq!(lc.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_activate_is_idempotent() {
        let store = MemoryStore::new();
        store.open_partition("static-v2").await.unwrap();
        let lc = lifecycle(Arc::new(FakeNetwork::new()), Arc::new(store.clone()), "v3");

        lc.activate().await;
        let second = lc.activate().await;
        assert!(second.deleted.is_empty());
        assert!(store.partitions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activate_with_unavailable_store_still_claims() {
        let lc = lifecycle(Arc::new(FakeNetwork::new()), Arc::new(FailingStore), "v3");
        lc.activate().await;
        assert!(lc.is_controlling());
    }

    #[tokio::test]
    async fn test_transitions_are_observable() {
        let network = Arc::new(FakeNetwork::new());
        serve_all(&network);
        let lc = lifecycle(network, Arc::new(MemoryStore::new()), "v3");
        let mut rx = lc.subscribe();
        assert_eq!(*rx.borrow_and_update(), WorkerState::Parsed);

        lc.install().await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), WorkerState::Installed);

        lc.retire();
        assert_eq!(*rx.borrow_and_update(), WorkerState::Redundant);
        assert!(!lc.is_controlling());
    }
}
