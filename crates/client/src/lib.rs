//! Request interception for the offline agent.
//!
//! This crate provides the classifier, the caching strategies, the offline
//! fallback, and the version lifecycle built on the partition store from
//! `offline-core`.

pub mod agent;
pub mod classify;
pub mod fetch;
pub mod lifecycle;
pub mod offline;
pub mod request;
pub mod response;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{Agent, Outcome};
pub use classify::{Category, Classifier, Route};
pub use fetch::{FetchClient, FetchConfig, FetchResponse, Network};
pub use lifecycle::{ActivateReport, InstallReport, LifecycleMessage, VersionLifecycle, WorkerState};
pub use offline::OfflineFallback;
pub use request::{Destination, InterceptedRequest, RequestMode};
pub use response::{AgentResponse, ResponseSource};
pub use strategy::{Handled, Strategy, StrategyContext};
