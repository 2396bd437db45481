//! Responses produced by the agent.
//!
//! Every dispatch ends in an [`AgentResponse`]: a network response, a cached
//! snapshot, or one of the fixed synthetic fallbacks below.

use bytes::Bytes;
use offline_core::{ResponseSnapshot, cache::CacheMatch};
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::fetch::FetchResponse;

/// Body of the empty stylesheet served when a stylesheet is unavailable.
pub const STYLESHEET_FALLBACK_BODY: &str = "/* stylesheet unavailable offline */";

/// Body of the 404 served when a script or bundle is unavailable.
pub const SCRIPT_FALLBACK_BODY: &str = "Static asset unavailable";

/// Body of the generic 503.
pub const RESOURCE_UNAVAILABLE_BODY: &str = "Resource unavailable";

/// Where a response came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache { partition: String },
    /// Built by the agent; never persisted.
    Synthetic,
}

/// Body of the structured API-offline response.
#[derive(Debug, Serialize)]
struct ApiOffline<'a> {
    error: &'a str,
    offline: bool,
}

#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl AgentResponse {
    pub fn from_network(response: FetchResponse) -> Self {
        Self { status: response.status, headers: response.headers, body: response.bytes, source: ResponseSource::Network }
    }

    pub fn from_snapshot(snapshot: ResponseSnapshot, partition: impl Into<String>) -> Self {
        // Snapshots only ever hold statuses that came off the wire.
        let status = StatusCode::from_u16(snapshot.status).unwrap_or(StatusCode::OK);
        Self {
            status,
            headers: header_map(&snapshot.headers),
            body: Bytes::from(snapshot.body),
            source: ResponseSource::Cache { partition: partition.into() },
        }
    }

    pub fn from_cache(hit: CacheMatch) -> Self {
        Self::from_snapshot(hit.snapshot, hit.partition)
    }

    /// Immutable copy suitable for storing.
    pub fn to_snapshot(&self) -> ResponseSnapshot {
        ResponseSnapshot::new(self.status.as_u16(), header_pairs(&self.headers), self.body.to_vec())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == ResponseSource::Synthetic
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn synthetic(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self { status, headers, body: body.into(), source: ResponseSource::Synthetic }
    }

    /// Self-contained offline document: 200, text/html, no-cache.
    pub fn offline_document(html: &'static str) -> Self {
        let mut response = Self::synthetic(StatusCode::OK, "text/html; charset=utf-8", html);
        response
            .headers
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        response
    }

    /// Empty stylesheet: 200, text/css.
    pub fn empty_stylesheet() -> Self {
        Self::synthetic(StatusCode::OK, "text/css", STYLESHEET_FALLBACK_BODY)
    }

    /// Missing script or bundle: 404.
    pub fn script_unavailable() -> Self {
        Self::synthetic(StatusCode::NOT_FOUND, "text/plain; charset=utf-8", SCRIPT_FALLBACK_BODY)
    }

    /// Unreachable API: 503 with `{ "error": ..., "offline": true }`.
    pub fn api_offline() -> Self {
        let body = serde_json::to_vec(&ApiOffline { error: "API unavailable offline", offline: true })
            .unwrap_or_else(|_| br#"{"error":"API unavailable offline","offline":true}"#.to_vec());
        Self::synthetic(StatusCode::SERVICE_UNAVAILABLE, "application/json", body)
    }

    /// Generic failure for any category other than navigation: 503, plain text.
    pub fn resource_unavailable() -> Self {
        Self::synthetic(StatusCode::SERVICE_UNAVAILABLE, "text/plain; charset=utf-8", RESOURCE_UNAVAILABLE_BODY)
    }
}

fn header_map(pairs: &[(String, Vec<u8>)]) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_bytes(value)) {
            (Ok(name), Ok(value)) => {
                map.append(name, value);
            }
            _ => tracing::debug!(header = %name, "dropping unrepresentable cached header"),
        }
    }
    map
}

fn header_pairs(map: &HeaderMap) -> Vec<(String, Vec<u8>)> {
    map.iter()
        .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
        .collect()
}
