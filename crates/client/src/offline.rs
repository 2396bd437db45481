//! Offline fallback document.
//!
//! Prefers the cached copy of the designated offline page. When none exists,
//! answers with a built-in page that needs nothing from the network.

use offline_core::{CacheStore, CacheVersion, Error, RequestKey};
use reqwest::Url;

use crate::fetch::resolve;
use crate::response::AgentResponse;

/// Heading shown by the built-in offline page.
pub const OFFLINE_MARKER: &str = "You're Offline";

const OFFLINE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Offline</title>
<style>
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body {
    font-family: system-ui, -apple-system, "Segoe UI", Roboto, sans-serif;
    background: #1e293b;
    min-height: 100vh;
    display: flex;
    align-items: center;
    justify-content: center;
    padding: 24px;
  }
  main {
    background: #ffffff;
    border-radius: 12px;
    padding: 40px 32px;
    max-width: 420px;
    width: 100%;
    text-align: center;
  }
  h1 { color: #0f172a; font-size: 24px; margin-bottom: 12px; }
  p { color: #475569; line-height: 1.5; margin-bottom: 28px; }
  .actions { display: flex; flex-direction: column; gap: 12px; }
  .action {
    display: block;
    border: none;
    border-radius: 6px;
    padding: 12px 24px;
    font-size: 16px;
    cursor: pointer;
    text-decoration: none;
    background: #2563eb;
    color: #ffffff;
  }
  .action.secondary { background: #e2e8f0; color: #1e293b; }
</style>
</head>
<body>
<main>
  <h1>You're Offline</h1>
  <p>No connection right now. Pages you have already visited are still available.</p>
  <div class="actions">
    <button class="action" onclick="location.reload()">Try Again</button>
    <a class="action secondary" href="/">Go to Home</a>
    <button class="action secondary" onclick="history.back()">Go Back</button>
  </div>
</main>
</body>
</html>
"#;

/// Produces the response for a navigation that has nothing better to serve.
#[derive(Debug, Clone)]
pub struct OfflineFallback {
    key: RequestKey,
}

impl OfflineFallback {
    pub fn new(origin: &Url, offline_path: &str) -> Result<Self, Error> {
        let url = resolve(origin, offline_path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self { key: RequestKey::get(&url) })
    }

    /// Cache key of the designated offline document.
    pub fn key(&self) -> &RequestKey {
        &self.key
    }

    /// The built-in page, independent of any cache.
    pub fn builtin() -> AgentResponse {
        AgentResponse::offline_document(OFFLINE_HTML)
    }

    pub async fn respond(&self, store: &dyn CacheStore, version: &CacheVersion) -> AgentResponse {
        match store.match_in(&version.lookup_order(), &self.key).await {
            Ok(Some(hit)) => {
                tracing::debug!(partition = %hit.partition, "serving cached offline document");
                AgentResponse::from_cache(hit)
            }
            Ok(None) => Self::builtin(),
            Err(e) => {
                tracing::warn!("offline document lookup failed, using built-in page: {e}");
                Self::builtin()
            }
        }
    }
}
