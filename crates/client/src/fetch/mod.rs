//! Network access for the agent.
//!
//! ### Network seam
//! - Strategies only talk to the [`Network`] trait, so tests can substitute
//!   a scripted network for the real one.
//!
//! ### HTTP client
//! - [`FetchClient`] issues requests with reqwest.
//! - Any HTTP status is a successful fetch; strategies decide what a non-2xx
//!   answer means for their category.
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)

pub mod url;

use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, resolve, same_origin};

use offline_core::{AgentConfig, Error};

use crate::request::InterceptedRequest;

/// Accept header sent when the intercepted request carried none.
const DEFAULT_ACCEPT: &str = "*/*";

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "offline-agent/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "offline-agent/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AgentConfig> for FetchConfig {
    fn from(config: &AgentConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// Something that can perform a network fetch for an intercepted request.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Fetch the request from the network.
    ///
    /// Connection failures, timeouts and oversized bodies are errors; every
    /// HTTP status, including 4xx/5xx, is a response.
    async fn fetch(&self, request: &InterceptedRequest) -> Result<FetchResponse, Error>;

    /// Like [`Network::fetch`], but gives up with `FetchTimeout` unless the
    /// response headers arrive within `header_deadline`. The body is read
    /// without that deadline.
    ///
    /// The default applies the deadline to the whole fetch; implementations
    /// that can tell the phases apart override it.
    async fn fetch_within(
        &self, request: &InterceptedRequest, header_deadline: Duration,
    ) -> Result<FetchResponse, Error> {
        tokio::time::timeout(header_deadline, self.fetch(request))
            .await
            .map_err(|_| deadline_error(&request.url, header_deadline))?
    }
}

fn deadline_error(url: &Url, deadline: Duration) -> Error {
    Error::FetchTimeout(format!("{url}: no response within {}ms", deadline.as_millis()))
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn network_error(err: &reqwest::Error, url: &Url) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

impl FetchClient {
    /// Send the request and wait for the response head.
    async fn send(&self, request: &InterceptedRequest) -> Result<reqwest::Response, Error> {
        self.http
            .request(request.method.clone(), request.url.clone())
            .header(header::ACCEPT, request.accept.as_deref().unwrap_or(DEFAULT_ACCEPT))
            .send()
            .await
            .map_err(|e| network_error(&e, &request.url))
    }

    /// Read the body of a response whose head has arrived.
    async fn read_body(
        &self, request: &InterceptedRequest, response: reqwest::Response, start: Instant,
    ) -> Result<FetchResponse, Error> {
        let url = request.url.clone();
        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(|e| network_error(&e, &url))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("fetched {} {} -> {} in {}ms ({} bytes)", request.method, url, status, fetch_ms, bytes.len());

        Ok(FetchResponse { url, status, headers, bytes, fetch_ms })
    }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let response = self.send(request).await?;
        self.read_body(request, response, start).await
    }

    async fn fetch_within(
        &self, request: &InterceptedRequest, header_deadline: Duration,
    ) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let response = tokio::time::timeout(header_deadline, self.send(request))
            .await
            .map_err(|_| deadline_error(&request.url, header_deadline))??;
        self.read_body(request, response, start).await
    }
}
