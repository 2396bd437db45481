//! Scripted network and store doubles shared by the unit tests.

use bytes::Bytes;
use offline_core::cache::EntryMeta;
use offline_core::{AgentConfig, CacheStore, CacheVersion, Error, MemoryStore, RequestKey, ResponseSnapshot};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::fetch::{FetchResponse, Network};
use crate::offline::OfflineFallback;
use crate::request::InterceptedRequest;
use crate::strategy::StrategyContext;

pub const ORIGIN: &str = "https://app.test";

#[derive(Clone)]
enum Reply {
    Respond { status: u16, content_type: String, body: String },
    /// Head after `delay`.
    Slow { delay: Duration, body: String },
    /// Head at once, body after `delay`.
    SlowBody { delay: Duration, body: String },
}

/// Network double: unknown URLs answer 404, `go_offline` fails every fetch.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, Reply>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, status: u16, content_type: &str, body: &str) {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Reply::Respond { status, content_type: content_type.to_string(), body: body.to_string() },
        );
    }

    /// 200 text/html after `delay`.
    pub fn serve_slowly(&self, url: &str, delay: Duration, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Slow { delay, body: body.to_string() });
    }

    /// 200 text/html whose head arrives at once and body after `delay`.
    pub fn serve_slow_body(&self, url: &str, delay: Duration, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::SlowBody { delay, body: body.to_string() });
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

fn fetch_response(url: &Url, status: u16, content_type: &str, body: String) -> FetchResponse {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
    FetchResponse {
        url: url.clone(),
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        bytes: Bytes::from(body),
        fetch_ms: 1,
    }
}

impl FakeNetwork {
    /// Head phase: the response plus how long its body still takes.
    async fn head(&self, request: &InterceptedRequest) -> Result<(FetchResponse, Duration), Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{url}: connection refused")));
        }

        let reply = self.routes.lock().unwrap().get(&url).cloned();
        match reply {
            Some(Reply::Respond { status, content_type, body }) => {
                Ok((fetch_response(&request.url, status, &content_type, body), Duration::ZERO))
            }
            Some(Reply::Slow { delay, body }) => {
                tokio::time::sleep(delay).await;
                Ok((fetch_response(&request.url, 200, "text/html", body), Duration::ZERO))
            }
            Some(Reply::SlowBody { delay, body }) => Ok((fetch_response(&request.url, 200, "text/html", body), delay)),
            None => Ok((fetch_response(&request.url, 404, "text/plain", "not found".into()), Duration::ZERO)),
        }
    }
}

#[async_trait::async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<FetchResponse, Error> {
        let (response, body_delay) = self.head(request).await?;
        tokio::time::sleep(body_delay).await;
        Ok(response)
    }

    async fn fetch_within(&self, request: &InterceptedRequest, header_deadline: Duration) -> Result<FetchResponse, Error> {
        let (response, body_delay) = tokio::time::timeout(header_deadline, self.head(request))
            .await
            .map_err(|_| Error::FetchTimeout(format!("{}: no response head", request.url)))??;
        tokio::time::sleep(body_delay).await;
        Ok(response)
    }
}

/// Store whose every operation fails, as when storage is denied.
pub struct FailingStore;

fn denied() -> Error {
    Error::CacheUnavailable("storage denied".into())
}

#[async_trait::async_trait]
impl CacheStore for FailingStore {
    async fn open_partition(&self, _name: &str) -> Result<(), Error> {
        Err(denied())
    }

    async fn get(&self, _partition: &str, _key: &RequestKey) -> Result<Option<ResponseSnapshot>, Error> {
        Err(denied())
    }

    async fn put(&self, _partition: &str, _key: &RequestKey, _snapshot: &ResponseSnapshot) -> Result<(), Error> {
        Err(denied())
    }

    async fn delete(&self, _partition: &str, _key: &RequestKey) -> Result<bool, Error> {
        Err(denied())
    }

    async fn keys(&self, _partition: &str) -> Result<Vec<EntryMeta>, Error> {
        Err(denied())
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        Err(denied())
    }

    async fn delete_partition(&self, _name: &str) -> Result<bool, Error> {
        Err(denied())
    }
}

pub fn config() -> AgentConfig {
    AgentConfig { origin: ORIGIN.into(), version_tag: "v3".into(), ..Default::default() }
}

pub fn context(network: Arc<FakeNetwork>) -> Arc<StrategyContext> {
    context_with_store(network, Arc::new(MemoryStore::new()))
}

pub fn context_with_store(network: Arc<dyn Network>, store: Arc<dyn CacheStore>) -> Arc<StrategyContext> {
    let config = config();
    let origin = config.origin_url().unwrap();
    Arc::new(StrategyContext {
        store,
        network,
        version: CacheVersion::new(&config.version_tag),
        navigation_timeout: config.navigation_timeout(),
        offline: OfflineFallback::new(&origin, &config.offline_path).unwrap(),
    })
}

pub fn url(path: &str) -> Url {
    Url::parse(&format!("{ORIGIN}{path}")).unwrap()
}

pub fn get(path: &str) -> InterceptedRequest {
    InterceptedRequest::get(url(path))
}

pub fn nav(path: &str) -> InterceptedRequest {
    InterceptedRequest::navigate(url(path))
}

/// Local HTTP server for one connection: sends the head and `<p>he` at once,
/// `llo</p>` after `delay`. Returns its base URL.
pub async fn serve_slow_body_once(delay: Duration) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await.unwrap();
        let head = "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 12\r\n\r\n";
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(b"<p>he").await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(delay).await;
        socket.write_all(b"llo</p>").await.unwrap();
        socket.flush().await.unwrap();
    });
    format!("http://{addr}")
}
