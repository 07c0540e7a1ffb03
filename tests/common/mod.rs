//! Shared utilities for integration tests.
//!
//! Mock servers speak just enough HTTP/1.1 over raw sockets to exercise the
//! relay and the metadata client. Every helper binds an ephemeral port and
//! returns the address.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

use radio_edge::config::{EdgeRendererConfig, StreamProxyConfig};
use radio_edge::lifecycle::Shutdown;
use radio_edge::StreamProxyServer;

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Read the request head (up to the blank line).
pub async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

async fn respond(socket: &mut TcpStream, status: u16, content_type: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line(status),
        content_type,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// A backend answering `200` with a fixed body and recording request heads.
pub struct RecordingBackend {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl RecordingBackend {
    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<String> {
        self.requests.lock().unwrap().last().cloned()
    }
}

pub async fn start_recording_backend(body: &'static str) -> RecordingBackend {
    let (listener, addr) = bind().await;
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let recorded = recorded.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                recorded.lock().unwrap().push(head);
                respond(&mut socket, 200, "audio/mpeg", body).await;
            });
        }
    });

    RecordingBackend { addr, requests }
}

/// A backend whose status and body come from `f` on every request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let (listener, addr) = bind().await;
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let _ = read_head(&mut socket).await;
                let (status, body) = f().await;
                respond(&mut socket, status, "audio/mpeg", &body).await;
            });
        }
    });

    addr
}

/// A backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let (listener, addr) = bind().await;
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let (listener, addr) = bind().await;
    drop(listener);
    addr
}

/// A chunked audio backend that sends `first` immediately and `rest` only
/// once released, and notices when the proxy closes the connection.
pub struct StreamingBackend {
    pub addr: SocketAddr,
    pub release: Arc<Notify>,
    pub closed_by_peer: Arc<AtomicBool>,
    pub connections: Arc<AtomicUsize>,
}

impl StreamingBackend {
    /// Wait up to `limit` for the proxy to hang up.
    pub async fn wait_for_close(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            if self.closed_by_peer.load(Ordering::SeqCst) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

fn chunk(data: &[u8]) -> Vec<u8> {
    let mut out = format!("{:x}\r\n", data.len()).into_bytes();
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
    out
}

pub async fn start_streaming_backend(first: Vec<u8>, rest: Vec<u8>) -> StreamingBackend {
    let (listener, addr) = bind().await;
    let release = Arc::new(Notify::new());
    let closed_by_peer = Arc::new(AtomicBool::new(false));
    let connections = Arc::new(AtomicUsize::new(0));

    let (rel, closed, conns) = (release.clone(), closed_by_peer.clone(), connections.clone());
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            conns.fetch_add(1, Ordering::SeqCst);
            let (rel, closed) = (rel.clone(), closed.clone());
            let (first, rest) = (first.clone(), rest.clone());
            tokio::spawn(async move {
                let _ = read_head(&mut socket).await;
                let head = "HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nicy-name: Toca Stereo\r\nTransfer-Encoding: chunked\r\n\r\n";
                if socket.write_all(head.as_bytes()).await.is_err()
                    || socket.write_all(&chunk(&first)).await.is_err()
                {
                    closed.store(true, Ordering::SeqCst);
                    return;
                }

                let mut scratch = [0u8; 64];
                tokio::select! {
                    _ = rel.notified() => {
                        let _ = socket.write_all(&chunk(&rest)).await;
                        let _ = socket.write_all(b"0\r\n\r\n").await;
                        let _ = socket.shutdown().await;
                    }
                    read = socket.read(&mut scratch) => {
                        if matches!(read, Ok(0) | Err(_)) {
                            closed.store(true, Ordering::SeqCst);
                        }
                    }
                }
            });
        }
    });

    StreamingBackend {
        addr,
        release,
        closed_by_peer,
        connections,
    }
}

/// A content API serving `/articles?filter[slug]=<slug>` from a fixed set.
pub struct MockCms {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
}

impl MockCms {
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub async fn start_mock_cms(articles: Vec<(&'static str, serde_json::Value)>) -> MockCms {
    let (listener, addr) = bind().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let articles = Arc::new(articles);
    let counter = hits.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let (articles, counter) = (articles.clone(), counter.clone());
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                counter.fetch_add(1, Ordering::SeqCst);

                let target = head.split_whitespace().nth(1).unwrap_or("/");
                let url = url::Url::parse(&format!("http://cms{}", target)).unwrap();
                let slug = url
                    .query_pairs()
                    .find(|(k, _)| k == "filter[slug]")
                    .map(|(_, v)| v.into_owned());

                let data: Vec<serde_json::Value> = match (url.path(), slug) {
                    ("/api/articles", Some(slug)) => articles
                        .iter()
                        .filter(|(s, _)| *s == slug)
                        .map(|(_, record)| record.clone())
                        .collect(),
                    _ => Vec::new(),
                };
                let body = serde_json::json!({ "data": data }).to_string();
                respond(&mut socket, 200, "application/json", &body).await;
            });
        }
    });

    MockCms { addr, hits }
}

/// Stream proxy config pointed at `upstream` with fast retries.
pub fn stream_proxy_config(upstream: SocketAddr) -> StreamProxyConfig {
    let mut config = StreamProxyConfig::default();
    config.upstream_url = format!("http://{}", upstream);
    config.accept_invalid_upstream_certs = false;
    config.connect_timeout_ms = 500;
    config.response_timeout_ms = 1_000;
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 40;
    config
}

/// Start a stream proxy on an ephemeral port.
pub async fn spawn_stream_proxy(config: StreamProxyConfig) -> (SocketAddr, Shutdown) {
    let server = StreamProxyServer::new(config).unwrap();
    let (listener, addr) = bind().await;
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    (addr, shutdown)
}

pub const TEMPLATE: &str = "<!doctype html><html lang=\"es\"><head><meta charset=\"utf-8\"><title>Toca Stereo</title></head><body><div id=\"root\"></div><script src=\"/static/js/main.js\"></script></body></html>";

/// A build directory with the document template and a few assets.
pub fn build_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), TEMPLATE).unwrap();
    std::fs::create_dir_all(dir.path().join("static/js")).unwrap();
    std::fs::write(dir.path().join("static/js/main.js"), "console.log('toca');").unwrap();
    std::fs::write(dir.path().join("robots.txt"), "User-agent: *\n").unwrap();
    dir
}

/// Edge renderer config serving `dir` with metadata from `content_api`.
pub fn edge_config(dir: &tempfile::TempDir, content_api: String) -> EdgeRendererConfig {
    let mut config = EdgeRendererConfig::default();
    config.static_dir = dir.path().to_string_lossy().into_owned();
    config.content_api_url = content_api;
    config.watch_template = false;
    config.metadata_timeout_ms = 500;
    config
}

/// A client that neither pools nor uses system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
