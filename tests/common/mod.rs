//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use cors_proxy::config::{ProxyConfig, RouteConfig, UpstreamConfig};
use cors_proxy::lifecycle::Shutdown;
use cors_proxy::{HttpServer, Listener};

/// Start the proxy on an ephemeral port.
/// Returns its address and the shutdown handle.
pub async fn spawn_proxy(mut config: ProxyConfig) -> (SocketAddr, Shutdown) {
    config.listener.bind_address = "127.0.0.1:0".to_string();
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config);
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, shutdown)
}

/// Config with one upstream and one catch-all route.
pub fn single_upstream_config(upstream: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstreams = vec![UpstreamConfig {
        name: "app".into(),
        url: format!("http://{}", upstream),
    }];
    config.routes = vec![RouteConfig {
        name: "all".into(),
        host: None,
        path_prefix: "/".into(),
        upstream: "app".into(),
        priority: 0,
    }];
    config
}

/// Request head as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl MockRequest {
    /// Look up a header value, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response a mock backend sends back.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a programmable mock backend on an ephemeral port.
/// Returns its address and a hit counter.
pub async fn start_backend<F, Fut>(f: F) -> (SocketAddr, Arc<AtomicU32>)
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicU32::new(0));
    let hit_counter = hits.clone();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let hit_counter = hit_counter.clone();
                    tokio::spawn(async move {
                        let request = match read_request_head(&mut socket).await {
                            Some(request) => request,
                            None => return,
                        };
                        hit_counter.fetch_add(1, Ordering::SeqCst);

                        let response = f(request).await;
                        let mut extra = String::new();
                        for (name, value) in &response.headers {
                            extra.push_str(&format!("{}: {}\r\n", name, value));
                        }
                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
                            status_text(response.status),
                            response.body.len(),
                            extra,
                            response.body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, hits)
}

/// Start a mock backend that returns a fixed body.
pub async fn start_fixed_backend(body: &'static str) -> (SocketAddr, Arc<AtomicU32>) {
    start_backend(move |_req| async move { MockResponse::ok(body) }).await
}

/// Read and minimally parse a request head (and drain any body).
async fn read_request_head(socket: &mut tokio::net::TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_head_end(&buf) {
            break pos;
        }
        if buf.len() > 64 * 1024 {
            return None;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let request = MockRequest {
        method,
        path,
        headers,
    };

    // Drain the body so the client never sees a reset before our response.
    if let Some(length) = request
        .header("content-length")
        .and_then(|v| v.parse::<usize>().ok())
    {
        let already = buf.len() - (head_end + 4);
        let mut remaining = length.saturating_sub(already);
        while remaining > 0 {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            remaining = remaining.saturating_sub(n);
        }
    }

    Some(request)
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}

/// Start a WebSocket echo backend.
/// Echoes text/binary messages; notifies the channel when a connection ends.
pub async fn start_ws_echo_backend() -> (SocketAddr, mpsc::UnboundedReceiver<()>) {
    use futures_util::{SinkExt, StreamExt};

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let closed_tx = closed_tx.clone();
                    tokio::spawn(async move {
                        let mut ws = match tokio_tungstenite::accept_async(stream).await {
                            Ok(ws) => ws,
                            Err(_) => return,
                        };
                        while let Some(Ok(message)) = ws.next().await {
                            if message.is_text() || message.is_binary() {
                                if ws.send(message).await.is_err() {
                                    break;
                                }
                            } else if message.is_close() {
                                break;
                            }
                        }
                        let _ = closed_tx.send(());
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, closed_rx)
}
