//! Minimal HTTP/1.1 test server for integration tests.
//!
//! Serves canned routes over `tokio::net::TcpListener`, one request per
//! connection (`Connection: close`). Tracks how many requests are being
//! served at once so tests can check the pool's concurrency bound from the
//! outside.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// How one path is answered
#[derive(Debug, Clone)]
pub struct Route {
    status: u16,
    body: Vec<u8>,
    /// Advertised length; `None` sends no `Content-Length`
    content_length: Option<u64>,
    /// Pause before sending anything
    delay: Duration,
    /// Send this many body bytes, then hang
    stall_after: Option<usize>,
    /// Answer the first `n` requests with this status instead
    fail_first: Option<(usize, u16)>,
    /// Extra response headers, also sent on `fail_first` answers
    headers: Vec<(String, String)>,
    /// Send the body in this many pieces with a pause between them
    trickle: Option<(usize, Duration)>,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self {
            status: 200,
            content_length: Some(body.len() as u64),
            body,
            delay: Duration::ZERO,
            stall_after: None,
            fail_first: None,
            headers: Vec::new(),
            trickle: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::ok(Vec::new())
        }
    }

    pub fn html(body: &str) -> Self {
        Self::ok(body.as_bytes().to_vec())
    }

    /// Advertise a length other than the real body size
    pub fn advertise(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    /// Stream the body until the connection closes, without a length
    pub fn without_length(mut self) -> Self {
        self.content_length = None;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn stall_after(mut self, bytes: usize) -> Self {
        self.stall_after = Some(bytes);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn trickle(mut self, pieces: usize, interval: Duration) -> Self {
        self.trickle = Some((pieces.max(1), interval));
        self
    }

    pub fn fail_first(mut self, times: usize, status: u16) -> Self {
        self.fail_first = Some((times, status));
        self
    }
}

#[derive(Debug, Default)]
struct State {
    routes: Mutex<HashMap<String, Route>>,
    hits: Mutex<HashMap<String, usize>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

/// Handle to a running server; the server lives until the runtime shuts down
#[derive(Debug, Clone)]
pub struct TestServer {
    base: String,
    state: Arc<State>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(State::default());

        let accept_state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = Arc::clone(&accept_state);
                tokio::spawn(async move { handle(stream, state).await });
            }
        });

        Self {
            base: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    pub fn route(&self, path: &str, route: Route) -> &Self {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert(path.to_string(), route);
        self
    }

    /// Absolute URL for `path`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state
            .hits
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Most requests ever served at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }
}

/// A URL on a port nothing listens on; every connect is refused
pub async fn refused_url(path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}{}", port, path)
}

/// Every `.part` file under `dir`
pub fn partial_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext == "part") {
                found.push(path);
            }
        }
    }
    found
}

async fn handle(mut stream: TcpStream, state: Arc<State>) {
    let Some(target) = read_request_target(&mut stream).await else {
        return;
    };

    let hit = {
        let mut hits = state.hits.lock().unwrap();
        let count = hits.entry(target.clone()).or_insert(0);
        *count += 1;
        *count
    };
    let route = {
        let routes = state.routes.lock().unwrap();
        let path = target.split('?').next().unwrap_or(&target);
        routes
            .get(&target)
            .or_else(|| routes.get(path))
            .cloned()
            .unwrap_or_else(|| Route::status(404))
    };
    let route = match route.fail_first {
        Some((times, status)) if hit <= times => Route {
            headers: route.headers.clone(),
            ..Route::status(status)
        },
        _ => route,
    };

    let now = state.active.fetch_add(1, Ordering::SeqCst) + 1;
    state.peak.fetch_max(now, Ordering::SeqCst);
    respond(&mut stream, &route).await;
    state.active.fetch_sub(1, Ordering::SeqCst);
}

async fn read_request_target(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let request = String::from_utf8_lossy(&buf);
    let mut parts = request.lines().next()?.split_whitespace();
    let _method = parts.next()?;
    parts.next().map(str::to_string)
}

async fn respond(stream: &mut TcpStream, route: &Route) {
    if !route.delay.is_zero() {
        tokio::time::sleep(route.delay).await;
    }

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nConnection: close\r\n",
        route.status,
        reason(route.status)
    );
    if let Some(length) = route.content_length {
        head.push_str(&format!("Content-Length: {}\r\n", length));
    }
    for (name, value) in &route.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");
    if stream.write_all(head.as_bytes()).await.is_err() {
        return;
    }

    match (route.stall_after, route.trickle) {
        (Some(bytes), _) => {
            let end = bytes.min(route.body.len());
            let _ = stream.write_all(&route.body[..end]).await;
            let _ = stream.flush().await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        (None, Some((pieces, interval))) => {
            let piece = route.body.len().div_ceil(pieces).max(1);
            for (i, part) in route.body.chunks(piece).enumerate() {
                if i > 0 {
                    tokio::time::sleep(interval).await;
                }
                if stream.write_all(part).await.is_err() || stream.flush().await.is_err() {
                    return;
                }
            }
        }
        (None, None) => {
            let _ = stream.write_all(&route.body).await;
        }
    }
    let _ = stream.shutdown().await;
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
