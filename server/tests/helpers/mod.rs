//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for sending requests through the full axum router,
//! `Downstream`, a real HTTP server standing in for the downstream webhook
//! that records every JSON body it receives, and `LogCapture` for asserting
//! on emitted log lines.
#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{self, Method, Request, Response, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use http_body_util::BodyExt;
use slack_relay::api::{create_router, AppState};
use slack_relay::config::Config;
use slack_relay::relay::Forwarder;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// Path the downstream stub listens on.
pub const DOWNSTREAM_PATH: &str = "/hook";

// ============================================================================
// Relay under test
// ============================================================================

/// Test application wrapping the relay router.
pub struct TestApp {
    pub router: Router,
    pub config: Config,
}

impl TestApp {
    /// Create a test app with forwarding disabled.
    pub fn new() -> Self {
        Self::with_config(Config::default_for_test(None))
    }

    /// Create a test app forwarding to `downstream`.
    pub fn with_downstream(downstream: &Downstream) -> Self {
        Self::with_config(Config::default_for_test(Some(downstream.url())))
    }

    /// Create a test app with a custom config.
    pub fn with_config(config: Config) -> Self {
        let state = AppState::new(config.clone()).expect("Failed to build app state");
        Self {
            router: create_router(state),
            config,
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Build a JSON POST request.
    pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Self::request(Method::POST, uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }
}

/// Read a response body and parse it as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}

// ============================================================================
// Test servers
// ============================================================================

/// A running test server bound to a random local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub url: String,
    _handle: JoinHandle<()>,
}

/// Serve `router` on `127.0.0.1:0` until the test ends.
pub async fn spawn_test_server(router: Router) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server failed");
    });

    TestServer {
        addr,
        url,
        _handle: handle,
    }
}

#[derive(Clone)]
struct StubState {
    tx: mpsc::UnboundedSender<serde_json::Value>,
    status: StatusCode,
    delay: Duration,
}

async fn record_payload(
    State(stub): State<StubState>,
    Json(payload): Json<serde_json::Value>,
) -> StatusCode {
    let _ = stub.tx.send(payload);
    if !stub.delay.is_zero() {
        tokio::time::sleep(stub.delay).await;
    }
    stub.status
}

/// Stand-in for the downstream webhook.
pub struct Downstream {
    pub server: TestServer,
    rx: Mutex<mpsc::UnboundedReceiver<serde_json::Value>>,
}

impl Downstream {
    /// Downstream answering `200` immediately.
    pub async fn spawn() -> Self {
        Self::spawn_with(StatusCode::OK, Duration::ZERO).await
    }

    /// Downstream answering `status` after `delay`.
    pub async fn spawn_with(status: StatusCode, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let router = Router::new()
            .route(DOWNSTREAM_PATH, post(record_payload))
            .with_state(StubState { tx, status, delay });

        Self {
            server: spawn_test_server(router).await,
            rx: Mutex::new(rx),
        }
    }

    /// Webhook URL pointing at this stub.
    pub fn url(&self) -> reqwest::Url {
        reqwest::Url::parse(&format!("{}{DOWNSTREAM_PATH}", self.server.url))
            .expect("valid stub URL")
    }

    /// Wait up to `timeout` for the next forwarded payload.
    pub async fn next_payload(&self, timeout: Duration) -> Option<serde_json::Value> {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
    }

    /// Wait for a payload, failing the test if none arrives.
    pub async fn expect_payload(&self) -> serde_json::Value {
        self.next_payload(Duration::from_secs(5))
            .await
            .expect("Downstream did not receive a payload")
    }

    /// Assert that nothing is forwarded within a short window.
    pub async fn expect_nothing(&self) {
        if let Some(payload) = self.next_payload(Duration::from_millis(300)).await {
            panic!("Unexpected payload forwarded: {payload}");
        }
    }
}

/// URL of a local port with nothing listening on it.
pub async fn unreachable_url() -> reqwest::Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind placeholder listener");
    let addr = listener.local_addr().expect("Failed to get local addr");
    drop(listener);
    reqwest::Url::parse(&format!("http://{addr}{DOWNSTREAM_PATH}")).expect("valid URL")
}

/// Forwarder pointed at `url` with a custom timeout.
pub fn forwarder(url: Option<reqwest::Url>, timeout: Duration) -> Forwarder {
    Forwarder::new(url, timeout).expect("Failed to build forwarder")
}

// ============================================================================
// Log capture
// ============================================================================

/// Collects formatted log output for the current thread.
///
/// `#[tokio::test]` runs on a current-thread runtime, so tasks spawned by the
/// code under test log into the same capture.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<StdMutex<Vec<u8>>>,
}

/// Writer handed to the fmt subscriber.
pub struct CaptureWriter(Arc<StdMutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter(Arc::clone(&self.buf))
    }
}

impl LogCapture {
    /// Install a capturing subscriber as the thread default.
    ///
    /// Keep the guard alive for as long as logs should be captured.
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    /// Everything logged so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }

    /// Whether a `WARN` line containing `needle` was logged.
    pub fn has_warning(&self, needle: &str) -> bool {
        self.contents()
            .lines()
            .any(|line| line.contains("WARN") && line.contains(needle))
    }

    /// Poll until a matching `WARN` line appears or `timeout` elapses.
    pub async fn wait_for_warning(&self, needle: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.has_warning(needle) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
