//! Downstream Forwarding
//!
//! Single-attempt POST of a classified payload to the configured webhook.
//! There is no queue and no retry: a failed delivery is logged and dropped.

use std::time::{Duration, Instant};

use reqwest::Url;
use thiserror::Error;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use super::classify::OutboundPayload;

/// Successful delivery details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardReceipt {
    /// Downstream HTTP status (always 2xx).
    pub status: u16,
    /// Round-trip time of the POST.
    pub latency_ms: u64,
}

/// Why a payload did not reach the downstream.
#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("downstream webhook URL is not configured")]
    NotConfigured,
    #[error("downstream did not answer within the timeout")]
    Timeout,
    #[error("could not connect to downstream: {0}")]
    Connect(reqwest::Error),
    #[error("downstream answered HTTP {0}")]
    Status(u16),
    #[error("request to downstream failed: {0}")]
    Request(reqwest::Error),
}

impl From<reqwest::Error> for ForwardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err)
        } else {
            Self::Request(err)
        }
    }
}

/// Outcome of one forward attempt; only ever logged.
pub type ForwardResult = Result<ForwardReceipt, ForwardError>;

/// Posts payloads to the downstream webhook.
///
/// Clones share one set of in-flight forwards, so [`Forwarder::drain`] on
/// any clone waits for forwards spawned through all of them.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    url: Option<Url>,
    tasks: TaskTracker,
}

impl Forwarder {
    /// Build a forwarder whose every request is bounded by `timeout`.
    pub fn new(url: Option<Url>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            tasks: TaskTracker::new(),
        })
    }

    /// Check if forwarding is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// POST `payload` once and report what happened.
    pub async fn forward(&self, payload: &OutboundPayload) -> ForwardResult {
        let url = self.url.as_ref().ok_or(ForwardError::NotConfigured)?;

        let start = Instant::now();
        let resp = self.client.post(url.clone()).json(payload).send().await?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let status = resp.status();
        if status.is_success() {
            Ok(ForwardReceipt {
                status: status.as_u16(),
                latency_ms,
            })
        } else {
            Err(ForwardError::Status(status.as_u16()))
        }
    }

    /// Forward in a background task so the caller never waits on the downstream.
    pub fn spawn_forward(&self, payload: OutboundPayload) -> tokio::task::JoinHandle<()> {
        let forwarder = self.clone();
        self.tasks.spawn(async move {
            let result = forwarder.forward(&payload).await;
            log_forward_result(payload.kind(), &result);
        })
    }

    /// Number of forwards still in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait up to `grace` for in-flight forwards. Returns `false` if some were
    /// still running when the grace period ran out.
    pub async fn drain(&self, grace: Duration) -> bool {
        self.tasks.close();
        let drained = tokio::time::timeout(grace, self.tasks.wait()).await.is_ok();
        if !drained {
            warn!(
                in_flight = self.tasks.len(),
                "Shutdown grace period elapsed with forwards still in flight"
            );
        }
        drained
    }
}

/// Record a forward outcome. This is the only consumer of [`ForwardResult`].
pub fn log_forward_result(kind: &str, result: &ForwardResult) {
    match result {
        Ok(receipt) => info!(
            kind,
            status = receipt.status,
            latency_ms = receipt.latency_ms,
            "Forwarded event to downstream webhook"
        ),
        Err(ForwardError::NotConfigured) => warn!(
            kind,
            "TASKLET_WEBHOOK_URL not set, dropping event"
        ),
        Err(ForwardError::Status(status)) => warn!(
            kind,
            status,
            "Downstream webhook rejected event"
        ),
        Err(e) => warn!(kind, error = %e, "Error forwarding event to downstream webhook"),
    }
}
