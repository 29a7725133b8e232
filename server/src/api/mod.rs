//! API Router and Application State
//!
//! Central routing configuration and shared state.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::relay::{handlers, Forwarder};

/// Shared application state. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    /// Relay configuration
    pub config: Arc<Config>,
    /// Downstream webhook client
    pub forwarder: Forwarder,
}

impl AppState {
    /// Create application state, building the downstream client from `config`.
    pub fn new(config: Config) -> reqwest::Result<Self> {
        let forwarder = Forwarder::new(config.webhook_url.clone(), config.forward_timeout)?;
        Ok(Self {
            config: Arc::new(config),
            forwarder,
        })
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Slack Events API (Request URL may point at either path)
        .route("/", post(handlers::slack_events))
        .route("/slack/events", post(handlers::slack_events))
        // Middleware
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
}

/// Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}
