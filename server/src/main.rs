//! Slack Relay - Main Entry Point

use anyhow::{Context, Result};
use tracing::{info, warn};

use slack_relay::{api, config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slack_relay=info,tower_http=info".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Slack Relay"
    );

    if config.has_webhook() {
        info!("Downstream webhook configured");
    } else {
        warn!("TASKLET_WEBHOOK_URL not set. Events will be acknowledged but not forwarded.");
    }

    let bind_address = config.bind_address();
    let forward_grace = config.forward_timeout;
    let state = api::AppState::new(config).context("Failed to build downstream HTTP client")?;
    let forwarder = state.forwarder.clone();
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!(address = %bind_address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Forwards outlive the connections that triggered them
    if forwarder.in_flight() > 0 {
        info!(in_flight = forwarder.in_flight(), "Waiting for in-flight forwards");
    }
    forwarder.drain(forward_grace).await;

    info!("Server shutdown complete");

    Ok(())
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM from the hosting platform.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Received shutdown signal, cleaning up...");
}
