//! Relay Configuration
//!
//! Loads configuration from environment variables once at startup.

use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use tracing::warn;

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 3000;

/// Upper bound for a single downstream POST.
pub const FORWARD_TIMEOUT: Duration = Duration::from_secs(5);

/// Relay configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listening port (default: 3000)
    pub port: u16,

    /// Downstream webhook URL. `None` disables forwarding.
    pub webhook_url: Option<Url>,

    /// Timeout for the downstream POST (default: 5s)
    pub forward_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// A missing or unparsable webhook URL only disables forwarding; an
    /// invalid `PORT` is a startup error.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got {raw:?}"))?,
            None => DEFAULT_PORT,
        };

        let webhook_url = lookup("TASKLET_WEBHOOK_URL")
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| match Url::parse(&raw) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(
                        error = %e,
                        "TASKLET_WEBHOOK_URL is not a valid URL. Forwarding disabled."
                    );
                    None
                }
            });

        Ok(Self {
            port,
            webhook_url,
            forward_timeout: FORWARD_TIMEOUT,
        })
    }

    /// Address the server binds to (all interfaces).
    #[must_use]
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// Check if a downstream webhook is configured.
    #[must_use]
    pub const fn has_webhook(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Create a configuration for testing, forwarding to `webhook_url` if given.
    #[must_use]
    pub fn default_for_test(webhook_url: Option<Url>) -> Self {
        Self {
            port: 0,
            webhook_url,
            forward_timeout: FORWARD_TIMEOUT,
        }
    }
}
