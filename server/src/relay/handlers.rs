//! Slack Events API Handler
//!
//! Every request is acknowledged with `200`. Slack disables or retry-storms
//! endpoints that answer with errors, so nothing here can fail the response.

use axum::{extract::rejection::BytesRejection, extract::State, Json};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, warn};

use super::classify::classify;
use super::events::{EnvelopeKind, InboundEnvelope};
use crate::api::AppState;

/// Response body for `POST /` and `POST /slack/events`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EventsResponse {
    /// Answer to a `url_verification` request.
    Challenge { challenge: serde_json::Value },
    /// Acknowledgement for everything else.
    Ack { ok: bool },
}

impl EventsResponse {
    const fn ack() -> Self {
        Self::Ack { ok: true }
    }
}

/// Receive a Slack Events API request.
#[tracing::instrument(skip_all)]
pub async fn slack_events(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<EventsResponse> {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Failed to read request body, acknowledging");
            return Json(EventsResponse::ack());
        }
    };

    Json(handle(&state, &body))
}

/// Process one raw body. Forwarding, if any, runs detached.
pub fn handle(state: &AppState, body: &[u8]) -> EventsResponse {
    let envelope = InboundEnvelope::parse(body);

    match envelope.kind() {
        EnvelopeKind::UrlVerification => {
            debug!("Answering URL verification challenge");
            return EventsResponse::Challenge {
                challenge: envelope.challenge.unwrap_or_default(),
            };
        }
        EnvelopeKind::EventCallback => relay_callback(state, &envelope),
        EnvelopeKind::Other => {
            debug!(kind = ?envelope.kind, "Ignoring envelope");
        }
    }

    EventsResponse::ack()
}

fn relay_callback(state: &AppState, envelope: &InboundEnvelope) {
    if !state.forwarder.is_enabled() {
        warn!("TASKLET_WEBHOOK_URL not set, events are not forwarded");
        return;
    }

    let Some(event) = envelope.event() else {
        return;
    };
    let event_name = event.name();

    match classify(event) {
        Some(payload) => {
            debug!(event = event_name, kind = payload.kind(), "Forwarding event");
            state.forwarder.spawn_forward(payload);
        }
        None => debug!(event = event_name, "Event does not qualify for forwarding"),
    }
}
