//! Inbound Slack Payloads
//!
//! Every field Slack may omit is modelled as `Option`, so "absent" and
//! "null" both decode to `None` and no field is silently defaulted. Fields
//! that are copied downstream stay raw JSON and pass through unchanged.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Envelope type Slack sends when the Request URL is first registered.
pub const URL_VERIFICATION: &str = "url_verification";

/// Envelope type wrapping a subscribed event.
pub const EVENT_CALLBACK: &str = "event_callback";

/// Outer Events API envelope.
#[derive(Debug, Default)]
pub struct InboundEnvelope {
    /// `url_verification`, `event_callback`, or anything else.
    pub kind: Option<String>,

    /// Verification challenge, echoed back verbatim.
    pub challenge: Option<Value>,

    /// The wrapped event (only for `event_callback`).
    ///
    /// Kept raw so an event with unexpected field types never spoils the
    /// envelope itself.
    pub event: Option<Value>,
}

/// What the relay does with an envelope.
#[derive(Debug, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// Answer the challenge, nothing else.
    UrlVerification,
    /// Classify and maybe forward the wrapped event.
    EventCallback,
    /// Unknown or missing type; acknowledged and dropped.
    Other,
}

impl InboundEnvelope {
    /// Decode a raw request body.
    ///
    /// Anything that is not a JSON object decodes to the empty envelope. A
    /// repeated key keeps its last value.
    pub fn parse(body: &[u8]) -> Self {
        let mut map = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                debug!(
                    json_type = json_type(&other),
                    "Request body is not a JSON object, acknowledging"
                );
                return Self::default();
            }
            Err(e) => {
                debug!(error = %e, len = body.len(), "Undecodable request body, acknowledging");
                return Self::default();
            }
        };

        Self {
            kind: map.get("type").and_then(Value::as_str).map(str::to_owned),
            challenge: map.remove("challenge").filter(|v| !v.is_null()),
            event: map.remove("event").filter(|v| !v.is_null()),
        }
    }

    /// Classify the envelope by its `type` field.
    pub fn kind(&self) -> EnvelopeKind {
        match self.kind.as_deref() {
            Some(URL_VERIFICATION) => EnvelopeKind::UrlVerification,
            Some(EVENT_CALLBACK) => EnvelopeKind::EventCallback,
            _ => EnvelopeKind::Other,
        }
    }

    /// Decode the wrapped event, if there is one.
    pub fn event(&self) -> Option<InboundEvent> {
        let raw = self.event.as_ref()?;
        match InboundEvent::deserialize(raw) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(error = %e, "Undecodable event in callback, ignoring");
                None
            }
        }
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Truthiness of a loosely typed Slack field: null, `false`, `0`, `""`,
/// `[]` and `{}` are all falsy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// A Slack event, discriminated by its `type` field.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum InboundEvent {
    /// The bot was @-mentioned.
    #[serde(rename = "app_mention")]
    AppMention(MentionEvent),

    /// A reaction was added to an item.
    #[serde(rename = "reaction_added")]
    ReactionAdded(ReactionEvent),

    /// A message was posted (or edited, deleted, ...).
    #[serde(rename = "message")]
    Message(MessageEvent),

    /// Any other event type.
    #[serde(other)]
    Other,
}

impl InboundEvent {
    /// Event type name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppMention(_) => "app_mention",
            Self::ReactionAdded(_) => "reaction_added",
            Self::Message(_) => "message",
            Self::Other => "other",
        }
    }
}

/// Fields of an `app_mention` event.
#[derive(Debug, Default, Deserialize)]
pub struct MentionEvent {
    #[serde(default)]
    pub channel: Option<Value>,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub text: Option<Value>,
    #[serde(default)]
    pub ts: Option<Value>,
    /// Parent timestamp when the mention happened inside a thread.
    #[serde(default)]
    pub thread_ts: Option<Value>,
}

/// Fields of a `reaction_added` event.
#[derive(Debug, Default, Deserialize)]
pub struct ReactionEvent {
    /// Emoji short name without colons (e.g. `email`).
    #[serde(default)]
    pub reaction: Option<Value>,
    #[serde(default)]
    pub user: Option<Value>,
    /// The reacted-to item. Anything but an object counts as empty.
    #[serde(default)]
    pub item: Option<Value>,
}

impl ReactionEvent {
    /// Read a field of `item`, `None` when absent or when `item` is not an object.
    pub fn item_field(&self, key: &str) -> Option<Value> {
        self.item
            .as_ref()
            .and_then(|item| item.get(key))
            .filter(|v| !v.is_null())
            .cloned()
    }
}

/// Fields of a `message` event.
#[derive(Debug, Default, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub channel: Option<Value>,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub text: Option<Value>,
    #[serde(default)]
    pub ts: Option<Value>,
    /// Thread parent timestamp (present only for thread replies).
    #[serde(default)]
    pub thread_ts: Option<Value>,
    /// Message subtype (e.g. `bot_message`, `message_changed`).
    /// Regular user messages have no subtype.
    #[serde(default)]
    pub subtype: Option<Value>,
}
