//! Event Classification
//!
//! Maps an inbound event to at most one normalized payload for the
//! downstream webhook.

use serde::Serialize;
use serde_json::Value;

use super::events::{is_truthy, InboundEvent, MentionEvent, MessageEvent, ReactionEvent};

/// Reactions that mark a message for the downstream (exact, case-sensitive).
pub const FORWARDED_REACTIONS: [&str; 3] = ["email", "e-mail", "envelope"];

/// Normalized payload POSTed to the downstream webhook.
///
/// Copied fields keep whatever JSON the event carried. Absent source fields
/// serialize as `null`, never omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundPayload {
    /// The bot was mentioned.
    AppMention {
        channel: Option<Value>,
        user: Option<Value>,
        text: Option<Value>,
        ts: Option<Value>,
        thread_ts: Option<Value>,
    },
    /// One of [`FORWARDED_REACTIONS`] was added to an item.
    ReactionAdded {
        reaction: String,
        user: Option<Value>,
        item: OutboundItem,
    },
    /// A first-party reply inside a thread.
    ThreadReply {
        channel: Option<Value>,
        user: Option<Value>,
        text: Option<Value>,
        ts: Option<Value>,
        thread_ts: Value,
    },
}

/// Reacted-to item, reduced to its location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundItem {
    pub channel: Option<Value>,
    pub ts: Option<Value>,
}

impl OutboundPayload {
    /// The `type` value this payload serializes with.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AppMention { .. } => "app_mention",
            Self::ReactionAdded { .. } => "reaction_added",
            Self::ThreadReply { .. } => "thread_reply",
        }
    }
}

/// Classify an event; `None` means nothing is forwarded.
pub fn classify(event: InboundEvent) -> Option<OutboundPayload> {
    match event {
        InboundEvent::AppMention(mention) => Some(mention_payload(mention)),
        InboundEvent::ReactionAdded(reaction) => reaction_payload(reaction),
        InboundEvent::Message(message) => thread_reply_payload(message),
        InboundEvent::Other => None,
    }
}

fn mention_payload(event: MentionEvent) -> OutboundPayload {
    OutboundPayload::AppMention {
        channel: event.channel,
        user: event.user,
        text: event.text,
        ts: event.ts,
        thread_ts: event.thread_ts,
    }
}

fn reaction_payload(event: ReactionEvent) -> Option<OutboundPayload> {
    let reaction = event
        .reaction
        .as_ref()
        .and_then(Value::as_str)
        .filter(|r| FORWARDED_REACTIONS.contains(r))?
        .to_owned();
    let item = OutboundItem {
        channel: event.item_field("channel"),
        ts: event.item_field("ts"),
    };

    Some(OutboundPayload::ReactionAdded {
        reaction,
        user: event.user,
        item,
    })
}

fn thread_reply_payload(event: MessageEvent) -> Option<OutboundPayload> {
    // Edits, deletions and bot posts all carry a subtype
    if is_truthy(event.subtype.as_ref()) {
        return None;
    }
    let thread_ts = event.thread_ts.filter(|ts| is_truthy(Some(ts)))?;

    Some(OutboundPayload::ThreadReply {
        channel: event.channel,
        user: event.user,
        text: event.text,
        ts: event.ts,
        thread_ts,
    })
}
