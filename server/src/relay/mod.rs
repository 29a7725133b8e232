//! Slack Event Relay
//!
//! Answers Slack's URL verification, classifies event callbacks, and
//! forwards qualifying events to a single downstream webhook, best effort.

pub mod classify;
pub mod events;
pub mod forward;
pub mod handlers;

pub use classify::{classify, OutboundPayload};
pub use events::{InboundEnvelope, InboundEvent};
pub use forward::{ForwardError, ForwardReceipt, ForwardResult, Forwarder};
