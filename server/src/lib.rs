//! Slack Relay
//!
//! Receives Slack Events API callbacks and forwards a normalized subset of
//! them to a single downstream webhook.

pub mod api;
pub mod config;
pub mod relay;
