//! # Bus Messages
//!
//! The unit of delivery on the bus. Payloads are opaque bytes; the registry
//! layers its own codec on top.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A message published on a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Subject the message was published on.
    pub subject: String,

    /// Inbox subject the receiver should answer on, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,

    /// Encoded payload.
    pub payload: Vec<u8>,

    /// Publish time in milliseconds since the Unix epoch.
    pub published_at_ms: u64,
}

impl BusMessage {
    /// Create a message without a reply subject.
    #[must_use]
    pub fn new(subject: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            subject: subject.into(),
            reply_to: None,
            payload,
            published_at_ms: now_ms(),
        }
    }

    /// Create a request message that expects answers on `reply_to`.
    #[must_use]
    pub fn request(subject: impl Into<String>, reply_to: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            reply_to: Some(reply_to.into()),
            ..Self::new(subject, payload)
        }
    }

    /// Whether the sender asked for a reply.
    #[must_use]
    pub fn expects_reply(&self) -> bool {
        self.reply_to.is_some()
    }
}

/// Wall-clock milliseconds since the Unix epoch (0 if the clock is before it).
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
