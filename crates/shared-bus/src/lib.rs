//! # Shared Bus - Message Bus Client
//!
//! Thin abstraction over the three primitives the service registry needs
//! from a message bus: publish, subscribe and request/reply.
//!
//! ## Model
//!
//! ```text
//! ┌──────────────┐   publish(subject)   ┌──────────────┐   deliver   ┌──────────────┐
//! │  BusClient   │ ───────────────────▶ │    Broker    │ ──────────▶ │ Subscription │
//! │ (connection) │                      │  (subjects)  │             │  (mpsc rx)   │
//! └──────────────┘                      └──────────────┘             └──────────────┘
//! ```
//!
//! - Subjects are dot-separated tokens (`orb.registry.query`).
//! - A subscription filter is an exact subject or a trailing `>` wildcard.
//! - Request/reply uses a per-request inbox subject carried in `reply_to`.
//!
//! ## Delivery
//!
//! - **At-most-once:** a subscriber whose buffer is full loses the message.
//! - **Per-publisher order:** messages from one client reach each subscriber
//!   in publish order.
//! - **Shared connection:** a client may be used from many tasks at once.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod client;
pub mod error;
pub mod memory;
pub mod message;
pub mod subject;
pub mod subscriber;

// Re-export main types
pub use client::{parse_address, BusAddress, BusClient, BusConnector, ConnectOptions, TlsSettings};
pub use error::BusError;
pub use memory::{InMemoryBus, InMemoryBusClient};
pub use message::BusMessage;
pub use subject::{validate_subject, SubjectFilter};
pub use subscriber::{MessageStream, Subscription, SubscriptionError};

/// Current protocol version for bus messages.
pub const PROTOCOL_VERSION: u16 = 1;

/// Maximum messages to buffer per subscriber before dropping.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Subject prefix for reply inboxes.
pub const INBOX_PREFIX: &str = "_INBOX";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_version() {
        assert_eq!(PROTOCOL_VERSION, 1);
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
