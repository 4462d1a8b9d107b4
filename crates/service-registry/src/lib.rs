//! # Service Registry
//!
//! Service discovery for an RPC framework, backed by a message bus. Every
//! process embeds a registry instance; there is no central server.
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────────────────── Registry (facade) ───────────────────────────┐
//!  Register ─────▶ │ NodeRecordStore ──▶ Advertiser ──publish──▶ <domain>.registry.watch       │
//!  Deregister      │                     Advertiser ◀──query──── <domain>.registry.query       │
//!  GetService ───▶ │ Resolver ──request──▶ query topic ──replies──▶ inbox (quorum / timeout)  │
//!  Watch ────────▶ │ Watcher ◀──advertisements── watch topic  ──▶ WatchMirror ──▶ WatchStream │
//!                  └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! | Property | Behavior |
//! |----------|----------|
//! | Liveness | Local nodes are re-advertised before their TTL lapses |
//! | Expiry | A watcher reports `Deregister` once a node's TTL lapses unrefreshed |
//! | Deltas | Watch streams only carry changes; refreshes are suppressed |
//! | Quorum | `GetService` returns after `quorum` distinct replies or at the timeout |
//! | Cancellation | A cancelled context yields `Cancelled`, never `NotFound` |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Nodes, sets, watch events, record store, mirror, config
//! - `ports/` - The `Registry` trait and `WatchStream`
//! - `adapters/` - Advertiser, resolver, watcher and wire codec
//! - `service/` - `BusRegistry` and `LocalRegistry`
//! - `plugins` - Explicit backend factory
//! - `entrypoint` / `selector` - Server and client integration helpers
//!
//! ## Usage
//!
//! ```ignore
//! use service_registry::{BusRegistry, Registry, RegistryConfig, ServiceNode};
//! use shared_bus::InMemoryBus;
//! use tokio_util::sync::CancellationToken;
//!
//! let bus = InMemoryBus::new();
//! let registry = BusRegistry::connect(RegistryConfig::default(), &bus)?;
//! let ctx = CancellationToken::new();
//!
//! registry.start(&ctx).await?;
//! registry.register(&ctx, &ServiceNode::new("greeter", "v1", "g-1", "10.0.0.1:8080")).await?;
//! let set = registry.get_service(&ctx, "greeter", "v1").await?;
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod entrypoint;
pub mod plugins;
pub mod ports;
pub mod selector;
pub mod service;

// Re-export key types for convenience
pub use domain::{
    NodeKey, NodeRecordStore, RegistryConfig, RegistryConfigBuilder, RegistryError,
    ServiceNode, ServiceSet, WatchAction, WatchEvent, WatchMirror,
};
pub use entrypoint::ServiceEntrypoint;
pub use plugins::{register_builtin_backends, BackendConstructor, BackendDeps, BackendFactory};
pub use ports::{Registry, WatchStream};
pub use selector::{NodeSelector, SelectionStrategy};
pub use service::{BusRegistry, LocalRegistry};
