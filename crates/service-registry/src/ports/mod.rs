//! # Ports Layer
//!
//! Inbound: the `Registry` trait consumers program against.
//! Outbound: the bus client the adapters drive (`shared_bus::BusClient`).

pub mod inbound;

pub use inbound::{Registry, WatchStream};
pub use shared_bus::{BusClient, BusConnector};
