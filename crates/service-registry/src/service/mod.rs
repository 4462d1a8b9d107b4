//! # Registry Service
//!
//! Wires the record store, advertiser, resolver and watcher into the
//! [`Registry`](crate::ports::Registry) facade.
//!
//! - `Start` connects, subscribes to the query topic and spawns the query
//!   server and refresh loop.
//! - `Stop` deregisters every local node, cancels and joins those tasks,
//!   then disconnects.
//! - Each `Watch` spawns its own task, ended by its token.

mod api;
mod core;
mod local;

pub use self::core::BusRegistry;
pub use self::local::LocalRegistry;
