//! # Domain Layer
//!
//! Pure service-discovery types: nodes, result sets, watch deltas, the local
//! record store, the watcher's mirror and configuration. No I/O.

pub mod clock;
pub mod config;
pub mod errors;
pub mod mirror;
pub mod node;
pub mod service_set;
pub mod store;
pub mod watch;

pub use clock::{deadline_after, FAR_FUTURE};
pub use config::{
    RegistryConfig, RegistryConfigBuilder, BACKEND_BUS, BACKEND_LOCAL, DEFAULT_ADDRESS,
    DEFAULT_CONNECTION_TIMEOUT, DEFAULT_DOMAIN, DEFAULT_QUORUM, DEFAULT_SWEEP_CEILING,
    DEFAULT_TIMEOUT, MAX_TIMEOUT, SWEEP_FLOOR,
};
pub use errors::RegistryError;
pub use mirror::WatchMirror;
pub use node::{NodeKey, ServiceNode, DEFAULT_NETWORK, DEFAULT_SCHEME, DEFAULT_TTL, MAX_TTL};
pub use service_set::ServiceSet;
pub use store::{NodeRecordStore, UpsertOutcome};
pub use watch::{WatchAction, WatchEvent};
