//! # Adapters
//!
//! Bus-facing halves of the registry:
//! - `advertiser` - publishes local nodes and answers queries
//! - `resolver` - scatter/gather queries with quorum
//! - `watcher` - turns advertisements into watch deltas
//! - `codec` - JSON wire messages

pub mod advertiser;
pub mod codec;
pub mod resolver;
pub mod watcher;

pub use advertiser::Advertiser;
pub use codec::{Advertisement, CorrelationId, QueryReply, QueryRequest};
pub use resolver::Resolver;
pub use watcher::Watcher;
