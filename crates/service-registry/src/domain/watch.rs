//! Watch deltas.

use crate::domain::node::ServiceNode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchAction {
    Register,
    Deregister,
}

impl WatchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Deregister => "deregister",
        }
    }
}

impl fmt::Display for WatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single change to the set of nodes of a watched service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub action: WatchAction,
    pub node: ServiceNode,
}

impl WatchEvent {
    pub fn register(node: ServiceNode) -> Self {
        Self {
            action: WatchAction::Register,
            node,
        }
    }

    pub fn deregister(node: ServiceNode) -> Self {
        Self {
            action: WatchAction::Deregister,
            node,
        }
    }
}
