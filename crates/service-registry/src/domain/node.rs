//! Service nodes: one reachable instance of a named, versioned service.

use crate::domain::errors::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Default transport network.
pub const DEFAULT_NETWORK: &str = "tcp";
/// Default dial scheme.
pub const DEFAULT_SCHEME: &str = "http";
/// Default advertisement lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
/// Longest accepted advertisement lifetime.
pub const MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A single instance of a service.
///
/// Identity is `(name, version, node_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNode {
    /// Logical service name.
    pub name: String,
    /// Service version. Empty means unversioned.
    #[serde(default)]
    pub version: String,
    /// Unique instance id.
    pub node_id: String,
    /// Transport network (e.g. "tcp").
    #[serde(default = "default_network")]
    pub network: String,
    /// Dial target, `host:port` or a socket path.
    pub address: String,
    /// Dial scheme (e.g. "http", "grpc", "h2c").
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Free-form attributes.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// How long an advertisement stays valid without a refresh.
    #[serde(rename = "ttl_ms", with = "duration_ms", default = "default_ttl")]
    pub ttl: Duration,
}

fn default_network() -> String {
    DEFAULT_NETWORK.to_string()
}

fn default_scheme() -> String {
    DEFAULT_SCHEME.to_string()
}

fn default_ttl() -> Duration {
    DEFAULT_TTL
}

impl ServiceNode {
    /// Create a node with default network, scheme and TTL.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        node_id: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            node_id: node_id.into(),
            network: default_network(),
            address: address.into(),
            scheme: default_scheme(),
            metadata: HashMap::new(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Identity key of this node.
    pub fn key(&self) -> NodeKey {
        NodeKey {
            name: self.name.clone(),
            version: self.version.clone(),
            node_id: self.node_id.clone(),
        }
    }

    /// Check the fields every registry operation relies on.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::InvalidNode("name is empty".into()));
        }
        if self.node_id.trim().is_empty() {
            return Err(RegistryError::InvalidNode(format!(
                "node of {} has an empty node_id",
                self.name
            )));
        }
        if self.address.trim().is_empty() {
            return Err(RegistryError::InvalidNode(format!(
                "node {} has an empty address",
                self.node_id
            )));
        }
        if self.ttl.is_zero() {
            return Err(RegistryError::InvalidNode(format!(
                "node {} has a zero ttl",
                self.node_id
            )));
        }
        if self.ttl > MAX_TTL {
            return Err(RegistryError::InvalidNode(format!(
                "node {} ttl {:?} exceeds {:?}",
                self.node_id, self.ttl, MAX_TTL
            )));
        }
        Ok(())
    }

    /// Whether a consumer would dial this node the same way as `other`.
    ///
    /// TTL changes alone do not count.
    pub fn same_endpoint(&self, other: &Self) -> bool {
        self.address == other.address
            && self.network == other.network
            && self.scheme == other.scheme
            && self.metadata == other.metadata
    }

    /// `scheme://address`
    pub fn url(&self) -> String {
        format!("{}://{}", self.scheme, self.address)
    }
}

/// Identity of a node across the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub name: String,
    pub version: String,
    pub node_id: String,
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.name, self.version, self.node_id)
    }
}

/// TTLs travel as integer milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
