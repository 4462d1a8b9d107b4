//! Wire messages exchanged on the registry topics, JSON encoded.

use crate::domain::{RegistryError, ServiceNode, WatchAction};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_bus::message::now_ms;
use std::fmt;
use uuid::Uuid;

/// Published on the watch topic whenever a node is registered, refreshed or
/// deregistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advertisement {
    pub action: WatchAction,
    pub node: ServiceNode,
    /// Instance id of the publishing registry.
    pub origin: String,
    pub sent_at_ms: u64,
}

impl Advertisement {
    pub fn new(action: WatchAction, node: ServiceNode, origin: impl Into<String>) -> Self {
        Self {
            action,
            node,
            origin: origin.into(),
            sent_at_ms: now_ms(),
        }
    }
}

/// Published on the query topic with a reply inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub correlation_id: CorrelationId,
    pub name: String,
    /// Empty matches every version.
    #[serde(default)]
    pub version: String,
}

/// One advertiser's answer to a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryReply {
    pub correlation_id: CorrelationId,
    /// Instance id of the answering registry.
    pub responder: String,
    pub nodes: Vec<ServiceNode>,
}

/// Correlates query replies with the request they answer.
///
/// UUID v7, so ids sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, RegistryError> {
    serde_json::to_vec(value).map_err(|e| RegistryError::Codec(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RegistryError> {
    serde_json::from_slice(bytes).map_err(|e| RegistryError::Codec(e.to_string()))
}
