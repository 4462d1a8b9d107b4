//! Node Record Store
//!
//! Nodes registered through this registry instance. The advertiser answers
//! queries from here and re-publishes these records to keep them alive.

use crate::domain::node::{NodeKey, ServiceNode};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// The node existed; its record and TTL clock were replaced.
    Updated,
}

#[derive(Debug, Clone)]
struct LocalRecord {
    node: ServiceNode,
    refreshed_at: Instant,
}

/// Thread-safe table of locally registered nodes.
#[derive(Debug, Default)]
pub struct NodeRecordStore {
    records: RwLock<HashMap<NodeKey, LocalRecord>>,
}

impl NodeRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node, resetting its TTL clock.
    pub fn upsert(&self, node: ServiceNode) -> UpsertOutcome {
        let record = LocalRecord {
            node,
            refreshed_at: Instant::now(),
        };
        match self.records.write().insert(record.node.key(), record) {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Inserted,
        }
    }

    /// Remove a node. Returns the removed record, if any.
    pub fn remove(&self, key: &NodeKey) -> Option<ServiceNode> {
        self.records.write().remove(key).map(|r| r.node)
    }

    pub fn get(&self, key: &NodeKey) -> Option<ServiceNode> {
        self.records.read().get(key).map(|r| r.node.clone())
    }

    /// Nodes of `name`; an empty `version` matches every version.
    pub fn find(&self, name: &str, version: &str) -> Vec<ServiceNode> {
        self.records
            .read()
            .values()
            .filter(|r| r.node.name == name && (version.is_empty() || r.node.version == version))
            .map(|r| r.node.clone())
            .collect()
    }

    pub fn all(&self) -> Vec<ServiceNode> {
        self.records.read().values().map(|r| r.node.clone()).collect()
    }

    /// Mark every record as freshly advertised.
    pub fn touch_all(&self) {
        let now = Instant::now();
        for record in self.records.write().values_mut() {
            record.refreshed_at = now;
        }
    }

    /// When a node was last registered or refreshed.
    pub fn refreshed_at(&self, key: &NodeKey) -> Option<Instant> {
        self.records.read().get(key).map(|r| r.refreshed_at)
    }

    /// Smallest TTL among stored nodes.
    pub fn min_ttl(&self) -> Option<Duration> {
        self.records.read().values().map(|r| r.node.ttl).min()
    }

    /// Remove and return every node.
    pub fn drain(&self) -> Vec<ServiceNode> {
        self.records.write().drain().map(|(_, r)| r.node).collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(version: &str, id: &str) -> ServiceNode {
        ServiceNode::new("greeter", version, id, format!("{id}:8080"))
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let store = NodeRecordStore::new();
        assert_eq!(store.upsert(node("v1", "a")), UpsertOutcome::Inserted);
        assert_eq!(store.upsert(node("v1", "a")), UpsertOutcome::Updated);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_find_by_version() {
        let store = NodeRecordStore::new();
        store.upsert(node("v1", "a"));
        store.upsert(node("v2", "b"));
        store.upsert(ServiceNode::new("other", "v1", "c", "c:1"));

        assert_eq!(store.find("greeter", "v1").len(), 1);
        assert_eq!(store.find("greeter", "").len(), 2);
        assert!(store.find("missing", "").is_empty());
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let store = NodeRecordStore::new();
        assert!(store.remove(&node("v1", "a").key()).is_none());
    }

    #[test]
    fn test_min_ttl_and_drain() {
        let store = NodeRecordStore::new();
        assert_eq!(store.min_ttl(), None);
        store.upsert(node("v1", "a").with_ttl(Duration::from_secs(10)));
        store.upsert(node("v1", "b").with_ttl(Duration::from_secs(2)));
        assert_eq!(store.min_ttl(), Some(Duration::from_secs(2)));

        assert_eq!(store.drain().len(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_upsert_resets_ttl_clock() {
        let store = NodeRecordStore::new();
        let n = node("v1", "a");
        store.upsert(n.clone());
        let first = store.refreshed_at(&n.key()).unwrap();

        tokio::time::advance(Duration::from_secs(3)).await;
        store.upsert(n.clone());
        let second = store.refreshed_at(&n.key()).unwrap();
        assert_eq!(second - first, Duration::from_secs(3));
    }
}
