//! Resolution results.

use crate::domain::node::ServiceNode;
use serde::{Deserialize, Serialize};

/// Nodes of one service, at most one entry per `(version, node_id)`.
///
/// A query for an empty version returns every version, so the version is
/// part of the de-duplication key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSet {
    pub name: String,
    pub version: String,
    nodes: Vec<ServiceNode>,
}

impl ServiceSet {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            nodes: Vec::new(),
        }
    }

    /// Insert or replace a node. Returns `true` if it was new.
    pub fn insert(&mut self, node: ServiceNode) -> bool {
        match self
            .nodes
            .iter_mut()
            .find(|n| n.node_id == node.node_id && n.version == node.version)
        {
            Some(existing) => {
                *existing = node;
                false
            }
            None => {
                self.nodes.push(node);
                true
            }
        }
    }

    /// Merge nodes into the set; later entries replace earlier ones.
    pub fn merge(&mut self, nodes: impl IntoIterator<Item = ServiceNode>) {
        for node in nodes {
            self.insert(node);
        }
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|n| n.node_id == node_id)
    }

    pub fn get(&self, node_id: &str) -> Option<&ServiceNode> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }

    pub fn nodes(&self) -> &[ServiceNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<ServiceNode> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Only the nodes whose scheme is listed.
    pub fn filter_scheme(&self, schemes: &[String]) -> Self {
        Self {
            name: self.name.clone(),
            version: self.version.clone(),
            nodes: self
                .nodes
                .iter()
                .filter(|n| schemes.iter().any(|s| s == &n.scheme))
                .cloned()
                .collect(),
        }
    }

    /// Nodes sorted by `(version, node_id)`.
    pub fn sorted(mut self) -> Self {
        self.nodes
            .sort_by(|a, b| (&a.version, &a.node_id).cmp(&(&b.version, &b.node_id)));
        self
    }
}
