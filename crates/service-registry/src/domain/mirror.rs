//! Watch mirror
//!
//! A watcher's private view of one service, built only from advertisements.
//! Turns the raw advertisement stream into deltas: unchanged re-announcements
//! are swallowed, and nodes that stop being announced expire after their TTL.

use crate::domain::node::ServiceNode;
use crate::domain::watch::{WatchAction, WatchEvent};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
struct MirrorEntry {
    node: ServiceNode,
    last_seen: Instant,
}

/// Entries keyed by `(version, node_id)`.
#[derive(Debug)]
pub struct WatchMirror {
    service: String,
    entries: HashMap<(String, String), MirrorEntry>,
}

impl WatchMirror {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: HashMap::new(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Apply one advertisement. Returns the delta to emit, if any.
    ///
    /// - Register of an unknown node: emits Register.
    /// - Register of a known node with a new endpoint: emits Register.
    /// - Register of a known, unchanged node: refreshes `last_seen` only.
    /// - Deregister of a known node: emits Deregister.
    /// - Deregister of an unknown node: nothing.
    pub fn observe(&mut self, action: WatchAction, node: ServiceNode, now: Instant) -> Option<WatchEvent> {
        if node.name != self.service {
            return None;
        }
        let key = (node.version.clone(), node.node_id.clone());

        match action {
            WatchAction::Register => match self.entries.get_mut(&key) {
                Some(entry) => {
                    let changed = !entry.node.same_endpoint(&node);
                    entry.node = node.clone();
                    entry.last_seen = now;
                    changed.then(|| WatchEvent::register(node))
                }
                None => {
                    self.entries.insert(
                        key,
                        MirrorEntry {
                            node: node.clone(),
                            last_seen: now,
                        },
                    );
                    Some(WatchEvent::register(node))
                }
            },
            WatchAction::Deregister => self
                .entries
                .remove(&key)
                .map(|_| WatchEvent::deregister(node)),
        }
    }

    /// Remove nodes not seen for longer than their TTL.
    pub fn expire(&mut self, now: Instant) -> Vec<WatchEvent> {
        let mut expired: Vec<(String, String)> = self
            .entries
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.last_seen) > e.node.ttl)
            .map(|(k, _)| k.clone())
            .collect();
        expired.sort();

        expired
            .into_iter()
            .filter_map(|k| self.entries.remove(&k))
            .map(|e| WatchEvent::deregister(e.node))
            .collect()
    }

    /// Sweep period: half the smallest TTL, clamped to `[floor, ceiling]`.
    pub fn sweep_interval(&self, floor: Duration, ceiling: Duration) -> Duration {
        self.entries
            .values()
            .map(|e| e.node.ttl / 2)
            .min()
            .unwrap_or(ceiling)
            .clamp(floor, ceiling.max(floor))
    }

    pub fn contains(&self, version: &str, node_id: &str) -> bool {
        self.entries
            .contains_key(&(version.to_string(), node_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
