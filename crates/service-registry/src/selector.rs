//! Client-side node selection on top of `GetService`.

use crate::domain::{RegistryError, ServiceNode, ServiceSet};
use crate::ports::Registry;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// How to pick one node out of a resolved set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionStrategy {
    #[default]
    Random,
    RoundRobin,
}

/// Resolves a service and picks one node to dial.
pub struct NodeSelector {
    registry: Arc<dyn Registry>,
    strategy: SelectionStrategy,
    schemes: Vec<String>,
    cursor: AtomicUsize,
}

impl NodeSelector {
    pub fn new(registry: Arc<dyn Registry>, strategy: SelectionStrategy) -> Self {
        Self {
            registry,
            strategy,
            schemes: Vec::new(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Only consider nodes speaking one of `schemes`, in preference order.
    pub fn with_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemes = schemes.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve `name`/`version` and pick a node.
    ///
    /// With preferred schemes, the first scheme that has any node wins.
    pub async fn select(
        &self,
        ctx: &CancellationToken,
        name: &str,
        version: &str,
    ) -> Result<ServiceNode, RegistryError> {
        let set = self.registry.get_service(ctx, name, version).await?.sorted();

        let candidates = if self.schemes.is_empty() {
            set
        } else {
            self.schemes
                .iter()
                .map(|scheme| set.filter_scheme(std::slice::from_ref(scheme)))
                .find(|s| !s.is_empty())
                .unwrap_or_else(|| ServiceSet::new(name, version))
        };

        let nodes = candidates.into_nodes();
        if nodes.is_empty() {
            return Err(RegistryError::not_found(name, version));
        }
        let index = match self.strategy {
            SelectionStrategy::Random => rand::thread_rng().gen_range(0..nodes.len()),
            SelectionStrategy::RoundRobin => self.cursor.fetch_add(1, Ordering::Relaxed) % nodes.len(),
        };
        trace!(service = name, index, candidates = nodes.len(), "Node selected");
        Ok(nodes[index].clone())
    }

    /// `scheme://address` of a selected node.
    pub async fn resolve_url(
        &self,
        ctx: &CancellationToken,
        name: &str,
        version: &str,
    ) -> Result<String, RegistryError> {
        Ok(self.select(ctx, name, version).await?.url())
    }
}
