//! Server-side integration: register a service node when the server starts
//! and deregister it when the server stops.

use crate::domain::{RegistryError, ServiceNode};
use crate::ports::Registry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Ties one server endpoint to the registry.
pub struct ServiceEntrypoint {
    node: ServiceNode,
    registry: Arc<dyn Registry>,
    started: AtomicBool,
    transition: Mutex<()>,
}

impl ServiceEntrypoint {
    pub fn new(node: ServiceNode, registry: Arc<dyn Registry>) -> Result<Self, RegistryError> {
        node.validate()?;
        Ok(Self {
            node,
            registry,
            started: AtomicBool::new(false),
            transition: Mutex::new(()),
        })
    }

    pub fn node(&self) -> &ServiceNode {
        &self.node
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Register the node. Calling it again while started is a no-op.
    pub async fn start(&self, ctx: &CancellationToken) -> Result<(), RegistryError> {
        let _guard = self.transition.lock().await;
        if self.is_started() {
            return Ok(());
        }
        self.registry.register(ctx, &self.node).await?;
        self.started.store(true, Ordering::SeqCst);
        info!(node = %self.node.key(), url = %self.node.url(), "Entrypoint started");
        Ok(())
    }

    /// Deregister the node. Calling it again while stopped is a no-op.
    pub async fn stop(&self, ctx: &CancellationToken) -> Result<(), RegistryError> {
        let _guard = self.transition.lock().await;
        if !self.is_started() {
            return Ok(());
        }
        self.registry.deregister(ctx, &self.node).await?;
        self.started.store(false, Ordering::SeqCst);
        info!(node = %self.node.key(), "Entrypoint stopped");
        Ok(())
    }
}
