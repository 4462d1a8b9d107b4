use crate::domain::{RegistryConfig, RegistryError, ServiceNode, ServiceSet, BACKEND_LOCAL};
use crate::ports::{Registry, WatchStream};
use crate::service::BusRegistry;
use async_trait::async_trait;
use shared_bus::InMemoryBus;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Single-process registry over a private in-memory bus.
///
/// Its own advertiser is the only responder, so quorum is fixed at 1 and a
/// started instance always answers its own queries.
pub struct LocalRegistry {
    inner: BusRegistry,
    bus: InMemoryBus,
}

impl LocalRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let bus = InMemoryBus::new();
        let config = RegistryConfig {
            backend: BACKEND_LOCAL.to_string(),
            quorum: 1,
            secure: false,
            tls: None,
            ..config
        };
        let inner = BusRegistry::new(config, Arc::new(bus.client()))?;
        Ok(Self { inner, bus })
    }

    pub fn instance_id(&self) -> &str {
        self.inner.instance_id()
    }

    pub fn local_nodes(&self) -> Vec<ServiceNode> {
        self.inner.local_nodes()
    }

    /// Messages published on the private bus so far.
    pub fn messages_published(&self) -> u64 {
        self.bus.events_published()
    }
}

#[async_trait]
impl Registry for LocalRegistry {
    fn backend_name(&self) -> &'static str {
        BACKEND_LOCAL
    }

    async fn start(&self, ctx: &CancellationToken) -> Result<(), RegistryError> {
        self.inner.start(ctx).await
    }

    async fn stop(&self, ctx: &CancellationToken) -> Result<(), RegistryError> {
        self.inner.stop(ctx).await
    }

    async fn register(&self, ctx: &CancellationToken, node: &ServiceNode) -> Result<(), RegistryError> {
        self.inner.register(ctx, node).await
    }

    async fn deregister(&self, ctx: &CancellationToken, node: &ServiceNode) -> Result<(), RegistryError> {
        self.inner.deregister(ctx, node).await
    }

    async fn get_service(
        &self,
        ctx: &CancellationToken,
        name: &str,
        version: &str,
    ) -> Result<ServiceSet, RegistryError> {
        self.inner.get_service(ctx, name, version).await
    }

    async fn watch(&self, ctx: CancellationToken, name: &str) -> Result<WatchStream, RegistryError> {
        self.inner.watch(ctx, name).await
    }
}
