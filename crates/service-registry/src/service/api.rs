use crate::domain::{RegistryError, ServiceNode, ServiceSet, BACKEND_BUS};
use crate::ports::{Registry, WatchStream};
use crate::service::BusRegistry;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[async_trait]
impl Registry for BusRegistry {
    fn backend_name(&self) -> &'static str {
        BACKEND_BUS
    }

    async fn start(&self, ctx: &CancellationToken) -> Result<(), RegistryError> {
        self.start_inner(ctx).await
    }

    async fn stop(&self, ctx: &CancellationToken) -> Result<(), RegistryError> {
        self.stop_inner(ctx).await
    }

    async fn register(&self, ctx: &CancellationToken, node: &ServiceNode) -> Result<(), RegistryError> {
        self.register_inner(ctx, node).await
    }

    async fn deregister(&self, ctx: &CancellationToken, node: &ServiceNode) -> Result<(), RegistryError> {
        self.deregister_inner(ctx, node).await
    }

    async fn get_service(
        &self,
        ctx: &CancellationToken,
        name: &str,
        version: &str,
    ) -> Result<ServiceSet, RegistryError> {
        if !self.is_started().await {
            return Err(RegistryError::NotStarted);
        }
        self.resolver.resolve(ctx, name, version).await
    }

    async fn watch(&self, ctx: CancellationToken, name: &str) -> Result<WatchStream, RegistryError> {
        if !self.is_started().await {
            return Err(RegistryError::NotStarted);
        }
        self.watcher.watch(ctx, name).await
    }
}
