//! # Wiring
//!
//! Backend selection through the factory, and the server/client helpers on
//! top of a multi-instance registry.

#[cfg(test)]
mod tests {
    use crate::integration::{greeter, start_registry, test_config};
    use service_registry::{
        register_builtin_backends, BackendDeps, BackendFactory, NodeSelector, Registry,
        RegistryConfig, RegistryError, SelectionStrategy, ServiceEntrypoint, ServiceNode,
    };
    use shared_bus::InMemoryBus;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn peer_config(quorum: usize) -> RegistryConfig {
        RegistryConfig::builder()
            .quorum(quorum)
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap()
    }

    // =============================================================================
    // BACKEND FACTORY
    // =============================================================================

    #[tokio::test]
    async fn test_factory_built_registries_share_the_bus() {
        let factory = BackendFactory::new();
        register_builtin_backends(&factory);
        let bus = InMemoryBus::new();
        let deps = BackendDeps::with_connector(Arc::new(bus.clone()));
        let ctx = CancellationToken::new();

        let server = factory.create(peer_config(1), &deps).unwrap();
        let client = factory.create(peer_config(2), &deps).unwrap();
        server.start(&ctx).await.unwrap();
        client.start(&ctx).await.unwrap();

        server.register(&ctx, &greeter("a")).await.unwrap();
        let set = client.get_service(&ctx, "greeter", "v1").await.unwrap();
        assert!(set.contains("a"));
    }

    #[tokio::test]
    async fn test_local_backends_are_isolated() {
        let factory = BackendFactory::new();
        register_builtin_backends(&factory);
        let config = RegistryConfig::builder().backend("local").build().unwrap();
        let ctx = CancellationToken::new();

        let first = factory.create(config.clone(), &BackendDeps::default()).unwrap();
        let second = factory.create(config, &BackendDeps::default()).unwrap();
        first.start(&ctx).await.unwrap();
        second.start(&ctx).await.unwrap();

        first.register(&ctx, &greeter("a")).await.unwrap();
        assert!(first.get_service(&ctx, "greeter", "v1").await.unwrap().contains("a"));
        assert!(second.get_service(&ctx, "greeter", "v1").await.unwrap().is_empty());
    }

    #[test]
    fn test_uninitialised_factory_rejects_every_backend() {
        let factory = BackendFactory::new();
        for backend in ["bus", "local"] {
            let config = RegistryConfig::builder().backend(backend).build().unwrap();
            assert!(matches!(
                factory.create(config, &BackendDeps::default()),
                Err(RegistryError::UnknownBackend(_))
            ));
        }
    }

    // =============================================================================
    // ENTRYPOINT AND SELECTOR
    // =============================================================================

    #[tokio::test]
    async fn test_entrypoints_are_discoverable_by_selector() {
        let bus = InMemoryBus::new();
        let ctx = CancellationToken::new();
        let server_a: Arc<dyn Registry> = Arc::new(start_registry(&bus, peer_config(1)).await);
        let server_b: Arc<dyn Registry> = Arc::new(start_registry(&bus, peer_config(1)).await);
        let client: Arc<dyn Registry> = Arc::new(start_registry(&bus, peer_config(3)).await);

        let a = ServiceEntrypoint::new(greeter("a"), server_a).unwrap();
        let b = ServiceEntrypoint::new(
            ServiceNode::new("greeter", "v1", "b", "10.1.0.2:9000"),
            server_b,
        )
        .unwrap();
        a.start(&ctx).await.unwrap();
        b.start(&ctx).await.unwrap();

        let selector = NodeSelector::new(client, SelectionStrategy::RoundRobin);
        let picked: HashSet<_> = [
            selector.select(&ctx, "greeter", "v1").await.unwrap().node_id,
            selector.select(&ctx, "greeter", "v1").await.unwrap().node_id,
        ]
        .into();
        assert_eq!(picked, ["a".to_string(), "b".to_string()].into());

        b.stop(&ctx).await.unwrap();
        let url = selector.resolve_url(&ctx, "greeter", "v1").await.unwrap();
        assert_eq!(url, "http://10.1.0.1:9000");
    }

    #[tokio::test]
    async fn test_selector_reports_not_found_when_nobody_serves() {
        let bus = InMemoryBus::new();
        let client: Arc<dyn Registry> = Arc::new(start_registry(&bus, test_config()).await);
        let selector = NodeSelector::new(client, SelectionStrategy::Random);

        assert!(matches!(
            selector.select(&CancellationToken::new(), "greeter", "v1").await,
            Err(RegistryError::NotFound { .. })
        ));
    }
}
