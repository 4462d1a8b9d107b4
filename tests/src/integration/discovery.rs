//! # Discovery Across Instances
//!
//! Three registries share one bus. Nodes registered on any of them must be
//! resolvable from every other, and quorum bounds how long a query waits.

#[cfg(test)]
mod tests {
    use crate::integration::{greeter, start_cluster, start_registry, test_config};
    use service_registry::{Registry, RegistryConfig, RegistryError, ServiceNode};
    use shared_bus::InMemoryBus;
    use std::time::Duration;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    // =============================================================================
    // RESOLUTION ACROSS PEERS
    // =============================================================================

    #[tokio::test]
    async fn test_nodes_from_all_peers_are_merged() {
        let bus = InMemoryBus::new();
        let config = RegistryConfig::builder()
            .quorum(3)
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let cluster = start_cluster(&bus, &config, 3).await;
        let ctx = CancellationToken::new();

        cluster[1].register(&ctx, &greeter("b")).await.unwrap();
        cluster[2].register(&ctx, &greeter("c")).await.unwrap();

        let set = cluster[0].get_service(&ctx, "greeter", "v1").await.unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("b"));
        assert!(set.contains("c"));
    }

    #[tokio::test]
    async fn test_versions_are_kept_apart() {
        let bus = InMemoryBus::new();
        let config = RegistryConfig::builder()
            .quorum(2)
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let cluster = start_cluster(&bus, &config, 2).await;
        let ctx = CancellationToken::new();

        cluster[0].register(&ctx, &greeter("a")).await.unwrap();
        cluster[1]
            .register(&ctx, &ServiceNode::new("greeter", "v2", "b", "10.1.0.9:9000"))
            .await
            .unwrap();

        let v2 = cluster[0].get_service(&ctx, "greeter", "v2").await.unwrap();
        assert_eq!(v2.len(), 1);
        assert!(v2.contains("b"));

        let any = cluster[0].get_service(&ctx, "greeter", "").await.unwrap();
        assert_eq!(any.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_service_is_empty_not_cancelled() {
        let bus = InMemoryBus::new();
        let cluster = start_cluster(&bus, &test_config(), 2).await;

        // every started instance answers, so an unknown name is an empty set
        let set = cluster[0]
            .get_service(&CancellationToken::new(), "billing", "v1")
            .await
            .unwrap();
        assert!(set.is_empty());
    }

    // =============================================================================
    // QUORUM
    // =============================================================================

    #[tokio::test]
    async fn test_quorum_returns_before_timeout() {
        let bus = InMemoryBus::new();
        let config = RegistryConfig::builder()
            .quorum(2)
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let cluster = start_cluster(&bus, &config, 3).await;
        let ctx = CancellationToken::new();
        cluster[1].register(&ctx, &greeter("b")).await.unwrap();
        cluster[2].register(&ctx, &greeter("c")).await.unwrap();

        let started = Instant::now();
        let set = cluster[0].get_service(&ctx, "greeter", "v1").await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
        // two of three replies, at least one from a peer holding a node
        assert!(!set.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmet_quorum_returns_partial_set_at_deadline() {
        let bus = InMemoryBus::new();
        let config = RegistryConfig::builder()
            .quorum(5)
            .timeout(Duration::from_millis(400))
            .build()
            .unwrap();
        let cluster = start_cluster(&bus, &config, 2).await;
        let ctx = CancellationToken::new();
        cluster[1].register(&ctx, &greeter("b")).await.unwrap();

        let started = Instant::now();
        let set = cluster[0].get_service(&ctx, "greeter", "v1").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(400));
        assert!(set.contains("b"));
    }

    // =============================================================================
    // CANCELLATION AND FAILURE
    // =============================================================================

    #[tokio::test]
    async fn test_cancelled_query_is_cancelled() {
        let bus = InMemoryBus::new();
        let registry = start_registry(&bus, test_config()).await;
        let ctx = CancellationToken::new();
        ctx.cancel();

        assert_eq!(
            registry.get_service(&ctx, "greeter", "v1").await,
            Err(RegistryError::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_query_after_bus_loss_is_backend_unavailable() {
        let bus = InMemoryBus::new();
        let registry = start_registry(&bus, test_config()).await;
        bus.shutdown();

        assert!(matches!(
            registry
                .get_service(&CancellationToken::new(), "greeter", "v1")
                .await,
            Err(RegistryError::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_restart_after_bus_outage() {
        let bus = InMemoryBus::new();
        let registry = start_registry(&bus, test_config()).await;
        let ctx = CancellationToken::new();

        bus.shutdown();
        bus.restore();
        registry.stop(&ctx).await.unwrap();
        registry.start(&ctx).await.unwrap();

        registry.register(&ctx, &greeter("a")).await.unwrap();
        let set = registry.get_service(&ctx, "greeter", "v1").await.unwrap();
        assert!(set.contains("a"));
    }
}
