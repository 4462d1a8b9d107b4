//! # Watch Streams
//!
//! A watch delivers only real changes to the watched service, ends when its
//! context is cancelled, and reports a lost bus once before ending.

#[cfg(test)]
mod tests {
    use crate::integration::{greeter, start_registry, test_config};
    use futures::StreamExt;
    use service_registry::{Registry, RegistryConfig, RegistryError, ServiceNode, WatchAction};
    use shared_bus::InMemoryBus;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    const WAIT: Duration = Duration::from_secs(2);

    // =============================================================================
    // DELTAS
    // =============================================================================

    #[tokio::test]
    async fn test_refresh_duplicates_are_suppressed() {
        let bus = InMemoryBus::new();
        let fast_refresh = RegistryConfig::builder()
            .timeout(Duration::from_millis(300))
            .refresh_interval(Duration::from_millis(20))
            .build()
            .unwrap();
        let owner = start_registry(&bus, fast_refresh).await;
        let observer = start_registry(&bus, test_config()).await;
        let ctx = CancellationToken::new();
        let mut stream = observer.watch(ctx.clone(), "greeter").await.unwrap();

        owner.register(&ctx, &greeter("a")).await.unwrap();
        let first = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(first.action, WatchAction::Register);

        // several refreshes go by without a second event
        assert!(timeout(Duration::from_millis(200), stream.next()).await.is_err());
        assert!(bus.events_published() > 3);

        owner.deregister(&ctx, &greeter("a")).await.unwrap();
        let last = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(last.action, WatchAction::Deregister);
        assert_eq!(last.node.node_id, "a");
    }

    #[tokio::test]
    async fn test_interleaved_nodes_keep_their_order() {
        let bus = InMemoryBus::new();
        let owner = start_registry(&bus, test_config()).await;
        let observer = start_registry(&bus, test_config()).await;
        let ctx = CancellationToken::new();
        let mut stream = observer.watch(ctx.clone(), "greeter").await.unwrap();

        owner.register(&ctx, &greeter("n1")).await.unwrap();
        owner.register(&ctx, &greeter("n2")).await.unwrap();
        owner.register(&ctx, &greeter("n1")).await.unwrap();
        owner.deregister(&ctx, &greeter("n1")).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            let event = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
            seen.push((event.action, event.node.node_id));
        }
        assert_eq!(
            seen,
            [
                (WatchAction::Register, "n1".to_string()),
                (WatchAction::Register, "n2".to_string()),
                (WatchAction::Deregister, "n1".to_string()),
            ]
        );
        assert!(timeout(Duration::from_millis(100), stream.next()).await.is_err());
    }

    #[tokio::test]
    async fn test_endpoint_change_is_reported() {
        let bus = InMemoryBus::new();
        let owner = start_registry(&bus, test_config()).await;
        let observer = start_registry(&bus, test_config()).await;
        let ctx = CancellationToken::new();
        let mut stream = observer.watch(ctx.clone(), "greeter").await.unwrap();

        owner.register(&ctx, &greeter("a")).await.unwrap();
        owner
            .register(&ctx, &greeter("a").with_metadata("zone", "eu-west"))
            .await
            .unwrap();

        let first = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
        let second = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(first.action, WatchAction::Register);
        assert_eq!(second.action, WatchAction::Register);
        assert_eq!(second.node.metadata.get("zone").map(String::as_str), Some("eu-west"));
    }

    #[tokio::test]
    async fn test_other_services_are_filtered() {
        let bus = InMemoryBus::new();
        let owner = start_registry(&bus, test_config()).await;
        let observer = start_registry(&bus, test_config()).await;
        let ctx = CancellationToken::new();
        let mut stream = observer.watch(ctx.clone(), "greeter").await.unwrap();

        owner
            .register(&ctx, &ServiceNode::new("billing", "v1", "b", "10.2.0.1:9000"))
            .await
            .unwrap();
        owner.register(&ctx, &greeter("a")).await.unwrap();

        let event = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(event.node.name, "greeter");
    }

    #[tokio::test]
    async fn test_independent_watchers_see_same_deltas() {
        let bus = InMemoryBus::new();
        let owner = start_registry(&bus, test_config()).await;
        let observer = start_registry(&bus, test_config()).await;
        let ctx = CancellationToken::new();
        let mut left = observer.watch(ctx.clone(), "greeter").await.unwrap();
        let mut right = owner.watch(ctx.clone(), "greeter").await.unwrap();

        owner.register(&ctx, &greeter("a")).await.unwrap();

        for stream in [&mut left, &mut right] {
            let event = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
            assert_eq!(event.action, WatchAction::Register);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_deregistered_nodes_stay_gone_under_refresh() {
        let bus = InMemoryBus::with_capacity(100_000);
        let fast_refresh = RegistryConfig::builder()
            .timeout(Duration::from_millis(300))
            .refresh_interval(Duration::from_millis(10))
            .build()
            .unwrap();
        let owner = start_registry(&bus, fast_refresh).await;
        let observer = start_registry(&bus, test_config()).await;
        let ctx = CancellationToken::new();
        let mut stream = observer.watch(ctx.clone(), "greeter").await.unwrap();

        let nodes: Vec<_> = (0..200).map(|i| greeter(&format!("n{i}"))).collect();
        for node in &nodes {
            owner.register(&ctx, node).await.unwrap();
        }
        for node in &nodes {
            owner.deregister(&ctx, node).await.unwrap();
        }

        let mut last = HashMap::new();
        while let Ok(Some(event)) = timeout(Duration::from_millis(300), stream.next()).await {
            let event = event.unwrap();
            last.insert(event.node.node_id, event.action);
        }
        assert_eq!(last.len(), nodes.len());
        assert!(last.values().all(|action| *action == WatchAction::Deregister));
    }

    // =============================================================================
    // TERMINATION
    // =============================================================================

    #[tokio::test]
    async fn test_cancellation_ends_the_stream() {
        let bus = InMemoryBus::new();
        let observer = start_registry(&bus, test_config()).await;
        let ctx = CancellationToken::new();
        let mut stream = observer.watch(ctx.clone(), "greeter").await.unwrap();

        ctx.cancel();
        observer.register(&CancellationToken::new(), &greeter("late")).await.unwrap();
        assert!(timeout(WAIT, stream.next()).await.unwrap().is_none());
        assert!(stream.is_closed());
    }

    #[tokio::test]
    async fn test_watch_with_cancelled_context_is_cancelled() {
        let bus = InMemoryBus::new();
        let observer = start_registry(&bus, test_config()).await;
        let ctx = CancellationToken::new();
        ctx.cancel();

        assert!(matches!(
            observer.watch(ctx, "greeter").await,
            Err(RegistryError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_bus_loss_yields_one_error_then_ends() {
        let bus = InMemoryBus::new();
        let observer = start_registry(&bus, test_config()).await;
        let mut stream = observer
            .watch(CancellationToken::new(), "greeter")
            .await
            .unwrap();

        bus.shutdown();
        let failure = timeout(WAIT, stream.next()).await.unwrap().unwrap();
        assert!(matches!(failure, Err(RegistryError::BackendUnavailable(_))));
        assert!(timeout(WAIT, stream.next()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stopping_the_registry_does_not_end_foreign_watches() {
        let bus = InMemoryBus::new();
        let owner = start_registry(&bus, test_config()).await;
        let observer = start_registry(&bus, test_config()).await;
        let ctx = CancellationToken::new();
        let mut stream = observer.watch(ctx.clone(), "greeter").await.unwrap();

        owner.register(&ctx, &greeter("a")).await.unwrap();
        owner.stop(&ctx).await.unwrap();

        let actions: Vec<_> = stream
            .by_ref()
            .take(2)
            .map(|event| event.unwrap().action)
            .collect()
            .await;
        assert_eq!(actions, [WatchAction::Register, WatchAction::Deregister]);
        assert!(!stream.is_closed());
    }
}
