//! # TTL Expiry
//!
//! A registry that disappears without deregistering stops refreshing its
//! nodes. Watchers must report those nodes gone within 1.5x their TTL, and
//! queries must stop returning them. Runs on a paused clock.

#[cfg(test)]
mod tests {
    use crate::integration::{greeter, start_registry, test_config};
    use futures::StreamExt;
    use service_registry::domain::SWEEP_FLOOR;
    use service_registry::{Registry, WatchAction};
    use shared_bus::InMemoryBus;
    use std::time::Duration;
    use tokio::time::{timeout, Instant};
    use tokio_util::sync::CancellationToken;

    const TTL: Duration = Duration::from_secs(2);

    #[tokio::test(start_paused = true)]
    async fn test_crashed_node_expires_within_ttl_and_a_half() {
        let bus = InMemoryBus::new();
        let owner = start_registry(&bus, test_config()).await;
        let observer = start_registry(&bus, test_config()).await;
        let ctx = CancellationToken::new();
        let mut stream = observer.watch(ctx.clone(), "greeter").await.unwrap();

        owner
            .register(&ctx, &greeter("a").with_ttl(TTL))
            .await
            .unwrap();
        let registered = timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(registered.action, WatchAction::Register);

        // crash: no deregistration is advertised
        let crashed_at = Instant::now();
        drop(owner);

        let expired = timeout(Duration::from_secs(10), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(expired.action, WatchAction::Deregister);
        assert_eq!(expired.node.node_id, "a");
        assert!(crashed_at.elapsed() <= TTL * 3 / 2 + SWEEP_FLOOR);

        let set = observer.get_service(&ctx, "greeter", "v1").await.unwrap();
        assert!(!set.contains("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshed_node_never_expires() {
        let bus = InMemoryBus::new();
        let owner = start_registry(&bus, test_config()).await;
        let observer = start_registry(&bus, test_config()).await;
        let ctx = CancellationToken::new();
        let mut stream = observer.watch(ctx.clone(), "greeter").await.unwrap();

        owner
            .register(&ctx, &greeter("a").with_ttl(TTL))
            .await
            .unwrap();
        let registered = stream.next().await.unwrap().unwrap();
        assert_eq!(registered.action, WatchAction::Register);

        // refreshes every TTL/2 are swallowed by the mirror
        assert!(timeout(TTL * 5, stream.next()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_survivors_keep_their_nodes() {
        let bus = InMemoryBus::new();
        let survivor = start_registry(&bus, test_config()).await;
        let crashed = start_registry(&bus, test_config()).await;
        let observer = start_registry(&bus, test_config()).await;
        let ctx = CancellationToken::new();
        let mut stream = observer.watch(ctx.clone(), "greeter").await.unwrap();

        survivor
            .register(&ctx, &greeter("alive").with_ttl(TTL))
            .await
            .unwrap();
        crashed
            .register(&ctx, &greeter("dead").with_ttl(TTL))
            .await
            .unwrap();
        for _ in 0..2 {
            let event = stream.next().await.unwrap().unwrap();
            assert_eq!(event.action, WatchAction::Register);
        }
        drop(crashed);

        let expired = timeout(Duration::from_secs(10), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(expired.action, WatchAction::Deregister);
        assert_eq!(expired.node.node_id, "dead");
        assert!(timeout(TTL * 3, stream.next()).await.is_err());
    }
}
