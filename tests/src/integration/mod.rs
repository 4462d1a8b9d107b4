//! Multi-instance registry scenarios over a shared [`InMemoryBus`].

pub mod discovery;
pub mod expiry;
pub mod watch;
pub mod wiring;

use service_registry::{BusRegistry, Registry, RegistryConfig, ServiceNode};
use shared_bus::InMemoryBus;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Config tuned for tests: short query timeout.
pub fn test_config() -> RegistryConfig {
    RegistryConfig::builder()
        .timeout(Duration::from_millis(300))
        .build()
        .expect("valid test config")
}

/// A started registry on `bus`.
pub async fn start_registry(bus: &InMemoryBus, config: RegistryConfig) -> BusRegistry {
    let registry = BusRegistry::connect(config, bus).expect("connect registry");
    registry
        .start(&CancellationToken::new())
        .await
        .expect("start registry");
    registry
}

/// `count` started registries on `bus` sharing one config.
pub async fn start_cluster(bus: &InMemoryBus, config: &RegistryConfig, count: usize) -> Vec<BusRegistry> {
    let mut registries = Vec::with_capacity(count);
    for _ in 0..count {
        registries.push(start_registry(bus, config.clone()).await);
    }
    registries
}

pub fn greeter(id: &str) -> ServiceNode {
    ServiceNode::new("greeter", "v1", id, format!("10.1.0.{}:9000", id.len()))
}
