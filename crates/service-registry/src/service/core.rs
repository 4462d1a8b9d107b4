use crate::adapters::{Advertiser, Resolver, Watcher};
use crate::domain::{
    NodeRecordStore, RegistryConfig, RegistryError, ServiceNode, UpsertOutcome, WatchAction,
};
use registry_telemetry::LOCAL_NODES;
use shared_bus::{BusClient, BusConnector, SubjectFilter};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Background tasks of a started registry.
struct Running {
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Message-bus backed registry.
///
/// Every instance is at once an advertiser for the nodes registered through
/// it and a client that can resolve and watch any service on the bus.
///
/// # Example
///
/// ```rust,ignore
/// use service_registry::{BusRegistry, Registry, RegistryConfig, ServiceNode};
/// use shared_bus::InMemoryBus;
///
/// let bus = InMemoryBus::new();
/// let registry = BusRegistry::connect(RegistryConfig::default(), &bus)?;
/// let ctx = CancellationToken::new();
/// registry.start(&ctx).await?;
/// registry.register(&ctx, &ServiceNode::new("greeter", "v1", "g-1", "10.0.0.1:8080")).await?;
/// let set = registry.get_service(&ctx, "greeter", "v1").await?;
/// ```
pub struct BusRegistry {
    pub(crate) config: RegistryConfig,
    pub(crate) instance_id: String,
    pub(crate) bus: Arc<dyn BusClient>,
    pub(crate) store: Arc<NodeRecordStore>,
    pub(crate) advertiser: Arc<Advertiser>,
    pub(crate) resolver: Resolver,
    pub(crate) watcher: Watcher,
    running: Mutex<Option<Running>>,
    /// Cancelled on drop so background tasks never outlive the registry.
    lifetime: CancellationToken,
}

impl BusRegistry {
    /// Create a registry over an existing bus client.
    pub fn new(config: RegistryConfig, bus: Arc<dyn BusClient>) -> Result<Self, RegistryError> {
        config.validate()?;

        let instance_id = Uuid::new_v4().to_string();
        let store = Arc::new(NodeRecordStore::new());
        let advertiser = Arc::new(Advertiser::new(
            Arc::clone(&bus),
            Arc::clone(&store),
            config.watch_topic(),
            instance_id.clone(),
        ));
        let resolver = Resolver::new(
            Arc::clone(&bus),
            config.query_topic(),
            config.quorum,
            config.timeout,
        );
        let watcher = Watcher::new(Arc::clone(&bus), config.watch_topic(), config.sweep_ceiling);

        Ok(Self {
            config,
            instance_id,
            bus,
            store,
            advertiser,
            resolver,
            watcher,
            running: Mutex::new(None),
            lifetime: CancellationToken::new(),
        })
    }

    /// Create a registry with a client opened by `connector`.
    pub fn connect(config: RegistryConfig, connector: &dyn BusConnector) -> Result<Self, RegistryError> {
        config.validate()?;
        let bus = connector.connect_client(&config.connect_options())?;
        Self::new(config, bus)
    }

    /// Unique id of this registry instance; used as the responder id.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Nodes registered through this instance.
    pub fn local_nodes(&self) -> Vec<ServiceNode> {
        self.store.all()
    }

    pub async fn is_started(&self) -> bool {
        self.running.lock().await.is_some()
    }

    pub(crate) async fn start_inner(&self, ctx: &CancellationToken) -> Result<(), RegistryError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(());
        }

        let connect = tokio::time::timeout(self.config.connection_timeout, self.bus.connect());
        tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(RegistryError::Cancelled),
            result = connect => match result {
                Ok(connected) => connected?,
                Err(_) => {
                    return Err(RegistryError::Timeout(format!(
                        "connecting to {:?} took longer than {:?}",
                        self.config.addresses, self.config.connection_timeout
                    )))
                }
            },
        }

        let queries = match self
            .bus
            .subscribe(SubjectFilter::exact(self.config.query_topic()))
            .await
        {
            Ok(sub) => sub,
            Err(e) => {
                self.bus.close().await;
                return Err(e.into());
            }
        };

        let shutdown = self.lifetime.child_token();
        let tasks = vec![
            tokio::spawn(
                Arc::clone(&self.advertiser).serve_queries(queries, shutdown.clone()),
            ),
            tokio::spawn(
                Arc::clone(&self.advertiser)
                    .run_refresh(self.config.refresh_interval, shutdown.clone()),
            ),
        ];
        *running = Some(Running { shutdown, tasks });

        info!(
            instance = %self.instance_id,
            domain = %self.config.domain,
            query_topic = %self.config.query_topic(),
            watch_topic = %self.config.watch_topic(),
            quorum = self.config.quorum,
            "Registry started"
        );
        Ok(())
    }

    /// Holds the lifecycle lock so a concurrent stop either sees this node in
    /// the store or rejects the call.
    pub(crate) async fn register_inner(
        &self,
        ctx: &CancellationToken,
        node: &ServiceNode,
    ) -> Result<(), RegistryError> {
        node.validate()?;
        if ctx.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }
        let running = self.running.lock().await;
        if running.is_none() {
            return Err(RegistryError::NotStarted);
        }

        if self.store.upsert(node.clone()) == UpsertOutcome::Inserted {
            LOCAL_NODES.inc();
            info!(node = %node.key(), address = %node.address, "Node registered");
        } else {
            debug!(node = %node.key(), "Node re-registered");
        }
        self.advertiser.reschedule();

        self.advertiser.announce(WatchAction::Register, node).await
    }

    pub(crate) async fn deregister_inner(
        &self,
        ctx: &CancellationToken,
        node: &ServiceNode,
    ) -> Result<(), RegistryError> {
        if ctx.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }
        let running = self.running.lock().await;
        if self.store.remove(&node.key()).is_some() {
            LOCAL_NODES.dec();
            info!(node = %node.key(), "Node deregistered");
        }
        if running.is_none() {
            return Ok(());
        }
        self.advertiser.reschedule();

        self.advertiser.announce(WatchAction::Deregister, node).await
    }

    /// Background tasks are joined before the store is drained, so no refresh
    /// can re-advertise a node after its deregistration.
    pub(crate) async fn stop_inner(&self, ctx: &CancellationToken) -> Result<(), RegistryError> {
        let mut running = self.running.lock().await;
        let Some(Running { shutdown, tasks }) = running.take() else {
            return Ok(());
        };

        shutdown.cancel();
        for task in tasks {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => {
                    debug!("Stop cancelled, abandoning background task");
                    break;
                }
                joined = task => {
                    if let Err(e) = joined {
                        warn!(error = %e, "Registry task ended abnormally");
                    }
                }
            }
        }

        let nodes = self.store.drain();
        LOCAL_NODES.sub(nodes.len() as f64);
        for node in &nodes {
            if let Err(e) = self.advertiser.announce(WatchAction::Deregister, node).await {
                warn!(node = %node.key(), error = %e, "Deregister on stop failed");
            }
        }
        self.bus.close().await;

        info!(instance = %self.instance_id, deregistered = nodes.len(), "Registry stopped");
        Ok(())
    }
}

impl Drop for BusRegistry {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}
