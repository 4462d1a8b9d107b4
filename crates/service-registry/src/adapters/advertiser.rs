//! Advertiser
//!
//! Publishes local nodes on the watch topic, re-publishes them before their
//! TTL lapses, and answers queries from the local store.

use crate::adapters::codec::{self, Advertisement, QueryReply, QueryRequest};
use crate::domain::{
    deadline_after, NodeRecordStore, RegistryError, ServiceNode, WatchAction, DEFAULT_TTL,
    SWEEP_FLOOR,
};
use registry_telemetry::metrics::{ADVERTISEMENTS_PUBLISHED, ADVERTISEMENT_FAILURES};
use shared_bus::{BusClient, BusMessage, Subscription};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct Advertiser {
    bus: Arc<dyn BusClient>,
    store: Arc<NodeRecordStore>,
    watch_topic: String,
    origin: String,
    schedule_changed: Notify,
    /// Held for every publish so a refresh never overtakes a deregistration.
    publish_lock: Mutex<()>,
}

impl Advertiser {
    pub fn new(
        bus: Arc<dyn BusClient>,
        store: Arc<NodeRecordStore>,
        watch_topic: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            bus,
            store,
            watch_topic: watch_topic.into(),
            origin: origin.into(),
            schedule_changed: Notify::new(),
            publish_lock: Mutex::new(()),
        }
    }

    /// Publish one advertisement.
    pub async fn announce(&self, action: WatchAction, node: &ServiceNode) -> Result<(), RegistryError> {
        let _guard = self.publish_lock.lock().await;
        self.publish(action, node).await
    }

    async fn publish(&self, action: WatchAction, node: &ServiceNode) -> Result<(), RegistryError> {
        let ad = Advertisement::new(action, node.clone(), self.origin.as_str());
        let payload = codec::encode(&ad)?;

        match self.bus.publish(&self.watch_topic, payload).await {
            Ok(receivers) => {
                ADVERTISEMENTS_PUBLISHED
                    .with_label_values(&[action.as_str()])
                    .inc();
                debug!(%action, node = %node.key(), receivers, "Advertisement published");
                Ok(())
            }
            Err(e) => {
                ADVERTISEMENT_FAILURES.inc();
                Err(e.into())
            }
        }
    }

    /// Re-publish every local node. Failures are logged, not returned.
    ///
    /// Each node is re-read from the store right before its publish, so a node
    /// deregistered mid-refresh is skipped. Returns the number re-published.
    pub async fn refresh(&self) -> usize {
        let _guard = self.publish_lock.lock().await;
        let keys: Vec<_> = self.store.all().iter().map(ServiceNode::key).collect();
        let mut published = 0;
        for key in &keys {
            let Some(node) = self.store.get(key) else {
                continue;
            };
            match self.publish(WatchAction::Register, &node).await {
                Ok(()) => published += 1,
                Err(e) => warn!(node = %key, error = %e, "Refresh advertisement failed"),
            }
        }
        if published > 0 {
            self.store.touch_all();
        }
        debug!(published, total = keys.len(), "Refreshed local nodes");
        published
    }

    /// Wake the refresh loop so it picks up a changed TTL.
    pub fn reschedule(&self) {
        self.schedule_changed.notify_one();
    }

    /// Time between refreshes.
    ///
    /// Half the smallest local TTL, or the configured interval when shorter.
    pub fn refresh_period(&self, configured: Option<Duration>) -> Duration {
        let half_ttl = self.store.min_ttl().unwrap_or(DEFAULT_TTL) / 2;
        let period = match configured {
            Some(interval) => interval.min(half_ttl),
            None => half_ttl,
        };
        period.max(SWEEP_FLOOR)
    }

    /// Refresh until `shutdown` is cancelled.
    pub async fn run_refresh(self: Arc<Self>, configured: Option<Duration>, shutdown: CancellationToken) {
        let mut last_refresh = Instant::now();
        loop {
            let deadline = deadline_after(last_refresh, self.refresh_period(configured));
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.schedule_changed.notified() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    self.refresh().await;
                    last_refresh = Instant::now();
                }
            }
        }
        debug!(origin = %self.origin, "Refresh loop stopped");
    }

    /// Build the reply to a query from the local store.
    pub fn answer(&self, request: &QueryRequest) -> QueryReply {
        QueryReply {
            correlation_id: request.correlation_id,
            responder: self.origin.clone(),
            nodes: self.store.find(&request.name, &request.version),
        }
    }

    /// Answer queries until `shutdown` is cancelled or the subscription ends.
    pub async fn serve_queries(self: Arc<Self>, mut queries: Subscription, shutdown: CancellationToken) {
        info!(origin = %self.origin, topic = %queries.filter(), "Serving registry queries");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                msg = queries.recv() => match msg {
                    Some(msg) => self.handle_query(msg).await,
                    None => {
                        warn!(origin = %self.origin, "Query subscription closed");
                        break;
                    }
                },
            }
        }
        debug!(origin = %self.origin, "Query server stopped");
    }

    async fn handle_query(&self, msg: BusMessage) {
        let Some(reply_to) = msg.reply_to.as_deref() else {
            debug!(subject = %msg.subject, "Query without reply subject ignored");
            return;
        };
        let request: QueryRequest = match codec::decode(&msg.payload) {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "Malformed query ignored");
                return;
            }
        };

        let reply = self.answer(&request);
        debug!(
            correlation_id = %request.correlation_id,
            service = %request.name,
            nodes = reply.nodes.len(),
            "Answering query"
        );
        let payload = match codec::encode(&reply) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Failed to encode query reply");
                return;
            }
        };
        if let Err(e) = self.bus.publish(reply_to, payload).await {
            warn!(correlation_id = %request.correlation_id, error = %e, "Failed to send query reply");
        }
    }
}
