//! Resolver
//!
//! Scatter/gather over the query topic. A query goes out with a private
//! inbox; replies are merged until `quorum` distinct advertisers have
//! answered, the deadline passes, or the caller cancels.

use crate::adapters::codec::{self, CorrelationId, QueryReply, QueryRequest};
use crate::domain::{deadline_after, RegistryError, ServiceSet};
use registry_telemetry::metrics::{HistogramTimer, QUERIES, QUERY_DURATION, QUERY_REPLIES};
use shared_bus::{BusClient, BusMessage, SubjectFilter};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Why collection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Quorum,
    Deadline,
    Cancelled,
    Disconnected,
}

/// Accumulates replies for one query.
struct ReplyCollector {
    correlation_id: CorrelationId,
    responders: HashSet<String>,
    set: ServiceSet,
}

impl ReplyCollector {
    fn new(correlation_id: CorrelationId, name: &str, version: &str) -> Self {
        Self {
            correlation_id,
            responders: HashSet::new(),
            set: ServiceSet::new(name, version),
        }
    }

    /// Merge a reply. Stale or malformed replies are ignored.
    fn accept(&mut self, msg: &BusMessage) {
        let reply: QueryReply = match codec::decode(&msg.payload) {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "Malformed query reply ignored");
                return;
            }
        };
        if reply.correlation_id != self.correlation_id {
            trace!(expected = %self.correlation_id, got = %reply.correlation_id, "Stale reply ignored");
            return;
        }

        let name = self.set.name.clone();
        let version = self.set.version.clone();
        self.set.merge(
            reply
                .nodes
                .into_iter()
                .filter(|n| n.name == name && (version.is_empty() || n.version == version)),
        );
        if self.responders.insert(reply.responder) {
            QUERY_REPLIES.inc();
        }
    }

    fn responders(&self) -> usize {
        self.responders.len()
    }

    fn finish(self, stop: Stop, quorum: usize) -> Result<ServiceSet, RegistryError> {
        let replies = self.responders();
        let outcome = match (stop, replies) {
            (Stop::Cancelled, 0) => Err(RegistryError::Cancelled),
            (Stop::Disconnected, 0) => Err(RegistryError::BackendUnavailable(
                "reply subscription closed".into(),
            )),
            (_, 0) => Err(RegistryError::not_found(&self.set.name, &self.set.version)),
            _ => Ok(self.set),
        };

        let label = match (&outcome, replies >= quorum) {
            (Ok(_), true) => "complete",
            (Ok(_), false) => "partial",
            (Err(e), _) => e.kind(),
        };
        QUERIES.with_label_values(&[label]).inc();
        outcome
    }
}

pub struct Resolver {
    bus: Arc<dyn BusClient>,
    query_topic: String,
    quorum: usize,
    timeout: Duration,
}

impl Resolver {
    pub fn new(bus: Arc<dyn BusClient>, query_topic: impl Into<String>, quorum: usize, timeout: Duration) -> Self {
        Self {
            bus,
            query_topic: query_topic.into(),
            quorum: quorum.max(1),
            timeout,
        }
    }

    /// Resolve `name`/`version`.
    ///
    /// - Quorum reached: returns at once.
    /// - Deadline or cancellation with at least one reply: the merged set.
    /// - Deadline with no reply: `NotFound`.
    /// - Cancellation with no reply: `Cancelled`.
    pub async fn resolve(
        &self,
        ctx: &CancellationToken,
        name: &str,
        version: &str,
    ) -> Result<ServiceSet, RegistryError> {
        if ctx.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }
        let _timer = HistogramTimer::new(&QUERY_DURATION);

        let correlation_id = CorrelationId::new();
        let inbox = self.bus.new_inbox();
        let mut replies = self.bus.subscribe(SubjectFilter::exact(&inbox)).await?;

        let request = QueryRequest {
            correlation_id,
            name: name.to_string(),
            version: version.to_string(),
        };
        let receivers = self
            .bus
            .publish_request(&self.query_topic, &inbox, codec::encode(&request)?)
            .await?;
        debug!(%correlation_id, service = name, version, receivers, "Query published");

        let deadline = deadline_after(Instant::now(), self.timeout);
        let mut collector = ReplyCollector::new(correlation_id, name, version);
        let stop = loop {
            if collector.responders() >= self.quorum {
                break Stop::Quorum;
            }
            tokio::select! {
                biased;
                _ = ctx.cancelled() => break Stop::Cancelled,
                msg = replies.recv() => match msg {
                    Some(msg) => collector.accept(&msg),
                    None => break Stop::Disconnected,
                },
                _ = tokio::time::sleep_until(deadline) => break Stop::Deadline,
            }
        };
        drop(replies);

        debug!(
            %correlation_id,
            service = name,
            replies = collector.responders(),
            quorum = self.quorum,
            ?stop,
            "Query finished"
        );
        collector.finish(stop, self.quorum)
    }
}
