//! Watcher
//!
//! One background task per watch. Each task subscribes to the watch topic,
//! keeps a private [`WatchMirror`] of the watched service and forwards only
//! real changes to the consumer's [`WatchStream`].

use crate::adapters::codec::{self, Advertisement};
use crate::domain::{deadline_after, RegistryError, WatchEvent, WatchMirror, SWEEP_FLOOR};
use crate::ports::WatchStream;
use registry_telemetry::metrics::{ACTIVE_WATCHES, WATCH_EVENTS};
use shared_bus::{BusClient, BusMessage, SubjectFilter, Subscription};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct Watcher {
    bus: Arc<dyn BusClient>,
    watch_topic: String,
    sweep_ceiling: Duration,
}

impl Watcher {
    pub fn new(bus: Arc<dyn BusClient>, watch_topic: impl Into<String>, sweep_ceiling: Duration) -> Self {
        Self {
            bus,
            watch_topic: watch_topic.into(),
            sweep_ceiling,
        }
    }

    /// Start watching `name`.
    ///
    /// The subscription is in place when this returns, so any advertisement
    /// published afterwards is observed.
    pub async fn watch(&self, ctx: CancellationToken, name: &str) -> Result<WatchStream, RegistryError> {
        if ctx.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }
        let subscription = self
            .bus
            .subscribe(SubjectFilter::exact(&self.watch_topic))
            .await?;

        let (events, receiver) = mpsc::unbounded_channel();
        let ctx = ctx.child_token();
        let task = WatchTask {
            mirror: WatchMirror::new(name),
            subscription,
            events,
            ctx: ctx.clone(),
            sweep_ceiling: self.sweep_ceiling,
        };
        tokio::spawn(task.run());

        debug!(service = name, topic = %self.watch_topic, "Watch started");
        Ok(WatchStream::new(receiver, ctx))
    }
}

struct WatchTask {
    mirror: WatchMirror,
    subscription: Subscription,
    events: mpsc::UnboundedSender<Result<WatchEvent, RegistryError>>,
    ctx: CancellationToken,
    sweep_ceiling: Duration,
}

impl WatchTask {
    fn sweep_interval(&self) -> Duration {
        self.mirror.sweep_interval(SWEEP_FLOOR, self.sweep_ceiling)
    }

    fn sweep_deadline(&self) -> Instant {
        deadline_after(Instant::now(), self.sweep_interval())
    }

    async fn run(mut self) {
        ACTIVE_WATCHES.inc();
        let mut next_sweep = self.sweep_deadline();

        loop {
            tokio::select! {
                biased;
                _ = self.ctx.cancelled() => break,
                msg = self.subscription.recv() => match msg {
                    Some(msg) => {
                        if !self.on_message(&msg) {
                            break;
                        }
                        next_sweep = next_sweep.min(self.sweep_deadline());
                    }
                    None => {
                        if !self.ctx.is_cancelled() {
                            warn!(service = %self.mirror.service(), "Watch subscription lost");
                            let _ = self.events.send(Err(RegistryError::BackendUnavailable(
                                "watch subscription closed".into(),
                            )));
                        }
                        break;
                    }
                },
                _ = tokio::time::sleep_until(next_sweep) => {
                    if !self.sweep() {
                        break;
                    }
                    next_sweep = self.sweep_deadline();
                }
            }
        }

        ACTIVE_WATCHES.dec();
        debug!(service = %self.mirror.service(), "Watch stopped");
    }

    /// Returns `false` once the consumer is gone.
    fn on_message(&mut self, msg: &BusMessage) -> bool {
        let ad: Advertisement = match codec::decode(&msg.payload) {
            Ok(ad) => ad,
            Err(e) => {
                debug!(error = %e, "Malformed advertisement ignored");
                return true;
            }
        };
        match self.mirror.observe(ad.action, ad.node, Instant::now()) {
            Some(event) => self.emit(event, "bus"),
            None => true,
        }
    }

    fn sweep(&mut self) -> bool {
        for event in self.mirror.expire(Instant::now()) {
            debug!(node = %event.node.key(), "Node expired");
            if !self.emit(event, "expiry") {
                return false;
            }
        }
        true
    }

    fn emit(&self, event: WatchEvent, source: &str) -> bool {
        WATCH_EVENTS
            .with_label_values(&[event.action.as_str(), source])
            .inc();
        self.events.send(Ok(event)).is_ok()
    }
}
