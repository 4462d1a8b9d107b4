//! # In-Memory Bus
//!
//! Process-local broker implementing the bus semantics registries rely on.
//! Every registry handed a client of the same `InMemoryBus` sees the same
//! subjects, which makes it the backing for the `local` backend and for
//! multi-registry tests.
//!
//! `shutdown` simulates losing the bus: all subscriptions close and every
//! client reports itself disconnected until `restore`.

use crate::client::{BusClient, BusConnector, ConnectOptions};
use crate::error::BusError;
use crate::message::BusMessage;
use crate::subject::{validate_subject, SubjectFilter};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{debug, info};

struct SubscriberEntry {
    client_id: u64,
    filter: SubjectFilter,
    sender: mpsc::Sender<BusMessage>,
}

struct BrokerState {
    subscriptions: DashMap<u64, SubscriberEntry>,
    next_subscription_id: AtomicU64,
    next_client_id: AtomicU64,
    online: AtomicBool,
    events_published: AtomicU64,
    messages_dropped: AtomicU64,
    capacity: usize,
}

impl BrokerState {
    fn deliver(&self, message: BusMessage) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0;
        for entry in self.subscriptions.iter() {
            if !entry.filter.matches(&message.subject) {
                continue;
            }
            match entry.sender.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.messages_dropped.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        subscription = *entry.key(),
                        subject = %message.subject,
                        "Subscriber lagged, message dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    fn add_subscription(self: &Arc<Self>, client_id: u64, filter: SubjectFilter) -> Subscription {
        let id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.capacity);
        self.subscriptions.insert(
            id,
            SubscriberEntry {
                client_id,
                filter: filter.clone(),
                sender,
            },
        );

        let broker: Weak<Self> = Arc::downgrade(self);
        Subscription::new(id, filter, receiver, move || {
            if let Some(broker) = broker.upgrade() {
                broker.subscriptions.remove(&id);
            }
        })
    }

    fn remove_client(&self, client_id: u64) {
        self.subscriptions.retain(|_, entry| entry.client_id != client_id);
    }
}

/// In-memory message broker.
///
/// Cloning shares the same broker.
#[derive(Clone)]
pub struct InMemoryBus {
    state: Arc<BrokerState>,
}

impl InMemoryBus {
    /// Create a new in-memory bus with default per-subscriber capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus with the given per-subscriber capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Arc::new(BrokerState {
                subscriptions: DashMap::new(),
                next_subscription_id: AtomicU64::new(1),
                next_client_id: AtomicU64::new(1),
                online: AtomicBool::new(true),
                events_published: AtomicU64::new(0),
                messages_dropped: AtomicU64::new(0),
                capacity: capacity.max(1),
            }),
        }
    }

    /// A new, unconnected client of this bus.
    #[must_use]
    pub fn client(&self) -> InMemoryBusClient {
        InMemoryBusClient {
            id: self.state.next_client_id.fetch_add(1, Ordering::Relaxed),
            broker: Arc::clone(&self.state),
            connected: AtomicBool::new(false),
        }
    }

    /// Take the bus offline, closing every subscription.
    pub fn shutdown(&self) {
        self.state.online.store(false, Ordering::SeqCst);
        self.state.subscriptions.clear();
        info!("In-memory bus shut down");
    }

    /// Bring the bus back online. Existing subscriptions are not restored.
    pub fn restore(&self) {
        self.state.online.store(true, Ordering::SeqCst);
        info!("In-memory bus restored");
    }

    /// Whether the bus is accepting connections.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.state.online.load(Ordering::SeqCst)
    }

    /// Total messages published.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.state.events_published.load(Ordering::Relaxed)
    }

    /// Messages dropped because a subscriber's buffer was full.
    #[must_use]
    pub fn messages_dropped(&self) -> u64 {
        self.state.messages_dropped.load(Ordering::Relaxed)
    }

    /// Get the number of active subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.subscriptions.len()
    }

    /// Get the per-subscriber buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.capacity
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusConnector for InMemoryBus {
    fn connect_client(&self, options: &ConnectOptions) -> Result<Arc<dyn BusClient>, BusError> {
        options.validate()?;
        Ok(Arc::new(self.client()))
    }
}

/// A connection to an [`InMemoryBus`].
pub struct InMemoryBusClient {
    id: u64,
    broker: Arc<BrokerState>,
    connected: AtomicBool,
}

impl InMemoryBusClient {
    fn ensure_connected(&self) -> Result<(), BusError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BusError::NotConnected);
        }
        if !self.broker.online.load(Ordering::SeqCst) {
            return Err(BusError::Unavailable("connection to bus lost".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BusClient for InMemoryBusClient {
    async fn connect(&self) -> Result<(), BusError> {
        if !self.broker.online.load(Ordering::SeqCst) {
            return Err(BusError::Unavailable("bus is offline".into()));
        }
        if !self.connected.swap(true, Ordering::SeqCst) {
            debug!(client = self.id, "Bus client connected");
        }
        Ok(())
    }

    async fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.broker.remove_client(self.id);
            debug!(client = self.id, "Bus client closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.broker.online.load(Ordering::SeqCst)
    }

    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<usize, BusError> {
        self.ensure_connected()?;
        validate_subject(subject)?;
        Ok(self.broker.deliver(BusMessage::new(subject, payload)))
    }

    async fn publish_request(
        &self,
        subject: &str,
        reply_to: &str,
        payload: Vec<u8>,
    ) -> Result<usize, BusError> {
        self.ensure_connected()?;
        validate_subject(subject)?;
        validate_subject(reply_to)?;
        Ok(self
            .broker
            .deliver(BusMessage::request(subject, reply_to, payload)))
    }

    async fn subscribe(&self, filter: SubjectFilter) -> Result<Subscription, BusError> {
        self.ensure_connected()?;
        Ok(self.broker.add_subscription(self.id, filter))
    }
}
