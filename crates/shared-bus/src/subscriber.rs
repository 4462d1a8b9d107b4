//! # Subscriptions
//!
//! Receiving side of the bus. A subscription is a bounded queue fed by the
//! broker; dropping it unsubscribes.

use crate::message::BusMessage;
use crate::subject::SubjectFilter;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The subscription was closed by the bus or the client.
    #[error("subscription closed")]
    Closed,
}

type Unsubscribe = Box<dyn FnOnce() + Send>;

/// A subscription handle for receiving messages.
///
/// When dropped, the subscription is removed from the bus.
pub struct Subscription {
    id: u64,
    filter: SubjectFilter,
    receiver: mpsc::Receiver<BusMessage>,
    unsubscribe: Option<Unsubscribe>,
}

impl Subscription {
    /// Create a subscription. `unsubscribe` runs exactly once, on drop.
    pub fn new(
        id: u64,
        filter: SubjectFilter,
        receiver: mpsc::Receiver<BusMessage>,
        unsubscribe: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            id,
            filter,
            receiver,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Receive the next message.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next matching message
    /// - `None` - The subscription was closed (client closed or bus lost)
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.receiver.recv().await
    }

    /// Try to receive the next message without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A message was queued
    /// - `Ok(None)` - Nothing queued
    /// - `Err(SubscriptionError::Closed)` - The subscription was closed
    pub fn try_recv(&mut self) -> Result<Option<BusMessage>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    /// Broker-assigned subscription id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &SubjectFilter {
        &self.filter
    }

    /// Convert into a `Stream` of messages.
    #[must_use]
    pub fn into_stream(self) -> MessageStream {
        MessageStream { subscription: self }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
        debug!(id = self.id, subject = %self.filter, "Subscription dropped");
    }
}

/// A stream wrapper for subscriptions.
pub struct MessageStream {
    subscription: Subscription,
}

impl MessageStream {
    /// Get the filter for this stream.
    #[must_use]
    pub fn filter(&self) -> &SubjectFilter {
        self.subscription.filter()
    }
}

impl Stream for MessageStream {
    type Item = BusMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.subscription.receiver.poll_recv(cx)
    }
}
