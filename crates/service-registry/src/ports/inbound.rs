//! Inbound port: the registry as its consumers see it.

use crate::domain::{RegistryError, ServiceNode, ServiceSet, WatchEvent};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Service registry.
///
/// Every operation takes a cancellation token; a cancelled token makes the
/// call return `RegistryError::Cancelled` as soon as possible.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Name the backend was registered under.
    fn backend_name(&self) -> &'static str;

    /// Connect and start background tasks. Idempotent.
    async fn start(&self, ctx: &CancellationToken) -> Result<(), RegistryError>;

    /// Deregister every local node, stop background tasks, disconnect.
    /// Idempotent.
    async fn stop(&self, ctx: &CancellationToken) -> Result<(), RegistryError>;

    /// Store `node` locally and advertise it.
    async fn register(&self, ctx: &CancellationToken, node: &ServiceNode) -> Result<(), RegistryError>;

    /// Remove `node` locally and advertise its removal. Succeeds for unknown
    /// nodes.
    async fn deregister(&self, ctx: &CancellationToken, node: &ServiceNode) -> Result<(), RegistryError>;

    /// Resolve the nodes of `name`. An empty `version` matches every version.
    async fn get_service(
        &self,
        ctx: &CancellationToken,
        name: &str,
        version: &str,
    ) -> Result<ServiceSet, RegistryError>;

    /// Stream changes to the nodes of `name` until `ctx` is cancelled or the
    /// stream is dropped.
    async fn watch(&self, ctx: CancellationToken, name: &str) -> Result<WatchStream, RegistryError>;
}

/// Stream of watch deltas.
///
/// - Yields events in the order the watcher produced them.
/// - A lost bus connection yields one `Err` and then ends.
/// - Once the token is cancelled, yields `None`.
///
/// Dropping the stream cancels its token, which stops the background task.
pub struct WatchStream {
    receiver: mpsc::UnboundedReceiver<Result<WatchEvent, RegistryError>>,
    ctx: CancellationToken,
    finished: bool,
}

impl WatchStream {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<Result<WatchEvent, RegistryError>>,
        ctx: CancellationToken,
    ) -> Self {
        Self {
            receiver,
            ctx,
            finished: false,
        }
    }

    /// Stop watching. Later polls yield `None`.
    pub fn close(&mut self) {
        self.ctx.cancel();
        self.finished = true;
    }

    pub fn is_closed(&self) -> bool {
        self.finished || self.ctx.is_cancelled()
    }
}

impl Stream for WatchStream {
    type Item = Result<WatchEvent, RegistryError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished || self.ctx.is_cancelled() {
            self.finished = true;
            return Poll::Ready(None);
        }
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(Err(e))) => {
                self.finished = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl Drop for WatchStream {
    fn drop(&mut self) {
        self.ctx.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn node() -> ServiceNode {
        ServiceNode::new("greeter", "v1", "a", "a:1")
    }

    #[tokio::test]
    async fn test_error_is_terminal() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = WatchStream::new(rx, CancellationToken::new());

        tx.send(Ok(WatchEvent::register(node()))).unwrap();
        tx.send(Err(RegistryError::BackendUnavailable("lost".into()))).unwrap();
        tx.send(Ok(WatchEvent::deregister(node()))).unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_yields_none_immediately() {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = CancellationToken::new();
        let mut stream = WatchStream::new(rx, ctx.clone());

        tx.send(Ok(WatchEvent::register(node()))).unwrap();
        ctx.cancel();
        assert!(stream.next().await.is_none());
        assert!(stream.is_closed());
    }

    #[tokio::test]
    async fn test_drop_cancels_token() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let ctx = CancellationToken::new();
        drop(WatchStream::new(rx, ctx.clone()));
        assert!(ctx.is_cancelled());
    }
}
