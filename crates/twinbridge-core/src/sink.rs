//! Fan-out event sink.
//!
//! The time-series sink is an external collaborator that accepts one JSON
//! document per event. [`BroadcastSink`] is an in-process implementation
//! that distributes appended documents to every subscriber.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::SinkError;

/// Default channel capacity for the broadcast sink.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Client capability for the downstream event sink.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Append one serialized event document.
    async fn append(&self, payload: String) -> Result<(), SinkError>;
}

/// Shared handle to an event sink.
pub type DynEventSink = Arc<dyn EventSink>;

/// Event sink backed by a broadcast channel.
///
/// Appending with no live subscriber fails with [`SinkError::Closed`]
/// so that the document is reported as undelivered. A subscriber that
/// falls more than `capacity` documents behind skips the oldest ones.
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<String>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to documents appended from now on.
    pub fn subscribe(&self) -> SinkReceiver {
        SinkReceiver {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl EventSink for BroadcastSink {
    async fn append(&self, payload: String) -> Result<(), SinkError> {
        self.tx.send(payload).map(|_| ()).map_err(|_| SinkError::Closed)
    }
}

/// Receiver for documents appended to a [`BroadcastSink`].
pub struct SinkReceiver {
    rx: broadcast::Receiver<String>,
}

impl SinkReceiver {
    /// Receive the next document.
    ///
    /// Returns `None` once the sink is dropped.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Sink receiver lagged, {} document(s) skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive a document without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_reaches_all_subscribers() {
        let sink = BroadcastSink::default();
        let mut rx1 = sink.subscribe();
        let mut rx2 = sink.subscribe();

        sink.append("{\"a\":1}".to_string()).await.unwrap();

        assert_eq!(rx1.recv().await.as_deref(), Some("{\"a\":1}"));
        assert_eq!(rx2.recv().await.as_deref(), Some("{\"a\":1}"));
    }

    #[tokio::test]
    async fn test_append_without_subscriber_is_closed() {
        let sink = BroadcastSink::default();
        let result = sink.append("{}".to_string()).await;
        assert!(matches!(result, Err(SinkError::Closed)));
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let sink = BroadcastSink::default();
        let mut rx = sink.subscribe();
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagging_receiver_skips_oldest() {
        let sink = BroadcastSink::new(2);
        let mut rx = sink.subscribe();
        for i in 0..3 {
            sink.append(i.to_string()).await.unwrap();
        }
        assert_eq!(rx.recv().await.as_deref(), Some("1"));
        assert_eq!(rx.recv().await.as_deref(), Some("2"));
    }
}
