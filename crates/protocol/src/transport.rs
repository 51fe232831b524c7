//! Transport abstraction
//!
//! A thin pub/sub seam between host and clients. Delivery is at-most-once
//! and must never block the simulation tick: publishers fire and forget,
//! slow subscribers drop messages and recover from the next periodic
//! snapshot. The trait keeps the door open for a networked implementation;
//! `ChannelTransport` is the in-process one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, trace};
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::topics::topic_matches;

/// Raw pub/sub over string topics.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish a payload. At-most-once: failures are the caller's to log,
    /// not to retry.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Subscribe to a set of topic patterns (exact, or trailing `/*`).
    /// Messages arrive as `(topic, payload)` pairs.
    async fn subscribe(
        &self,
        patterns: Vec<String>,
    ) -> Result<mpsc::Receiver<(String, Vec<u8>)>, TransportError>;
}

struct Subscription {
    patterns: Vec<String>,
    tx: mpsc::Sender<(String, Vec<u8>)>,
}

/// In-process transport over tokio mpsc channels.
///
/// Subscribers that fall behind lose messages (`try_send` drops on a full
/// buffer) rather than backpressuring the publisher.
pub struct ChannelTransport {
    subscriptions: DashMap<u64, Subscription>,
    next_id: AtomicU64,
    capacity: usize,
}

impl ChannelTransport {
    pub fn new() -> Arc<Self> {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            subscriptions: DashMap::new(),
            next_id: AtomicU64::new(0),
            capacity,
        })
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let mut dead = Vec::new();
        for entry in self.subscriptions.iter() {
            if !entry.patterns.iter().any(|p| topic_matches(p, topic)) {
                continue;
            }
            match entry.tx.try_send((topic.to_string(), payload.clone())) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Slow subscriber: drop, the next snapshot heals it
                    trace!("dropping message on {} for lagging subscriber", topic);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(*entry.key());
                }
            }
        }
        for id in dead {
            self.subscriptions.remove(&id);
            debug!("removed closed subscriber {id}");
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        patterns: Vec<String>,
    ) -> Result<mpsc::Receiver<(String, Vec<u8>)>, TransportError> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscriptions.insert(id, Subscription { patterns, tx });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pubsub_fanout() {
        let transport = ChannelTransport::new();
        let mut a = transport
            .subscribe(vec!["x/y/sync".into()])
            .await
            .unwrap();
        let mut b = transport.subscribe(vec!["x/y/*".into()]).await.unwrap();

        transport.publish("x/y/sync", b"tick".to_vec()).await.unwrap();

        let (topic, payload) = a.recv().await.unwrap();
        assert_eq!(topic, "x/y/sync");
        assert_eq!(payload, b"tick");
        assert_eq!(b.recv().await.unwrap().0, "x/y/sync");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_fine() {
        let transport = ChannelTransport::new();
        transport.publish("nowhere", b"x".to_vec()).await.unwrap();
    }

    #[tokio::test]
    async fn test_unmatched_topic_not_delivered() {
        let transport = ChannelTransport::new();
        let mut rx = transport
            .subscribe(vec!["x/y/join".into()])
            .await
            .unwrap();
        transport.publish("x/y/sync", b"tick".to_vec()).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_slow_subscriber_drops_not_blocks() {
        let transport = ChannelTransport::with_capacity(1);
        let mut rx = transport.subscribe(vec!["t".into()]).await.unwrap();

        transport.publish("t", b"1".to_vec()).await.unwrap();
        transport.publish("t", b"2".to_vec()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().1, b"1");
        assert!(rx.try_recv().is_err());
    }
}
