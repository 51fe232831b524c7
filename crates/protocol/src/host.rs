//! Host-side replication
//!
//! The `Replicator` turns world state into outbound messages. Publishing is
//! fire-and-forget: a failed publish is logged and the tick moves on, since
//! the next periodic snapshot carries the same information again.

use std::sync::Arc;

use log::{debug, warn};
use openbell_core::{PlayerId, World};

use crate::messages::NetworkMessage;
use crate::snapshot::{SetupSnapshot, TickSnapshot};
use crate::topics::Topics;
use crate::transport::Transport;

pub struct Replicator {
    transport: Arc<dyn Transport>,
    topics: Topics,
    seq: u64,
}

impl Replicator {
    pub fn new(transport: Arc<dyn Transport>, topics: Topics) -> Self {
        Self {
            transport,
            topics,
            seq: 0,
        }
    }

    /// Last published tick sequence.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Publish the periodic tick snapshot to everyone.
    pub async fn sync_tick(&mut self, world: &World) {
        self.seq += 1;
        let msg = NetworkMessage::SyncTick(Box::new(TickSnapshot::of(world, self.seq)));
        self.send(&self.topics.sync(), &msg).await;
    }

    /// Publish a full-state snapshot to everyone (lobby settings changes).
    pub async fn sync_setup_all(&self, world: &World) {
        let msg = NetworkMessage::SyncSetup(SetupSnapshot::of(world));
        self.send(&self.topics.broadcast_setup(), &msg).await;
    }

    /// Private full-state snapshot: the join reply, and the immediate echo
    /// after any account-mutating action.
    pub async fn sync_setup_private(&self, world: &World, player_id: &PlayerId) {
        let msg = NetworkMessage::SyncSetup(SetupSnapshot::of_player(world, player_id));
        self.push_private(player_id, &msg).await;
    }

    /// Announce the game starting, independent of the periodic tick.
    pub async fn game_start(&self, day: u32) {
        let msg = NetworkMessage::GameStart { day };
        self.send(&self.topics.broadcast(), &msg).await;
    }

    /// Push any message to one player's private channel.
    pub async fn push_private(&self, player_id: &PlayerId, msg: &NetworkMessage) {
        self.send(&self.topics.private(&player_id.to_string()), msg)
            .await;
    }

    async fn send(&self, topic: &str, msg: &NetworkMessage) {
        let bytes = match msg.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to encode message for {}: {}", topic, e);
                return;
            }
        };
        if let Err(e) = self.transport.publish(topic, bytes).await {
            warn!("publish to {} failed: {}", topic, e);
            return;
        }
        debug!("published to {}", topic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;
    use openbell_core::GameSettings;

    #[tokio::test]
    async fn test_tick_seq_is_monotonic() {
        let transport = ChannelTransport::new();
        let topics = Topics::new("openbell", "r1");
        let mut rx = transport
            .subscribe(vec![topics.sync()])
            .await
            .unwrap();

        let world = World::new(GameSettings::default());
        let mut replicator = Replicator::new(transport, topics);
        replicator.sync_tick(&world).await;
        replicator.sync_tick(&world).await;

        for expected in 1..=2u64 {
            let (_, bytes) = rx.recv().await.unwrap();
            match NetworkMessage::decode(&bytes).unwrap() {
                NetworkMessage::SyncTick(tick) => assert_eq!(tick.seq, expected),
                other => panic!("wrong message: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_private_setup_reaches_only_its_player() {
        let transport = ChannelTransport::new();
        let topics = Topics::new("openbell", "r1");
        let mut alice = transport
            .subscribe(vec![topics.private("alice")])
            .await
            .unwrap();
        let mut bob = transport
            .subscribe(vec![topics.private("bob")])
            .await
            .unwrap();

        let world = World::new(GameSettings::default());
        let replicator = Replicator::new(transport, topics);
        replicator.sync_setup_private(&world, &"alice".into()).await;

        assert!(alice.recv().await.is_some());
        assert!(bob.try_recv().is_err());
    }
}
