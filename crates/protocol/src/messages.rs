//! Wire messages
//!
//! Everything host and client exchange is one `NetworkMessage`, encoded as
//! JSON. Messages are ephemeral: nothing here is persisted, and any state a
//! lost message carried is resent by the next periodic snapshot.

use openbell_core::{Cash, OrderId, PlayerId, Price, Side, StockId};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::snapshot::{SetupSnapshot, TickSnapshot};

/// Order parameters as they travel on the wire.
///
/// Mirrors the matching engine's submission surface without depending on
/// it; the host maps this onto an engine submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderRequest {
    Market,
    Limit { limit: Price },
    StopLoss { trigger: Price },
    StopProfit { trigger: Price },
    TrailingStop { percent: Price },
    Iceberg { limit: Price, chunk: i64 },
}

/// A client intent. Fire-and-forget: no acknowledgement is guaranteed; a
/// client that does not see the effect in the next snapshot assumes
/// failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionKind {
    SubmitOrder {
        stock_id: StockId,
        side: Side,
        amount: i64,
        request: OrderRequest,
    },
    CancelOrder {
        order_id: OrderId,
    },
    TakeLoan {
        provider: String,
        amount: Cash,
    },
    RepayLoan {
        amount: Cash,
    },
    Chat {
        text: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetworkMessage {
    /// Client asks to enter the room; the host creates or reconnects the
    /// player and answers with a private `SyncSetup`.
    Join {
        prefix: String,
        name: String,
        player_id: PlayerId,
    },
    /// Full-state snapshot, sent on join and on lobby settings changes.
    SyncSetup(SetupSnapshot),
    /// Phase transition announcement, independent of the periodic tick.
    GameStart {
        day: u32,
    },
    /// Periodic lossy projection of the world.
    SyncTick(Box<TickSnapshot>),
    Action {
        player_id: PlayerId,
        kind: ActionKind,
    },
}

impl NetworkMessage {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_action_round_trip() {
        let msg = NetworkMessage::Action {
            player_id: "alice".into(),
            kind: ActionKind::SubmitOrder {
                stock_id: "s1".into(),
                side: Side::Buy,
                amount: 100,
                request: OrderRequest::Limit { limit: dec!(10.50) },
            },
        };

        let bytes = msg.encode().unwrap();
        let decoded = NetworkMessage::decode(&bytes).unwrap();
        match decoded {
            NetworkMessage::Action { player_id, kind } => {
                assert_eq!(player_id, "alice".into());
                assert_eq!(
                    kind,
                    ActionKind::SubmitOrder {
                        stock_id: "s1".into(),
                        side: Side::Buy,
                        amount: 100,
                        request: OrderRequest::Limit { limit: dec!(10.50) },
                    }
                );
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(NetworkMessage::decode(b"not json").is_err());
    }

    #[test]
    fn test_join_is_tagged() {
        let msg = NetworkMessage::Join {
            prefix: "openbell".into(),
            name: "Ada".into(),
            player_id: "p1".into(),
        };
        let json = String::from_utf8(msg.encode().unwrap()).unwrap();
        assert!(json.contains(r#""type":"join""#));
    }
}
