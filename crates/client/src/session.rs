//! Room client
//!
//! Joins a room, mirrors replicated state into a [`ClientWorld`] and sends
//! fire-and-forget intents. Locally submitted orders are mirrored
//! optimistically as provisional entries; authoritative snapshots confirm
//! or discard them.

use std::sync::Arc;

use chrono::Utc;
use log::warn;
use openbell_core::{OrderId, OrderKind, PendingOrder, PlayerId, Side, StockId};
use openbell_protocol::{
    ActionKind, ClientWorld, NetworkMessage, OrderRequest, StockQuote, Topics, Transport,
};
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use crate::error::Result;

pub struct RoomClient {
    transport: Arc<dyn Transport>,
    topics: Topics,
    player_id: PlayerId,
    inbound: mpsc::Receiver<(String, Vec<u8>)>,
    pub world: ClientWorld,
}

impl RoomClient {
    /// Subscribe to the room's channels and announce ourselves.
    pub async fn join(
        transport: Arc<dyn Transport>,
        topics: Topics,
        player_id: PlayerId,
        name: &str,
    ) -> Result<Self> {
        let inbound = transport
            .subscribe(topics.client_subscriptions(&player_id.to_string()))
            .await?;

        let hello = NetworkMessage::Join {
            prefix: "openbell".to_string(),
            name: name.to_string(),
            player_id: player_id.clone(),
        };
        transport.publish(&topics.join(), hello.encode()?).await?;

        Ok(Self {
            transport,
            topics,
            world: ClientWorld::new(player_id.clone()),
            player_id,
            inbound,
        })
    }

    /// Wait for the next inbound message and apply it. Returns whether the
    /// message changed local state; `None` once the transport closes.
    pub async fn next_update(&mut self) -> Option<bool> {
        let (topic, bytes) = self.inbound.recv().await?;
        match NetworkMessage::decode(&bytes) {
            Ok(msg) => Some(self.world.apply(&msg)),
            Err(e) => {
                warn!("undecodable message on {topic}: {e}");
                Some(false)
            }
        }
    }

    /// Submit an order and mirror it locally until the host confirms.
    pub async fn submit_order(
        &mut self,
        stock_id: StockId,
        side: Side,
        amount: i64,
        request: OrderRequest,
    ) -> Result<()> {
        if let Some(kind) = provisional_kind(&request, self.world.quotes.get(&stock_id)) {
            self.world.add_provisional(PendingOrder::new(
                stock_id.clone(),
                side,
                kind,
                amount,
                None,
                Utc::now(),
            ));
        }
        self.send_action(ActionKind::SubmitOrder {
            stock_id,
            side,
            amount,
            request,
        })
        .await
    }

    /// Request a cancel and drop the local mirror immediately; the next
    /// snapshot is authoritative either way.
    pub async fn cancel_order(&mut self, order_id: OrderId) -> Result<()> {
        self.world.remove_pending(order_id);
        self.send_action(ActionKind::CancelOrder { order_id }).await
    }

    pub async fn take_loan(&self, provider: &str, amount: Decimal) -> Result<()> {
        self.send_action(ActionKind::TakeLoan {
            provider: provider.to_string(),
            amount,
        })
        .await
    }

    pub async fn repay_loan(&self, amount: Decimal) -> Result<()> {
        self.send_action(ActionKind::RepayLoan { amount }).await
    }

    pub async fn chat(&self, text: &str) -> Result<()> {
        self.send_action(ActionKind::Chat {
            text: text.to_string(),
        })
        .await
    }

    async fn send_action(&self, kind: ActionKind) -> Result<()> {
        let msg = NetworkMessage::Action {
            player_id: self.player_id.clone(),
            kind,
        };
        self.transport
            .publish(&self.topics.action(), msg.encode()?)
            .await?;
        Ok(())
    }
}

/// The local stand-in for a submitted order. Market orders never rest, and
/// a trailing stop needs a quote to estimate its initial trigger.
fn provisional_kind(request: &OrderRequest, quote: Option<&StockQuote>) -> Option<OrderKind> {
    match *request {
        OrderRequest::Market => None,
        OrderRequest::Limit { limit } => Some(OrderKind::Limit { limit }),
        OrderRequest::StopLoss { trigger } => Some(OrderKind::StopLoss { trigger }),
        OrderRequest::StopProfit { trigger } => Some(OrderKind::StopProfit { trigger }),
        OrderRequest::TrailingStop { percent } => quote.map(|q| OrderKind::TrailingStop {
            percent,
            trigger: (q.price * (Decimal::ONE - percent / Decimal::from(100))).round_dp(2),
        }),
        OrderRequest::Iceberg { limit, chunk } => Some(OrderKind::Iceberg { limit, chunk }),
    }
}
