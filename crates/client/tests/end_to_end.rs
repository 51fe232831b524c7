//! Full in-process loop: host room, transport, replicating client.

use std::sync::Arc;
use std::time::Duration;

use openbell_client::RoomClient;
use openbell_core::{GamePhase, GameSettings, Side, StockId};
use openbell_host::{GameRoom, HostCommand, spawn_inbound_pump};
use openbell_protocol::{ChannelTransport, OrderRequest, Topics, Transport};
use tokio::sync::mpsc;
use tokio::time::timeout;

fn settings() -> GameSettings {
    GameSettings {
        stock_count: 3,
        bot_count: 4,
        opening_secs: 1,
        morning_secs: 600,
        ..GameSettings::default()
    }
}

struct Harness {
    tx: mpsc::Sender<HostCommand>,
    client: RoomClient,
}

impl Harness {
    /// Re-broadcast and pump client updates until `done` holds. Repeated
    /// snapshots make the loop immune to command/update interleaving.
    async fn sync_until(&mut self, mut done: impl FnMut(&RoomClient) -> bool) {
        for _ in 0..50 {
            if done(&self.client) {
                return;
            }
            self.tx.send(HostCommand::Broadcast).await.unwrap();
            let _ = timeout(Duration::from_millis(100), self.client.next_update()).await;
        }
        assert!(done(&self.client), "condition not reached");
    }

    /// Walk the clock out of the opening countdown and run one market tick.
    async fn open_market(&mut self) {
        self.tx.send(HostCommand::ClockTick).await.unwrap();
        self.tx.send(HostCommand::ClockTick).await.unwrap();
        self.tx.send(HostCommand::MarketTick).await.unwrap();
        self.sync_until(|c| c.world.phase == GamePhase::Trading && !c.world.quotes.is_empty())
            .await;
    }
}

async fn start() -> Harness {
    let transport: Arc<dyn Transport> = ChannelTransport::new();
    let topics = Topics::new("openbell", "e2e");

    let (tx, rx) = mpsc::channel(256);
    spawn_inbound_pump(Arc::clone(&transport), topics.clone(), tx.clone())
        .await
        .unwrap();

    let mut room = GameRoom::with_seed(settings(), Arc::clone(&transport), topics.clone(), 99);
    room.start_game().await;
    tokio::spawn(room.run(rx));

    let client = RoomClient::join(transport, topics, "alice".into(), "Ada")
        .await
        .unwrap();
    Harness { tx, client }
}

#[tokio::test]
async fn test_join_receives_private_setup() {
    let mut h = start().await;
    h.sync_until(|c| c.world.settings.is_some() && c.world.me.is_some())
        .await;

    let settings = h.client.world.settings.as_ref().unwrap();
    assert_eq!(settings.stock_count, 3);
    assert_eq!(
        h.client.world.me.as_ref().unwrap().cash,
        settings.initial_cash
    );
}

#[tokio::test]
async fn test_tick_replicates_market_state() {
    let mut h = start().await;
    h.open_market().await;

    assert_eq!(h.client.world.quotes.len(), 3);
    for quote in h.client.world.quotes.values() {
        assert_eq!(quote.bids.len(), 5);
        assert_eq!(quote.asks.len(), 5);
    }
    assert!(h.client.world.seq > 0);
}

#[tokio::test]
async fn test_order_provisional_then_confirmed() {
    let mut h = start().await;
    h.open_market().await;

    let stock_id: StockId = h.client.world.quotes.keys().next().unwrap().clone();
    let price = h.client.world.quotes[&stock_id].price;

    // A limit far below the market rests on the host
    let limit = (price / rust_decimal::Decimal::from(2)).round_dp(2);
    h.client
        .submit_order(stock_id.clone(), Side::Buy, 10, OrderRequest::Limit { limit })
        .await
        .unwrap();
    assert_eq!(h.client.world.pending.len(), 1);
    assert!(!h.client.world.pending[0].is_confirmed());

    h.sync_until(|c| c.world.pending.iter().any(|e| e.is_confirmed()))
        .await;

    let me = h.client.world.me.as_ref().unwrap();
    assert_eq!(me.pending_orders.len(), 1);
    assert!(me.cash < settings().initial_cash, "reservation visible");
}

#[tokio::test]
async fn test_market_buy_shows_up_in_next_snapshot() {
    let mut h = start().await;
    h.open_market().await;

    let stock_id: StockId = h.client.world.quotes.keys().next().unwrap().clone();
    h.client
        .submit_order(stock_id.clone(), Side::Buy, 10, OrderRequest::Market)
        .await
        .unwrap();
    // Market orders never rest locally
    assert!(h.client.world.pending.is_empty());

    h.sync_until(|c| {
        c.world
            .me
            .as_ref()
            .is_some_and(|me| me.portfolio.get(&stock_id) == Some(&10))
    })
    .await;
}
