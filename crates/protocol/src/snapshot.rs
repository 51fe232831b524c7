//! Snapshot projections
//!
//! The periodic tick payload is a lossy, size-bounded projection of the
//! world, not a diff: clients can always rebuild from the latest one, which
//! is what makes message loss self-healing. Bots never appear in
//! replication payloads, and per-stock depth is synthesized from price and
//! volatility rather than replicating anyone's resting orders.

use openbell_core::{
    GamePhase, GameSettings, Notification, PendingOrder, Player, PlayerId, PlayerStats, Price,
    Stock, StockId, TradingSession, World,
};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Synthetic depth levels per side
pub const DEPTH_LEVELS: usize = 5;
/// Notifications carried per tick
const NOTIFICATIONS_PER_TICK: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Price,
    pub amount: i64,
}

/// Per-stock tick payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockQuote {
    pub id: StockId,
    pub price: Price,
    pub change_percent: Decimal,
    pub tick_volume: i64,
    pub total_volume: i64,
    /// Best bid first, descending
    pub bids: Vec<DepthLevel>,
    /// Best ask first, ascending
    pub asks: Vec<DepthLevel>,
}

/// Lightweight per-human-player state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub cash: Decimal,
    pub debt: Decimal,
    pub portfolio: HashMap<StockId, i64>,
    pub cost_basis: HashMap<StockId, Price>,
    pub pending_orders: Vec<PendingOrder>,
    pub stats: PlayerStats,
}

impl PlayerView {
    fn of(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            cash: player.cash,
            debt: player.debt,
            portfolio: player.portfolio.clone(),
            cost_basis: player.cost_basis.clone(),
            pending_orders: player.pending_orders.clone(),
            stats: player.stats.clone(),
        }
    }
}

/// The periodic SYNC_TICK payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickSnapshot {
    /// Monotonic per-room sequence; clients ignore anything stale
    pub seq: u64,
    pub day: u32,
    pub phase: GamePhase,
    pub session: TradingSession,
    pub time_left_secs: u32,
    pub market_index: Decimal,
    pub stocks: Vec<StockQuote>,
    pub players: Vec<PlayerView>,
    pub notifications: Vec<Notification>,
}

impl TickSnapshot {
    pub fn of(world: &World, seq: u64) -> Self {
        Self {
            seq,
            day: world.day,
            phase: world.phase,
            session: world.session,
            time_left_secs: world.time_left_secs,
            market_index: world.market_index,
            stocks: world
                .stocks
                .values()
                .map(|s| quote(s, &world.settings))
                .collect(),
            players: world.humans().map(PlayerView::of).collect(),
            notifications: world
                .notifications
                .tail(NOTIFICATIONS_PER_TICK)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

/// Full-state payload sent on join and lobby settings changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupSnapshot {
    pub phase: GamePhase,
    pub day: u32,
    pub settings: GameSettings,
    pub stocks: Vec<Stock>,
    pub players: Vec<PlayerView>,
}

impl SetupSnapshot {
    /// Snapshot for everyone in the room.
    pub fn of(world: &World) -> Self {
        Self {
            phase: world.phase,
            day: world.day,
            settings: world.settings.clone(),
            stocks: world.stocks.values().cloned().collect(),
            players: world.humans().map(PlayerView::of).collect(),
        }
    }

    /// Private variant carrying only the joining player, for the join reply.
    pub fn of_player(world: &World, player_id: &PlayerId) -> Self {
        let mut snapshot = Self::of(world);
        snapshot.players.retain(|p| &p.id == player_id);
        snapshot
    }
}

/// Build a quote with deterministic synthetic depth.
///
/// Levels step out from the price by a volatility-scaled increment and
/// decay in size; the stock's trend skews the bid/ask balance so the tape
/// looks directional without revealing any real resting orders.
fn quote(stock: &Stock, settings: &GameSettings) -> StockQuote {
    let price_f = decimal_to_f64(stock.price);
    let step_f = (price_f * stock.volatility * 0.5).max(0.01);
    let step = Decimal::from_f64(step_f)
        .unwrap_or(Decimal::new(1, 2))
        .round_dp(2)
        .max(Decimal::new(1, 2));

    let base_depth = (settings.market_depth / price_f.max(0.01) / 20.0).max(1.0);
    let skew = stock.trend.clamp(-0.5, 0.5);

    let mut bids = Vec::with_capacity(DEPTH_LEVELS);
    let mut asks = Vec::with_capacity(DEPTH_LEVELS);
    for i in 1..=DEPTH_LEVELS as i64 {
        let offset = step * Decimal::from(i);
        let decay = base_depth / i as f64;
        let bid_price = (stock.price - offset).max(Decimal::new(1, 2));
        bids.push(DepthLevel {
            price: bid_price,
            amount: (decay * (1.0 + skew)).round() as i64,
        });
        asks.push(DepthLevel {
            price: stock.price + offset,
            amount: (decay * (1.0 - skew)).round() as i64,
        });
    }

    StockQuote {
        id: stock.id.clone(),
        price: stock.price,
        change_percent: stock.change_percent(),
        tick_volume: stock.tick_volume,
        total_volume: stock.total_volume,
        bids,
        asks,
    }
}

fn decimal_to_f64(value: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use openbell_core::Sector;
    use rust_decimal_macros::dec;

    fn world_with_stock_and_players() -> World {
        let mut world = World::new(GameSettings::default());
        let stock = Stock::new("s1", "OPB", "Openbell", Sector::Tech, dec!(100), 0.02, 1.0);
        world.stocks.insert(stock.id.clone(), stock);

        world
            .players
            .insert("human".into(), Player::new("human", "Ada", dec!(1000)));
        let mut bot = Player::new("bot-1", "bot-1", dec!(1000));
        bot.is_bot = true;
        world.players.insert("bot-1".into(), bot);
        world
    }

    #[test]
    fn test_tick_snapshot_excludes_bots() {
        let world = world_with_stock_and_players();
        let snapshot = TickSnapshot::of(&world, 1);
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].id, "human".into());
    }

    #[test]
    fn test_synthetic_depth_shape() {
        let world = world_with_stock_and_players();
        let snapshot = TickSnapshot::of(&world, 1);
        let q = &snapshot.stocks[0];

        assert_eq!(q.bids.len(), DEPTH_LEVELS);
        assert_eq!(q.asks.len(), DEPTH_LEVELS);
        // Bids descend below the price, asks ascend above it
        for w in q.bids.windows(2) {
            assert!(w[0].price > w[1].price);
        }
        for w in q.asks.windows(2) {
            assert!(w[0].price < w[1].price);
        }
        assert!(q.bids[0].price < q.price);
        assert!(q.asks[0].price > q.price);
        // Top of book is deepest
        assert!(q.bids[0].amount >= q.bids[4].amount);
    }

    #[test]
    fn test_depth_is_deterministic() {
        let world = world_with_stock_and_players();
        let a = TickSnapshot::of(&world, 1);
        let b = TickSnapshot::of(&world, 2);
        assert_eq!(a.stocks[0].bids, b.stocks[0].bids);
        assert_eq!(a.stocks[0].asks, b.stocks[0].asks);
    }

    #[test]
    fn test_tick_carries_last_two_notifications() {
        let mut world = world_with_stock_and_players();
        for i in 0..5 {
            world.notify(Notification::broadcast(format!("n{i}")));
        }
        let snapshot = TickSnapshot::of(&world, 1);
        assert_eq!(snapshot.notifications.len(), 2);
        assert_eq!(snapshot.notifications[0].text, "n3");
        assert_eq!(snapshot.notifications[1].text, "n4");
    }

    #[test]
    fn test_private_setup_carries_only_self() {
        let world = world_with_stock_and_players();
        let snapshot = SetupSnapshot::of_player(&world, &"human".into());
        assert_eq!(snapshot.players.len(), 1);
        // Full stock state still included
        assert_eq!(snapshot.stocks.len(), 1);
    }
}
