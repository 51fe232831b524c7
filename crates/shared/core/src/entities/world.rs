use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    GamePhase, GameSettings, MacroCondition, Notification, Player, PlayerId, Stock, StockId,
    TradingSession,
};
use crate::values::{Price, RingBuffer};

/// Notifications retained for tick broadcasts
pub const NOTIFICATION_CAPACITY: usize = 32;

/// The authoritative room state.
///
/// Single-writer: exactly one host task owns and mutates a `World`; every
/// other party sees it only through replication snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub day: u32,
    pub phase: GamePhase,
    pub session: TradingSession,
    pub time_left_secs: u32,

    /// Equal-weight index of all stocks vs. their starting prices, base 1000
    pub market_index: Decimal,
    /// Monotonic market-tick counter, also the idempotency guard for
    /// pending-order evaluation and client-side tick application
    pub tick_seq: u64,

    pub stocks: BTreeMap<StockId, Stock>,
    pub players: BTreeMap<PlayerId, Player>,
    pub macro_condition: MacroCondition,
    pub notifications: RingBuffer<Notification>,

    pub settings: GameSettings,
}

impl World {
    pub fn new(settings: GameSettings) -> Self {
        Self {
            day: 1,
            phase: GamePhase::Lobby,
            session: TradingSession::Morning,
            time_left_secs: 0,
            market_index: Decimal::new(1000, 0),
            tick_seq: 0,
            stocks: BTreeMap::new(),
            players: BTreeMap::new(),
            macro_condition: MacroCondition::default(),
            notifications: RingBuffer::new(NOTIFICATION_CAPACITY),
            settings,
        }
    }

    /// Whether simulation ticks (price, bots, matching) should run now.
    pub fn market_open(&self) -> bool {
        self.phase == GamePhase::Trading && self.session.is_open()
    }

    /// Current price per stock, the shape valuation helpers consume.
    pub fn price_table(&self) -> HashMap<StockId, Price> {
        self.stocks
            .iter()
            .map(|(id, stock)| (id.clone(), stock.price))
            .collect()
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Human players only (bots never appear in replication payloads).
    pub fn humans(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| !p.is_bot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Sector;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_open_gating() {
        let mut world = World::new(GameSettings::default());
        assert!(!world.market_open());

        world.phase = GamePhase::Trading;
        world.session = TradingSession::Morning;
        assert!(world.market_open());

        world.session = TradingSession::Break;
        assert!(!world.market_open());

        world.session = TradingSession::Afternoon;
        assert!(world.market_open());

        world.phase = GamePhase::Ended;
        assert!(!world.market_open());
    }

    #[test]
    fn test_price_table_reflects_stocks() {
        let mut world = World::new(GameSettings::default());
        let stock = Stock::new("s1", "OPB", "Openbell", Sector::Tech, dec!(42), 0.02, 1.0);
        world.stocks.insert(stock.id.clone(), stock);

        let table = world.price_table();
        assert_eq!(table[&StockId::new("s1")], dec!(42));
    }
}
