use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::values::{Price, RingBuffer};

/// Price history retained per stock (one point per tick)
pub const HISTORY_CAPACITY: usize = 512;

/// Transaction tape retained per stock
pub const TAPE_CAPACITY: usize = 128;

/// Unique identifier for a stock
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockId(String);

impl StockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StockId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StockId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Industry sector, used for macro impact routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sector {
    Tech,
    Finance,
    Energy,
    Consumer,
    Healthcare,
    Industrial,
}

impl Sector {
    pub const ALL: [Sector; 6] = [
        Sector::Tech,
        Sector::Finance,
        Sector::Energy,
        Sector::Consumer,
        Sector::Healthcare,
        Sector::Industrial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Tech => "tech",
            Sector::Finance => "finance",
            Sector::Energy => "energy",
            Sector::Consumer => "consumer",
            Sector::Healthcare => "healthcare",
            Sector::Industrial => "industrial",
        }
    }
}

/// One point of per-tick price history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub time: DateTime<Utc>,
    pub price: Price,
    pub volume: i64,
}

/// One executed trade on the stock's tape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransaction {
    pub time: DateTime<Utc>,
    pub price: Price,
    pub amount: i64,
    /// True for buys (price-up pressure)
    pub is_buy: bool,
}

/// A tradeable stock in the shared market
///
/// `price` is mutated only by the price engine; history and the transaction
/// tape are append-only bounded rings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    pub id: StockId,
    pub symbol: String,
    pub name: String,
    pub sector: Sector,

    /// Latest tick price
    pub price: Price,
    /// Today's reference price for the limit band
    pub open_price: Price,
    /// Price at the previous tick
    pub last_price: Price,

    /// Per-tick random drift scale
    pub volatility: f64,
    /// Sensitivity to the global trend and macro sentiment
    pub beta: f64,
    /// Smoothed momentum feed (realized pct change, decayed each tick)
    pub momentum: f64,
    /// Longer-horizon smoothed trend, input to bot herding
    pub trend: f64,

    /// Shares traded since the day opened
    pub total_volume: i64,
    /// Shares traded during the current tick
    pub tick_volume: i64,

    pub history: RingBuffer<PricePoint>,
    pub transactions: RingBuffer<StockTransaction>,
}

impl Stock {
    pub fn new(
        id: impl Into<StockId>,
        symbol: impl Into<String>,
        name: impl Into<String>,
        sector: Sector,
        price: Price,
        volatility: f64,
        beta: f64,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            sector,
            price,
            open_price: price,
            last_price: price,
            volatility,
            beta,
            momentum: 0.0,
            trend: 0.0,
            total_volume: 0,
            tick_volume: 0,
            history: RingBuffer::new(HISTORY_CAPACITY),
            transactions: RingBuffer::new(TAPE_CAPACITY),
        }
    }

    /// Intraday limit band derived from today's open price.
    pub fn limit_band(&self, max_fluctuation: Decimal) -> (Price, Price) {
        let down = (self.open_price * (Decimal::ONE - max_fluctuation)).round_dp(2);
        let up = (self.open_price * (Decimal::ONE + max_fluctuation)).round_dp(2);
        (down, up)
    }

    /// Change vs today's open, as a percentage.
    pub fn change_percent(&self) -> Decimal {
        if self.open_price.is_zero() {
            return Decimal::ZERO;
        }
        ((self.price - self.open_price) / self.open_price * dec!(100)).round_dp(2)
    }

    /// Record an executed trade on the tape and in the volume counters.
    pub fn record_trade(&mut self, time: DateTime<Utc>, price: Price, amount: i64, is_buy: bool) {
        self.total_volume += amount;
        self.tick_volume += amount;
        self.transactions.push(StockTransaction {
            time,
            price,
            amount,
            is_buy,
        });
    }

    /// Append the current price to history and reset the tick volume counter.
    pub fn close_tick(&mut self, time: DateTime<Utc>) {
        self.history.push(PricePoint {
            time,
            price: self.price,
            volume: self.tick_volume,
        });
        self.tick_volume = 0;
    }

    /// Start a new trading day at the (gapped) open price.
    ///
    /// Resets the limit-band reference, daily volume and momentum.
    pub fn begin_day(&mut self, gapped_open: Price) {
        self.price = gapped_open;
        self.open_price = gapped_open;
        self.last_price = gapped_open;
        self.momentum = 0.0;
        self.trend = 0.0;
        self.total_volume = 0;
        self.tick_volume = 0;
    }
}
