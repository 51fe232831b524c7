use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderId, PendingOrder, Side, StockId};
use crate::values::{Cash, Price, RingBuffer};

/// Trade history retained per player
pub const TRADE_HISTORY_CAPACITY: usize = 64;

/// Unique identifier for a player (client-provided, stable across reconnects)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One executed fill in a player's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub order_id: OrderId,
    pub stock_id: StockId,
    pub side: Side,
    pub price: Price,
    pub amount: i64,
    pub fee: Cash,
    pub time: DateTime<Utc>,
}

/// Running per-player statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    pub trade_count: u64,
    /// Highest total asset value observed after any fill
    pub peak_value: Cash,
    /// Lowest total asset value observed after any fill
    pub worst_value: Cash,
}

impl PlayerStats {
    pub fn observe_value(&mut self, total: Cash) {
        if self.peak_value.is_zero() || total > self.peak_value {
            self.peak_value = total;
        }
        if self.worst_value.is_zero() || total < self.worst_value {
            self.worst_value = total;
        }
    }
}

/// A participant in the room.
///
/// Invariants: `cash >= 0`, every portfolio quantity is positive, and
/// zero-quantity entries are removed together with their cost-basis entry.
/// All mutating paths validate or reserve before committing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub cash: Cash,
    pub debt: Cash,
    pub portfolio: HashMap<StockId, i64>,
    pub cost_basis: HashMap<StockId, Price>,
    pub pending_orders: Vec<PendingOrder>,
    pub trade_history: RingBuffer<TradeRecord>,
    pub stats: PlayerStats,
    pub is_bot: bool,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>, cash: Cash) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cash,
            debt: Decimal::ZERO,
            portfolio: HashMap::new(),
            cost_basis: HashMap::new(),
            pending_orders: Vec::new(),
            trade_history: RingBuffer::new(TRADE_HISTORY_CAPACITY),
            stats: PlayerStats::default(),
            is_bot: false,
        }
    }

    pub fn holding(&self, stock_id: &StockId) -> i64 {
        self.portfolio.get(stock_id).copied().unwrap_or(0)
    }

    /// Mark-to-market value of the portfolio at the given prices.
    pub fn market_value(&self, prices: &HashMap<StockId, Price>) -> Cash {
        self.portfolio
            .iter()
            .map(|(stock_id, qty)| {
                prices.get(stock_id).copied().unwrap_or(Decimal::ZERO) * Decimal::from(*qty)
            })
            .sum()
    }

    /// Cash plus holdings minus outstanding debt.
    pub fn total_assets(&self, prices: &HashMap<StockId, Price>) -> Cash {
        self.cash + self.market_value(prices) - self.debt
    }

    /// Credit bought shares into the portfolio with weighted-average cost.
    ///
    /// `new_avg = (old_qty * old_avg + fill_qty * fill_price) / (old_qty + fill_qty)`
    pub fn credit_shares(&mut self, stock_id: &StockId, amount: i64, price: Price) {
        let old_qty = self.holding(stock_id);
        let old_avg = self
            .cost_basis
            .get(stock_id)
            .copied()
            .unwrap_or(Decimal::ZERO);

        let new_qty = old_qty + amount;
        let new_avg = (old_avg * Decimal::from(old_qty) + price * Decimal::from(amount))
            / Decimal::from(new_qty);

        self.portfolio.insert(stock_id.clone(), new_qty);
        self.cost_basis.insert(stock_id.clone(), new_avg);
    }

    /// Remove shares from the tradable portfolio (sell fill or sell-order
    /// reservation). Does not touch the cost basis: reserved shares still
    /// carry it until [`Player::cleanup_cost_basis`] confirms nothing is
    /// left.
    ///
    /// Callers must have validated or reserved the shares; draining more
    /// than held is a precondition violation, not a runtime condition.
    pub fn remove_shares(&mut self, stock_id: &StockId, amount: i64) {
        let held = self.holding(stock_id);
        debug_assert!(held >= amount, "share debit exceeds holding");

        let remaining = held - amount;
        if remaining > 0 {
            self.portfolio.insert(stock_id.clone(), remaining);
        } else {
            self.portfolio.remove(stock_id);
        }
    }

    /// Return reserved shares to the tradable portfolio (order cancel).
    pub fn restore_shares(&mut self, stock_id: &StockId, amount: i64) {
        if amount > 0 {
            *self.portfolio.entry(stock_id.clone()).or_insert(0) += amount;
        }
    }

    /// Shares held back by pending sell orders for one stock.
    pub fn reserved_sell_shares(&self, stock_id: &StockId) -> i64 {
        self.pending_orders
            .iter()
            .filter(|o| o.side == Side::Sell && &o.stock_id == stock_id)
            .map(|o| o.remaining_amount)
            .sum()
    }

    /// Drop the cost-basis entry once neither the portfolio nor any pending
    /// sell reservation holds shares of the stock.
    pub fn cleanup_cost_basis(&mut self, stock_id: &StockId) {
        if self.holding(stock_id) == 0 && self.reserved_sell_shares(stock_id) == 0 {
            self.cost_basis.remove(stock_id);
        }
    }

    /// Borrow from a loan provider: cash in now, rate-inflated debt booked.
    pub fn take_loan(&mut self, amount: Cash, rate: Decimal) {
        self.cash += amount;
        self.debt += (amount * (Decimal::ONE + rate)).round_dp(2);
    }

    /// Pay down debt with available cash; returns the amount actually repaid.
    pub fn repay_loan(&mut self, amount: Cash) -> Cash {
        let repay = amount.min(self.cash).min(self.debt);
        self.cash -= repay;
        self.debt -= repay;
        repay
    }

    pub fn find_order(&self, order_id: OrderId) -> Option<&PendingOrder> {
        self.pending_orders.iter().find(|o| o.id == order_id)
    }
}
