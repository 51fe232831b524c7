use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StockId;
use crate::values::{Cash, Price};

/// Unique identifier for an order
pub type OrderId = Uuid;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

/// Order kind, carrying only the fields that kind needs.
///
/// Market orders execute immediately at submission and are never queued,
/// so there is no `Market` variant here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderKind {
    /// Execute when the tick price crosses the limit
    Limit { limit: Price },
    /// Sell when the price falls to or below the trigger
    StopLoss { trigger: Price },
    /// Sell when the price rises to or above the trigger
    StopProfit { trigger: Price },
    /// Sell when the price falls `percent` below the highest price seen
    /// since submission; `trigger` ratchets up with new highs
    TrailingStop { percent: Decimal, trigger: Price },
    /// Limit order revealed `chunk` shares at a time
    Iceberg { limit: Price, chunk: i64 },
}

impl OrderKind {
    /// The price a buy reservation must be able to cover.
    pub fn worst_case_price(&self) -> Option<Price> {
        match self {
            OrderKind::Limit { limit } | OrderKind::Iceberg { limit, .. } => Some(*limit),
            OrderKind::StopLoss { trigger }
            | OrderKind::StopProfit { trigger }
            | OrderKind::TrailingStop { trigger, .. } => Some(*trigger),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Limit { .. } => "limit",
            OrderKind::StopLoss { .. } => "stop_loss",
            OrderKind::StopProfit { .. } => "stop_profit",
            OrderKind::TrailingStop { .. } => "trailing_stop",
            OrderKind::Iceberg { .. } => "iceberg",
        }
    }
}

/// An order resting in a player's pending set.
///
/// Buy orders hold a cash reservation taken at submission; sell orders hold
/// a share reservation (the shares are moved out of the tradable portfolio).
/// Either is returned in full on cancel and consumed pro-rata on fills.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    pub id: OrderId,
    pub stock_id: StockId,
    pub side: Side,
    pub kind: OrderKind,
    pub original_amount: i64,
    pub remaining_amount: i64,
    /// Worst-case cost set aside at submission (buy orders only)
    pub reserved_cash: Option<Cash>,
    pub created_at: DateTime<Utc>,
    /// Market tick of the most recent fill; guards against double
    /// execution when a tick is evaluated more than once
    pub last_fill_tick: Option<u64>,
}

impl PendingOrder {
    pub fn new(
        stock_id: StockId,
        side: Side,
        kind: OrderKind,
        amount: i64,
        reserved_cash: Option<Cash>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            stock_id,
            side,
            kind,
            original_amount: amount,
            remaining_amount: amount,
            reserved_cash,
            created_at,
            last_fill_tick: None,
        }
    }

    /// Reserved cash attributable to `amount` shares of this order.
    pub fn reserved_for(&self, amount: i64) -> Cash {
        match self.reserved_cash {
            Some(reserved) if self.remaining_amount > 0 => {
                reserved * Decimal::from(amount) / Decimal::from(self.remaining_amount)
            }
            _ => Decimal::ZERO,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_amount <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pro_rata_reservation() {
        let order = PendingOrder::new(
            StockId::new("s1"),
            Side::Buy,
            OrderKind::Limit { limit: dec!(10) },
            100,
            Some(dec!(1001.5)),
            Utc::now(),
        );

        // Full cancel returns everything
        assert_eq!(order.reserved_for(100), dec!(1001.5));
        // Half the shares release half the reservation
        assert_eq!(order.reserved_for(50), dec!(500.75));
    }

    #[test]
    fn test_worst_case_price_per_kind() {
        assert_eq!(
            OrderKind::Limit { limit: dec!(12) }.worst_case_price(),
            Some(dec!(12))
        );
        assert_eq!(
            OrderKind::Iceberg {
                limit: dec!(8),
                chunk: 100
            }
            .worst_case_price(),
            Some(dec!(8))
        );
        assert_eq!(
            OrderKind::TrailingStop {
                percent: dec!(5),
                trigger: dec!(95)
            }
            .worst_case_price(),
            Some(dec!(95))
        );
    }
}
