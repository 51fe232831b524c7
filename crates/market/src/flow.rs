use std::collections::HashMap;

use openbell_core::StockId;

/// Net signed order flow accumulated during one tick.
///
/// Bots and player fills both record here; the price engine drains the
/// whole book exactly once per tick, so no order "jumps ahead" of another
/// within a tick.
#[derive(Debug, Default)]
pub struct OrderFlowBook {
    /// Signed notional per stock: buys positive, sells negative
    flow: HashMap<StockId, f64>,
}

impl OrderFlowBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an executed (or synthetic) trade.
    pub fn record(&mut self, stock_id: &StockId, notional: f64, is_buy: bool) {
        let signed = if is_buy { notional } else { -notional };
        *self.flow.entry(stock_id.clone()).or_insert(0.0) += signed;
    }

    /// Record with an extra weight (human flow carries a configured
    /// multiplier over bot flow).
    pub fn record_weighted(&mut self, stock_id: &StockId, notional: f64, is_buy: bool, weight: f64) {
        self.record(stock_id, notional * weight, is_buy);
    }

    pub fn net(&self, stock_id: &StockId) -> f64 {
        self.flow.get(stock_id).copied().unwrap_or(0.0)
    }

    /// Take this tick's flow, leaving the book empty for the next tick.
    pub fn drain(&mut self) -> HashMap<StockId, f64> {
        std::mem::take(&mut self.flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buys_and_sells_net_out() {
        let mut book = OrderFlowBook::new();
        let stock = StockId::new("s1");

        book.record(&stock, 10_000.0, true);
        book.record(&stock, 4_000.0, false);

        assert_eq!(book.net(&stock), 6_000.0);
    }

    #[test]
    fn test_weighted_player_flow() {
        let mut book = OrderFlowBook::new();
        let stock = StockId::new("s1");

        book.record_weighted(&stock, 1_000.0, true, 3.0);
        assert_eq!(book.net(&stock), 3_000.0);
    }

    #[test]
    fn test_drain_clears_for_next_tick() {
        let mut book = OrderFlowBook::new();
        let stock = StockId::new("s1");
        book.record(&stock, 500.0, true);

        let drained = book.drain();
        assert_eq!(drained[&stock], 500.0);
        assert_eq!(book.net(&stock), 0.0);
    }
}
