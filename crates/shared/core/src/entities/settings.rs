use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::values::Cash;

/// A loan offer available to players
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanProvider {
    pub name: String,
    /// Flat rate added to the booked debt (0.10 = 10%)
    pub rate: Decimal,
    pub max_amount: Cash,
}

/// Room configuration, read-only for the duration of a tick batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSettings {
    pub stock_count: usize,
    pub bot_count: usize,
    pub initial_cash: Cash,

    /// Session lengths in seconds
    pub opening_secs: u32,
    pub morning_secs: u32,
    pub break_secs: u32,
    pub afternoon_secs: u32,
    pub day_end_secs: u32,
    pub total_days: u32,

    /// News cadence for the external generator
    pub news_frequency_secs: u32,
    /// Market tick interval
    pub market_refresh_ms: u64,

    /// Notional divisor converting net order flow into price pressure
    pub market_depth: f64,
    /// Extra weight given to human order flow
    pub player_impact_multiplier: f64,

    /// Fee charged on both sides (fraction, 0.0015 = 0.15%)
    pub transaction_fee_rate: Decimal,
    /// Additional tax charged on sells
    pub stamp_tax_rate: Decimal,
    /// Half-width of the daily limit band (0.30 = +-30%)
    pub max_daily_fluctuation: Decimal,

    pub loan_providers: Vec<LoanProvider>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            stock_count: 8,
            bot_count: 40,
            initial_cash: dec!(100000),
            opening_secs: 30,
            morning_secs: 300,
            break_secs: 60,
            afternoon_secs: 300,
            day_end_secs: 20,
            total_days: 3,
            news_frequency_secs: 45,
            market_refresh_ms: 1000,
            market_depth: 1_000_000.0,
            player_impact_multiplier: 3.0,
            transaction_fee_rate: dec!(0.0015),
            stamp_tax_rate: dec!(0.001),
            max_daily_fluctuation: dec!(0.30),
            loan_providers: vec![
                LoanProvider {
                    name: "Campus Credit".to_string(),
                    rate: dec!(0.05),
                    max_amount: dec!(50000),
                },
                LoanProvider {
                    name: "Shark Capital".to_string(),
                    rate: dec!(0.15),
                    max_amount: dec!(200000),
                },
            ],
        }
    }
}

impl GameSettings {
    /// Real seconds in one simulated trading day.
    pub fn day_secs(&self) -> u32 {
        self.opening_secs + self.morning_secs + self.break_secs + self.afternoon_secs
            + self.day_end_secs
    }

    /// Convert a duration in simulated hours to real milliseconds,
    /// treating one configured day as 24 simulated hours.
    pub fn sim_hours_to_ms(&self, hours: u32) -> i64 {
        i64::from(self.day_secs()) * 1000 * i64::from(hours) / 24
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_hours_scale_to_configured_day() {
        let settings = GameSettings::default();
        let day_ms = i64::from(settings.day_secs()) * 1000;

        assert_eq!(settings.sim_hours_to_ms(24), day_ms);
        assert_eq!(settings.sim_hours_to_ms(96), day_ms * 4);
    }
}
