use chrono::{DateTime, Utc};
use log::trace;
use openbell_core::{GameSettings, MacroCondition, Stock, StockId};
use rand::Rng;
use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};

/// Momentum carried into the next tick decays by this factor
const MOMENTUM_DECAY: f64 = 0.90;

/// Per-tick total change clamp
const MAX_TICK_CHANGE: f64 = 0.03;

/// Volume-impact term clamp
const MAX_VOLUME_IMPACT: f64 = 0.03;

/// Raw deltas below this are considered a stall
const NEGLIGIBLE_CHANGE: f64 = 0.001;

/// Absolute price nudge applied on a stall so the tape never flatlines
const STALL_NUDGE: f64 = 0.01;

/// Weight of the global-trend beta term
const GLOBAL_TREND_WEIGHT: f64 = 0.002;

/// Weight of the macro sentiment beta term
const SENTIMENT_WEIGHT: f64 = 0.004;

/// Weight of the sector performance offset
const SECTOR_WEIGHT: f64 = 0.003;

/// Scale of the random drift relative to stock volatility
const DRIFT_SCALE: f64 = 0.5;

/// A bounded, time-decaying sinusoidal price impulse registered by an
/// external company-decision event.
#[derive(Debug, Clone)]
pub struct CompanyPulse {
    pub stock_id: StockId,
    /// Peak per-tick contribution (fraction, clamped to the tick cap)
    pub magnitude: f64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl CompanyPulse {
    /// Contribution at `now`: a half-sine envelope that fades as the pulse
    /// ages, zero once expired.
    pub fn value(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = (now - self.started_at).num_milliseconds();
        if elapsed < 0 || elapsed >= self.duration_ms || self.duration_ms <= 0 {
            return 0.0;
        }
        let progress = elapsed as f64 / self.duration_ms as f64;
        self.magnitude * (std::f64::consts::PI * progress).sin() * (1.0 - progress)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        (now - self.started_at).num_milliseconds() >= self.duration_ms
    }
}

/// Result of recomputing one stock for one tick
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub stock_id: StockId,
    pub price: Decimal,
    /// Realized change vs. the previous tick (fraction)
    pub change: f64,
    /// Price ended pinned at the limit band
    pub halted_at_limit: bool,
}

/// Discrete-time price formation.
///
/// Each tick sums momentum, volume impact, random drift, global trend,
/// macro and sector impact and any company pulse, clamps the total, applies
/// it and enforces the daily limit band. Determinism is not required; only
/// the bounds are.
#[derive(Debug, Default)]
pub struct PriceEngine {
    pulses: Vec<CompanyPulse>,
    tick_count: u64,
}

impl PriceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a company-decision impulse (external collaborator event).
    pub fn register_pulse(&mut self, pulse: CompanyPulse) {
        self.pulses.push(pulse);
    }

    /// Drop expired pulses; call once per tick.
    pub fn expire_pulses(&mut self, now: DateTime<Utc>) {
        self.pulses.retain(|p| !p.is_expired(now));
    }

    fn pulse_for(&self, stock_id: &StockId, now: DateTime<Utc>) -> f64 {
        self.pulses
            .iter()
            .filter(|p| &p.stock_id == stock_id)
            .map(|p| p.value(now))
            .sum()
    }

    /// Recompute one stock's price for this tick.
    ///
    /// `net_flow` is the drained signed notional for this stock.
    pub fn tick_stock<R: Rng>(
        &mut self,
        stock: &mut Stock,
        net_flow: f64,
        condition: &MacroCondition,
        settings: &GameSettings,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> TickOutcome {
        self.tick_count += 1;

        let momentum = stock.momentum * MOMENTUM_DECAY;

        let volume_impact =
            (net_flow / settings.market_depth).clamp(-MAX_VOLUME_IMPACT, MAX_VOLUME_IMPACT);

        let drift = stock.volatility
            * condition.volatility_mult
            * DRIFT_SCALE
            * rng.gen_range(-1.0..1.0);

        let global = condition.global_trend() * stock.beta * GLOBAL_TREND_WEIGHT;
        let sentiment = condition.sentiment * stock.beta * SENTIMENT_WEIGHT;
        let sector = condition
            .sector_performance
            .get(&stock.sector)
            .copied()
            .unwrap_or(0.0)
            * SECTOR_WEIGHT;
        let pulse = self.pulse_for(&stock.id, now);

        let raw = momentum + volume_impact + drift + global + sentiment + sector + pulse;
        let change = raw.clamp(-MAX_TICK_CHANGE, MAX_TICK_CHANGE);

        let old_price = stock.price;
        let old_f64 = old_price.to_f64().unwrap_or(0.0);
        let mut new_f64 = old_f64 * (1.0 + change);

        // Never let the tape visibly stall: deterministic one-cent nudge,
        // direction alternating with the tick counter
        if (new_f64 - old_f64).abs() < NEGLIGIBLE_CHANGE {
            let sign = if self.tick_count % 2 == 0 { 1.0 } else { -1.0 };
            new_f64 = old_f64 + sign * STALL_NUDGE;
        }

        let mut new_price = Decimal::from_f64(new_f64.max(0.01))
            .unwrap_or(old_price)
            .round_dp(2);

        // Daily limit band; ending exactly on the band is a valid halt
        let (limit_down, limit_up) = stock.limit_band(settings.max_daily_fluctuation);
        let halted_at_limit = if new_price >= limit_up {
            new_price = limit_up;
            true
        } else if new_price <= limit_down {
            new_price = limit_down;
            true
        } else {
            false
        };

        let realized = if old_f64 > 0.0 {
            (new_price.to_f64().unwrap_or(old_f64) - old_f64) / old_f64
        } else {
            0.0
        };

        stock.last_price = old_price;
        stock.price = new_price;
        stock.momentum = realized;
        stock.trend = stock.trend * 0.9 + realized * 0.1;
        stock.close_tick(now);

        trace!(
            "tick {}: {} {} -> {} (mom {:.4} vol {:.4} drift {:.4})",
            self.tick_count, stock.symbol, old_price, new_price, momentum, volume_impact, drift
        );

        TickOutcome {
            stock_id: stock.id.clone(),
            price: new_price,
            change: realized,
            halted_at_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openbell_core::Sector;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal_macros::dec;

    fn stock(price: Decimal, volatility: f64) -> Stock {
        Stock::new("s1", "OPB", "Openbell", Sector::Tech, price, volatility, 1.0)
    }

    fn quiet_settings() -> GameSettings {
        GameSettings {
            market_depth: 1_000_000.0,
            max_daily_fluctuation: dec!(0.30),
            ..GameSettings::default()
        }
    }

    #[test]
    fn test_price_stays_inside_limit_band() {
        let settings = quiet_settings();
        let condition = MacroCondition::default();
        let mut engine = PriceEngine::new();
        let mut rng = StdRng::seed_from_u64(9);
        let mut s = stock(dec!(100), 0.05);

        for _ in 0..2_000 {
            // Alternate extreme buy and sell pressure
            let flow = if rng.gen_bool(0.5) { 1e9 } else { -1e9 };
            engine.tick_stock(&mut s, flow, &condition, &settings, Utc::now(), &mut rng);

            let (down, up) = s.limit_band(settings.max_daily_fluctuation);
            assert!(s.price >= down && s.price <= up, "price {} escaped band", s.price);
        }
    }

    #[test]
    fn test_clamp_exact_at_limit_up() {
        let settings = quiet_settings();
        let condition = MacroCondition::default();
        let mut engine = PriceEngine::new();
        let mut rng = StdRng::seed_from_u64(1);

        // Start just under the +30% band; massive buy flow must pin at 130
        let mut s = stock(dec!(100), 0.0);
        s.price = dec!(129.50);

        let outcome = engine.tick_stock(
            &mut s,
            1e12, // saturates the +3% volume clamp
            &condition,
            &settings,
            Utc::now(),
            &mut rng,
        );

        assert_eq!(s.price, dec!(130.00));
        assert!(outcome.halted_at_limit);
    }

    #[test]
    fn test_five_percent_raw_delta_capped_under_band() {
        // Open 100, band 30%, raw +5% tick -> result <= 130
        let settings = quiet_settings();
        let condition = MacroCondition::default();
        let mut engine = PriceEngine::new();
        let mut rng = StdRng::seed_from_u64(2);

        let mut s = stock(dec!(100), 0.0);
        s.momentum = 0.05 / MOMENTUM_DECAY; // decays to exactly +5% raw

        engine.tick_stock(&mut s, 0.0, &condition, &settings, Utc::now(), &mut rng);

        // Total is clamped to +3% per tick, well inside the band
        assert_eq!(s.price, dec!(103.00));
        assert!(s.price <= dec!(130));
    }

    #[test]
    fn test_stall_nudge_moves_price() {
        let settings = quiet_settings();
        let condition = MacroCondition::default();
        let mut engine = PriceEngine::new();
        let mut rng = StdRng::seed_from_u64(5);

        // Zero volatility, zero flow, zero momentum: raw delta is negligible
        let mut s = stock(dec!(40), 0.0);
        let before = s.price;
        engine.tick_stock(&mut s, 0.0, &condition, &settings, Utc::now(), &mut rng);

        assert_ne!(s.price, before);
        assert_eq!((s.price - before).abs(), dec!(0.01));
    }

    #[test]
    fn test_momentum_feeds_next_tick() {
        let settings = quiet_settings();
        let condition = MacroCondition::default();
        let mut engine = PriceEngine::new();
        let mut rng = StdRng::seed_from_u64(8);

        let mut s = stock(dec!(100), 0.0);
        engine.tick_stock(&mut s, 3e7, &condition, &settings, Utc::now(), &mut rng);

        // Strong buy flow realized ~+3%; momentum must carry it
        assert!(s.momentum > 0.02, "momentum {} not carried", s.momentum);
    }

    #[test]
    fn test_company_pulse_decays_to_zero() {
        let now = Utc::now();
        let pulse = CompanyPulse {
            stock_id: StockId::new("s1"),
            magnitude: 0.02,
            started_at: now,
            duration_ms: 10_000,
        };

        assert_eq!(pulse.value(now), 0.0); // sin(0) = 0
        let mid = pulse.value(now + chrono::Duration::milliseconds(5_000));
        assert!(mid > 0.0 && mid <= 0.02);
        let late = pulse.value(now + chrono::Duration::milliseconds(9_900));
        assert!(late < mid);
        assert_eq!(pulse.value(now + chrono::Duration::milliseconds(10_000)), 0.0);
        assert!(pulse.is_expired(now + chrono::Duration::milliseconds(10_000)));
    }

    #[test]
    fn test_expired_pulses_dropped() {
        let now = Utc::now();
        let mut engine = PriceEngine::new();
        engine.register_pulse(CompanyPulse {
            stock_id: StockId::new("s1"),
            magnitude: 0.01,
            started_at: now,
            duration_ms: 1_000,
        });

        engine.expire_pulses(now + chrono::Duration::milliseconds(2_000));
        assert_eq!(engine.pulse_for(&StockId::new("s1"), now), 0.0);
        assert!(engine.pulses.is_empty());
    }
}
