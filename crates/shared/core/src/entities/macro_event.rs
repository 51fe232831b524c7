use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Sector;

/// Global economic backdrop shared by every stock.
///
/// Mutated only by applying and reverting macro events; every applied
/// impact must be subtracted exactly when its event expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroCondition {
    /// Overall market sentiment, roughly [-1, 1]
    pub sentiment: f64,
    /// Policy interest rate level
    pub interest_rate: f64,
    pub inflation: f64,
    pub growth: f64,
    /// Multiplier applied to per-stock volatility
    pub volatility_mult: f64,
    /// Additive per-sector performance offsets
    pub sector_performance: HashMap<Sector, f64>,
}

impl Default for MacroCondition {
    fn default() -> Self {
        Self {
            sentiment: 0.0,
            interest_rate: 0.03,
            inflation: 0.02,
            growth: 0.025,
            volatility_mult: 1.0,
            sector_performance: Sector::ALL.iter().map(|s| (*s, 0.0)).collect(),
        }
    }
}

impl MacroCondition {
    /// Sentiment plus the active offset for one sector (price engine input).
    pub fn sector_impact(&self, sector: Sector) -> f64 {
        self.sentiment + self.sector_performance.get(&sector).copied().unwrap_or(0.0)
    }

    /// Global trend proxy fed to the beta term of the price engine.
    pub fn global_trend(&self) -> f64 {
        self.sentiment * 0.5 + (self.growth - self.inflation) * 2.0
    }
}

/// Broad category of a macro event, mapped to a template catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventCategory {
    MonetaryPolicy,
    Geopolitics,
    Technology,
    Commodity,
    Pandemic,
    Regulation,
}

/// Severity scales both the impact magnitude and the event duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Minor,
    Moderate,
    Major,
}

impl EventSeverity {
    /// Duration in simulated hours (24-96), per severity.
    pub fn duration_hours(&self) -> u32 {
        match self {
            EventSeverity::Minor => 24,
            EventSeverity::Moderate => 48,
            EventSeverity::Major => 96,
        }
    }
}

/// One typed, additive impact carried by a macro event.
///
/// Applying and reverting the same impact must round-trip the condition
/// exactly (modulo floating-point addition order).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "impact", content = "value", rename_all = "snake_case")]
pub enum MacroImpact {
    Sentiment(f64),
    SectorPerformance(Sector, f64),
    InterestRate(f64),
    Inflation(f64),
    Growth(f64),
    Volatility(f64),
}

impl MacroImpact {
    pub fn apply(&self, condition: &mut MacroCondition) {
        match *self {
            MacroImpact::Sentiment(v) => condition.sentiment += v,
            MacroImpact::SectorPerformance(sector, v) => {
                *condition.sector_performance.entry(sector).or_insert(0.0) += v;
            }
            MacroImpact::InterestRate(v) => condition.interest_rate += v,
            MacroImpact::Inflation(v) => condition.inflation += v,
            MacroImpact::Growth(v) => condition.growth += v,
            MacroImpact::Volatility(v) => condition.volatility_mult += v,
        }
    }

    /// Exact inverse of `apply`.
    pub fn revert(&self, condition: &mut MacroCondition) {
        match *self {
            MacroImpact::Sentiment(v) => condition.sentiment -= v,
            MacroImpact::SectorPerformance(sector, v) => {
                *condition.sector_performance.entry(sector).or_insert(0.0) -= v;
            }
            MacroImpact::InterestRate(v) => condition.interest_rate -= v,
            MacroImpact::Inflation(v) => condition.inflation -= v,
            MacroImpact::Growth(v) => condition.growth -= v,
            MacroImpact::Volatility(v) => condition.volatility_mult -= v,
        }
    }
}

/// A spawned macro event with a finite lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroEvent {
    pub id: Uuid,
    pub category: EventCategory,
    pub severity: EventSeverity,
    pub headline: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub impacts: Vec<MacroImpact>,
}

impl MacroEvent {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        (now - self.started_at).num_milliseconds() >= self.duration_ms
    }
}
