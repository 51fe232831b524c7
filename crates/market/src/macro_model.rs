use chrono::{DateTime, Utc};
use log::{debug, info};
use openbell_core::{
    EventCategory, EventSeverity, GameSettings, MacroCondition, MacroEvent, MacroImpact, Sector,
};
use rand::Rng;
use uuid::Uuid;

/// Per-tick probability of spawning a macro event
const SPAWN_PROBABILITY: f64 = 0.04;

/// Magnitude jitter applied to every templated impact (+-20%)
const JITTER: f64 = 0.20;

/// One entry in the fixed event catalog
struct EventTemplate {
    category: EventCategory,
    severity: EventSeverity,
    headline: &'static str,
    impacts: &'static [MacroImpact],
}

/// Catalog of macro event shapes; each carries one or two typed impacts.
const CATALOG: &[EventTemplate] = &[
    EventTemplate {
        category: EventCategory::MonetaryPolicy,
        severity: EventSeverity::Moderate,
        headline: "Central bank surprises with a rate hike",
        impacts: &[
            MacroImpact::InterestRate(0.005),
            MacroImpact::Sentiment(-0.15),
        ],
    },
    EventTemplate {
        category: EventCategory::MonetaryPolicy,
        severity: EventSeverity::Minor,
        headline: "Dovish minutes lift risk appetite",
        impacts: &[MacroImpact::Sentiment(0.10)],
    },
    EventTemplate {
        category: EventCategory::Geopolitics,
        severity: EventSeverity::Major,
        headline: "Trade corridor blockade rattles markets",
        impacts: &[
            MacroImpact::Sentiment(-0.30),
            MacroImpact::Volatility(0.40),
        ],
    },
    EventTemplate {
        category: EventCategory::Technology,
        severity: EventSeverity::Moderate,
        headline: "Breakthrough chip launch sparks tech rally",
        impacts: &[
            MacroImpact::SectorPerformance(Sector::Tech, 0.20),
            MacroImpact::Sentiment(0.08),
        ],
    },
    EventTemplate {
        category: EventCategory::Commodity,
        severity: EventSeverity::Moderate,
        headline: "Oil supply cut sends energy surging",
        impacts: &[
            MacroImpact::SectorPerformance(Sector::Energy, 0.25),
            MacroImpact::Inflation(0.004),
        ],
    },
    EventTemplate {
        category: EventCategory::Pandemic,
        severity: EventSeverity::Major,
        headline: "Novel outbreak hits travel and retail",
        impacts: &[
            MacroImpact::SectorPerformance(Sector::Consumer, -0.25),
            MacroImpact::SectorPerformance(Sector::Healthcare, 0.15),
        ],
    },
    EventTemplate {
        category: EventCategory::Regulation,
        severity: EventSeverity::Minor,
        headline: "Regulator opens probe into bank fees",
        impacts: &[MacroImpact::SectorPerformance(Sector::Finance, -0.10)],
    },
    EventTemplate {
        category: EventCategory::Regulation,
        severity: EventSeverity::Moderate,
        headline: "Industrial stimulus package announced",
        impacts: &[
            MacroImpact::SectorPerformance(Sector::Industrial, 0.18),
            MacroImpact::Growth(0.006),
        ],
    },
];

/// Owns the running macro condition and the set of in-flight events.
///
/// Invariant: every impact applied by a spawned event is subtracted exactly
/// when that event expires, so the condition never drifts permanently.
#[derive(Debug)]
pub struct MacroModel {
    condition: MacroCondition,
    active: Vec<MacroEvent>,
}

impl Default for MacroModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroModel {
    pub fn new() -> Self {
        Self {
            condition: MacroCondition::default(),
            active: Vec::new(),
        }
    }

    pub fn condition(&self) -> &MacroCondition {
        &self.condition
    }

    pub fn active_events(&self) -> &[MacroEvent] {
        &self.active
    }

    /// Sentiment plus active sector offsets, the price-engine input.
    pub fn sector_impact(&self, sector: Sector) -> f64 {
        self.condition.sector_impact(sector)
    }

    /// Independent per-tick draw; at most one event spawns per call.
    pub fn maybe_spawn<R: Rng>(
        &mut self,
        rng: &mut R,
        settings: &GameSettings,
        now: DateTime<Utc>,
    ) -> Option<MacroEvent> {
        if !rng.gen_bool(SPAWN_PROBABILITY) {
            return None;
        }

        let template = &CATALOG[rng.gen_range(0..CATALOG.len())];
        let impacts: Vec<MacroImpact> = template
            .impacts
            .iter()
            .map(|impact| scale_impact(*impact, 1.0 + rng.gen_range(-JITTER..JITTER)))
            .collect();

        let event = MacroEvent {
            id: Uuid::new_v4(),
            category: template.category,
            severity: template.severity,
            headline: template.headline.to_string(),
            started_at: now,
            duration_ms: settings.sim_hours_to_ms(template.severity.duration_hours()),
            impacts,
        };

        self.apply(event.clone());
        info!(
            "macro event: {} ({:?}/{:?}, {}ms)",
            event.headline, event.category, event.severity, event.duration_ms
        );
        Some(event)
    }

    /// Fold an event's impacts into the running condition.
    pub fn apply(&mut self, event: MacroEvent) {
        for impact in &event.impacts {
            impact.apply(&mut self.condition);
        }
        self.active.push(event);
    }

    /// Revert and discard every expired event. Call once per tick.
    pub fn update(&mut self, now: DateTime<Utc>) -> Vec<MacroEvent> {
        let mut expired = Vec::new();
        let mut i = 0;
        while i < self.active.len() {
            if self.active[i].is_expired(now) {
                let event = self.active.swap_remove(i);
                for impact in &event.impacts {
                    impact.revert(&mut self.condition);
                }
                debug!("macro event expired: {}", event.headline);
                expired.push(event);
            } else {
                i += 1;
            }
        }
        expired
    }
}

/// Scale every numeric field of an impact by `factor`.
fn scale_impact(impact: MacroImpact, factor: f64) -> MacroImpact {
    match impact {
        MacroImpact::Sentiment(v) => MacroImpact::Sentiment(v * factor),
        MacroImpact::SectorPerformance(sector, v) => {
            MacroImpact::SectorPerformance(sector, v * factor)
        }
        MacroImpact::InterestRate(v) => MacroImpact::InterestRate(v * factor),
        MacroImpact::Inflation(v) => MacroImpact::Inflation(v * factor),
        MacroImpact::Growth(v) => MacroImpact::Growth(v * factor),
        MacroImpact::Volatility(v) => MacroImpact::Volatility(v * factor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn event(duration_ms: i64, impacts: Vec<MacroImpact>, at: DateTime<Utc>) -> MacroEvent {
        MacroEvent {
            id: Uuid::new_v4(),
            category: EventCategory::Technology,
            severity: EventSeverity::Minor,
            headline: "test".to_string(),
            started_at: at,
            duration_ms,
            impacts,
        }
    }

    #[test]
    fn test_overlapping_events_revert_exactly() {
        let mut model = MacroModel::new();
        let t0 = Utc::now();
        let baseline_sentiment = model.condition().sentiment;
        let baseline_tech = model.condition().sector_performance[&Sector::Tech];

        model.apply(event(
            1_000,
            vec![
                MacroImpact::Sentiment(0.17),
                MacroImpact::SectorPerformance(Sector::Tech, 0.09),
            ],
            t0,
        ));
        model.apply(event(
            2_000,
            vec![MacroImpact::Sentiment(-0.23)],
            t0,
        ));
        model.apply(event(
            3_000,
            vec![MacroImpact::SectorPerformance(Sector::Tech, -0.04)],
            t0,
        ));

        // Expire them out of order of application
        let expired = model.update(t0 + chrono::Duration::milliseconds(1_500));
        assert_eq!(expired.len(), 1);
        let expired = model.update(t0 + chrono::Duration::milliseconds(3_500));
        assert_eq!(expired.len(), 2);

        assert_relative_eq!(
            model.condition().sentiment,
            baseline_sentiment,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            model.condition().sector_performance[&Sector::Tech],
            baseline_tech,
            epsilon = 1e-9
        );
        assert!(model.active_events().is_empty());
    }

    #[test]
    fn test_spawned_event_duration_in_severity_range() {
        let settings = GameSettings::default();
        let mut model = MacroModel::new();
        let mut rng = StdRng::seed_from_u64(3);

        // Draw until something spawns
        let mut spawned = None;
        for _ in 0..10_000 {
            if let Some(event) = model.maybe_spawn(&mut rng, &settings, Utc::now()) {
                spawned = Some(event);
                break;
            }
        }
        let event = spawned.expect("an event should spawn within 10k draws");

        let min = settings.sim_hours_to_ms(24);
        let max = settings.sim_hours_to_ms(96);
        assert!(event.duration_ms >= min && event.duration_ms <= max);
        assert!(!event.impacts.is_empty() && event.impacts.len() <= 2);
    }

    #[test]
    fn test_jitter_stays_within_20_percent() {
        let settings = GameSettings::default();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..200 {
            let mut model = MacroModel::new();
            let Some(event) = model.maybe_spawn(&mut rng, &settings, Utc::now()) else {
                continue;
            };
            // Compare each impact against its template value
            let template = CATALOG
                .iter()
                .find(|t| t.headline == event.headline)
                .unwrap();
            for (actual, templated) in event.impacts.iter().zip(template.impacts.iter()) {
                let (a, t) = (impact_value(*actual), impact_value(*templated));
                assert!(
                    (a / t - 1.0).abs() <= JITTER + 1e-9,
                    "impact {a} outside +-20% of {t}"
                );
            }
        }
    }

    fn impact_value(impact: MacroImpact) -> f64 {
        match impact {
            MacroImpact::Sentiment(v)
            | MacroImpact::SectorPerformance(_, v)
            | MacroImpact::InterestRate(v)
            | MacroImpact::Inflation(v)
            | MacroImpact::Growth(v)
            | MacroImpact::Volatility(v) => v,
        }
    }
}
