use log::info;
use openbell_core::{GamePhase, TradingSession, World};
use rand::Rng;
use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

/// Which report the external generator should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportKind {
    /// Fired on MORNING -> BREAK
    MidDay,
    /// Fired on AFTERNOON -> DAY_END
    EndOfDay,
}

/// Side effects a clock transition asks the host to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockEvent {
    GameStarted,
    SessionChanged(TradingSession),
    /// Fire-and-forget signal for the report generator collaborator
    ReportDue(ReportKind),
    DayRolled {
        day: u32,
    },
    GameEnded,
}

/// The authoritative session state machine.
///
/// State itself lives in [`World`] (day, phase, session, countdown); this
/// type only encodes the transition table.
#[derive(Debug, Default)]
pub struct SessionClock;

impl SessionClock {
    pub fn new() -> Self {
        Self
    }

    /// Leave the lobby and open day 1.
    pub fn start(&self, world: &mut World) -> Vec<ClockEvent> {
        debug_assert_eq!(world.phase, GamePhase::Lobby);

        world.phase = GamePhase::Opening;
        world.day = 1;
        world.time_left_secs = world.settings.opening_secs;
        info!("game started, opening day 1");
        vec![ClockEvent::GameStarted]
    }

    /// Advance the countdown by one second, transitioning at zero.
    pub fn tick_second<R: Rng>(&self, world: &mut World, rng: &mut R) -> Vec<ClockEvent> {
        match world.phase {
            GamePhase::Lobby | GamePhase::Ended => return Vec::new(),
            GamePhase::Opening | GamePhase::Trading => {}
        }

        if world.time_left_secs > 1 {
            world.time_left_secs -= 1;
            return Vec::new();
        }
        world.time_left_secs = 0;

        match world.phase {
            GamePhase::Opening => {
                self.enter_session(world, TradingSession::Morning);
                vec![ClockEvent::SessionChanged(TradingSession::Morning)]
            }
            GamePhase::Trading => match world.session {
                TradingSession::Morning => {
                    self.enter_session(world, TradingSession::Break);
                    vec![
                        ClockEvent::SessionChanged(TradingSession::Break),
                        ClockEvent::ReportDue(ReportKind::MidDay),
                    ]
                }
                TradingSession::Break => {
                    self.enter_session(world, TradingSession::Afternoon);
                    vec![ClockEvent::SessionChanged(TradingSession::Afternoon)]
                }
                TradingSession::Afternoon => {
                    self.enter_session(world, TradingSession::DayEnd);
                    vec![
                        ClockEvent::SessionChanged(TradingSession::DayEnd),
                        ClockEvent::ReportDue(ReportKind::EndOfDay),
                    ]
                }
                TradingSession::DayEnd => self.close_day(world, rng),
            },
            GamePhase::Lobby | GamePhase::Ended => unreachable!(),
        }
    }

    fn enter_session(&self, world: &mut World, session: TradingSession) {
        world.phase = GamePhase::Trading;
        world.session = session;
        world.time_left_secs = match session {
            TradingSession::Morning => world.settings.morning_secs,
            TradingSession::Break => world.settings.break_secs,
            TradingSession::Afternoon => world.settings.afternoon_secs,
            TradingSession::DayEnd => world.settings.day_end_secs,
        };
        info!("day {} entered {:?}", world.day, session);
    }

    /// DAY_END has run out: either roll into the next day or end the game.
    fn close_day<R: Rng>(&self, world: &mut World, rng: &mut R) -> Vec<ClockEvent> {
        if world.day >= world.settings.total_days {
            world.phase = GamePhase::Ended;
            info!("final day {} closed, game over", world.day);
            return vec![ClockEvent::GameEnded];
        }

        world.day += 1;
        self.apply_overnight_gaps(world, rng);
        world.phase = GamePhase::Opening;
        world.time_left_secs = world.settings.opening_secs;
        info!("rolled into day {}", world.day);
        vec![ClockEvent::DayRolled { day: world.day }]
    }

    /// Gap every stock by a bounded random overnight move and re-anchor its
    /// limit band at the gapped open.
    fn apply_overnight_gaps<R: Rng>(&self, world: &mut World, rng: &mut R) {
        let half_band = world
            .settings
            .max_daily_fluctuation
            .to_f64()
            .unwrap_or(0.3)
            / 2.0;

        for stock in world.stocks.values_mut() {
            let gap: f64 = rng.gen_range(-half_band..=half_band);
            let old_price = stock.price.to_f64().unwrap_or(0.0);
            let gapped = (old_price * (1.0 + gap)).max(0.01);
            let gapped = Decimal::from_f64(gapped)
                .unwrap_or(stock.price)
                .round_dp(2);
            stock.begin_day(gapped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openbell_core::{GameSettings, Sector, Stock, StockId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal_macros::dec;

    fn world() -> World {
        let settings = GameSettings {
            opening_secs: 2,
            morning_secs: 3,
            break_secs: 2,
            afternoon_secs: 3,
            day_end_secs: 1,
            total_days: 2,
            ..GameSettings::default()
        };
        let mut world = World::new(settings);
        let stock = Stock::new("s1", "OPB", "Openbell", Sector::Tech, dec!(100), 0.02, 1.0);
        world.stocks.insert(stock.id.clone(), stock);
        world
    }

    fn run_until_transition(clock: &SessionClock, world: &mut World, rng: &mut StdRng) -> Vec<ClockEvent> {
        for _ in 0..10_000 {
            let events = clock.tick_second(world, rng);
            if !events.is_empty() {
                return events;
            }
        }
        panic!("no transition within bound");
    }

    #[test]
    fn test_full_session_sequence() {
        let clock = SessionClock::new();
        let mut world = world();
        let mut rng = StdRng::seed_from_u64(7);

        clock.start(&mut world);
        assert_eq!(world.phase, GamePhase::Opening);

        let events = run_until_transition(&clock, &mut world, &mut rng);
        assert_eq!(events, vec![ClockEvent::SessionChanged(TradingSession::Morning)]);
        assert_eq!(world.time_left_secs, 3);

        let events = run_until_transition(&clock, &mut world, &mut rng);
        assert_eq!(
            events,
            vec![
                ClockEvent::SessionChanged(TradingSession::Break),
                ClockEvent::ReportDue(ReportKind::MidDay),
            ]
        );

        let events = run_until_transition(&clock, &mut world, &mut rng);
        assert_eq!(events, vec![ClockEvent::SessionChanged(TradingSession::Afternoon)]);

        let events = run_until_transition(&clock, &mut world, &mut rng);
        assert_eq!(
            events,
            vec![
                ClockEvent::SessionChanged(TradingSession::DayEnd),
                ClockEvent::ReportDue(ReportKind::EndOfDay),
            ]
        );

        let events = run_until_transition(&clock, &mut world, &mut rng);
        assert_eq!(events, vec![ClockEvent::DayRolled { day: 2 }]);
        assert_eq!(world.phase, GamePhase::Opening);
    }

    #[test]
    fn test_day_roll_gaps_and_resets_stocks() {
        let clock = SessionClock::new();
        let mut world = world();
        let mut rng = StdRng::seed_from_u64(42);

        clock.start(&mut world);

        // Dirty the stock with intraday state
        {
            let stock = world.stocks.get_mut(&StockId::new("s1")).unwrap();
            stock.price = dec!(117.40);
            stock.momentum = 0.02;
            stock.total_volume = 12_345;
        }

        // Drive to the day roll
        loop {
            let events = clock.tick_second(&mut world, &mut rng);
            if events.contains(&ClockEvent::DayRolled { day: 2 }) {
                break;
            }
        }

        let stock = &world.stocks[&StockId::new("s1")];
        assert_eq!(stock.total_volume, 0);
        assert_eq!(stock.momentum, 0.0);
        // The new open is the gapped price, not yesterday's open
        assert_eq!(stock.open_price, stock.price);
        assert_ne!(stock.open_price, dec!(100));

        // Gap stays inside half the daily band
        let gap = (stock.open_price - dec!(117.40)).abs() / dec!(117.40);
        assert!(gap <= world.settings.max_daily_fluctuation / dec!(2) + dec!(0.001));
    }

    #[test]
    fn test_last_day_ends_game() {
        let clock = SessionClock::new();
        let mut world = world();
        world.settings.total_days = 1;
        let mut rng = StdRng::seed_from_u64(1);

        clock.start(&mut world);
        let mut saw_end = false;
        for _ in 0..10_000 {
            if clock
                .tick_second(&mut world, &mut rng)
                .contains(&ClockEvent::GameEnded)
            {
                saw_end = true;
                break;
            }
        }
        assert!(saw_end);
        assert_eq!(world.phase, GamePhase::Ended);

        // Terminal: further ticks do nothing
        assert!(clock.tick_second(&mut world, &mut rng).is_empty());
    }
}
