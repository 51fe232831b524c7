use log::debug;
use openbell_core::{Player, PlayerId, Stock, StockId, World};
use rand::prelude::*;
use rand_distr::LogNormal;
use rust_decimal::{Decimal, prelude::FromPrimitive};

/// Synthetic trader tier, with distinct capital scale and bias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotTier {
    Newbie,
    Pro,
    HotMoney,
    Whale,
}

impl BotTier {
    /// Roster mix: mostly retail, a few whales.
    const WEIGHTS: [(BotTier, f64); 4] = [
        (BotTier::Newbie, 0.55),
        (BotTier::Pro, 0.25),
        (BotTier::HotMoney, 0.15),
        (BotTier::Whale, 0.05),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BotTier::Newbie => "newbie",
            BotTier::Pro => "pro",
            BotTier::HotMoney => "hot_money",
            BotTier::Whale => "whale",
        }
    }
}

/// One synthetic trade feeding the order-flow aggregate
#[derive(Debug, Clone)]
pub struct BotTrade {
    pub stock_id: StockId,
    pub tier: BotTier,
    pub amount: i64,
    pub is_buy: bool,
}

/// Generates synthetic order flow per tick.
///
/// Bots do not run portfolio accounting: their only persisted state is a
/// portfolio seeded once into the world at spawn time (so leaderboards and
/// depth look populated). Per-tick trades exist solely as flow and tape
/// entries.
pub struct BotPopulation {
    count: usize,
    rng: StdRng,
}

impl BotPopulation {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded variant for reproducible simulations.
    pub fn with_seed(count: usize, seed: u64) -> Self {
        Self {
            count,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create the bot players once, each with cash and a random starter
    /// portfolio. Called at game start; never touched again.
    pub fn spawn_into(&mut self, world: &mut World) {
        let stock_ids: Vec<StockId> = world.stocks.keys().cloned().collect();
        if stock_ids.is_empty() {
            return;
        }

        for i in 0..self.count {
            let tier = self.roll_tier();
            let cash_scale: f64 = match tier {
                BotTier::Newbie => 50_000.0,
                BotTier::Pro => 200_000.0,
                BotTier::HotMoney => 1_000_000.0,
                BotTier::Whale => 10_000_000.0,
            };
            let cash = cash_scale * self.rng.gen_range(0.5..1.5);

            let id = PlayerId::new(format!("bot-{i}"));
            let mut bot = Player::new(
                id.clone(),
                format!("{} #{i}", tier.as_str()),
                Decimal::from_f64(cash).unwrap_or_default().round_dp(2),
            );
            bot.is_bot = true;

            // Starter holdings in 1-3 random stocks
            for _ in 0..self.rng.gen_range(1..=3) {
                let stock_id = stock_ids[self.rng.gen_range(0..stock_ids.len())].clone();
                let qty = (self.trade_size(tier) / 2).max(100);
                let price = world.stocks[&stock_id].price;
                bot.credit_shares(&stock_id, qty, price);
            }

            world.players.insert(id, bot);
        }
        debug!("seeded {} bots", self.count);
    }

    /// Roll this tick's synthetic trades for every stock.
    pub fn generate(&mut self, stocks: &[&Stock]) -> Vec<BotTrade> {
        let mut trades = Vec::new();

        for stock in stocks {
            // Volatile names attract more flow
            let activity = (0.3 + stock.volatility * 10.0).clamp(0.1, 0.9);
            if !self.rng.gen_bool(activity) {
                continue;
            }

            for _ in 0..self.rng.gen_range(1..=3) {
                let tier = self.roll_tier();
                let amount = self.trade_size(tier);
                let is_buy = self.rng.gen_bool(self.buy_probability(tier, stock));

                trades.push(BotTrade {
                    stock_id: stock.id.clone(),
                    tier,
                    amount,
                    is_buy,
                });
            }
        }

        trades
    }

    fn roll_tier(&mut self) -> BotTier {
        let roll: f64 = self.rng.r#gen();
        let mut acc = 0.0;
        for (tier, weight) in BotTier::WEIGHTS {
            acc += weight;
            if roll < acc {
                return tier;
            }
        }
        BotTier::Whale
    }

    /// Tier-specific share size; whales draw from a heavy-tailed
    /// log-normal.
    fn trade_size(&mut self, tier: BotTier) -> i64 {
        match tier {
            BotTier::Newbie => self.rng.gen_range(1..=10) * 100,
            BotTier::Pro => self.rng.gen_range(5..=50) * 100,
            BotTier::HotMoney => self.rng.gen_range(20..=200) * 100,
            BotTier::Whale => {
                let dist = LogNormal::new(10.0, 0.5).expect("valid log-normal params");
                let raw: f64 = self.rng.sample(dist);
                ((raw / 100.0).round() as i64).clamp(100, 2_000) * 100
            }
        }
    }

    /// Momentum/FOMO-biased direction. Newbies herd hardest into rising
    /// prices; pros lean contrarian; hot money chases short momentum.
    fn buy_probability(&self, tier: BotTier, stock: &Stock) -> f64 {
        let base = 0.5;
        let bias = match tier {
            BotTier::Newbie => (stock.trend * 25.0).clamp(-0.30, 0.30),
            BotTier::Pro => (-stock.trend * 8.0).clamp(-0.15, 0.15),
            BotTier::HotMoney => (stock.momentum * 15.0).clamp(-0.25, 0.25),
            BotTier::Whale => 0.0,
        };
        (base + bias).clamp(0.05, 0.95)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openbell_core::{GameSettings, Sector};
    use rust_decimal_macros::dec;

    fn stock(trend: f64) -> Stock {
        let mut s = Stock::new("s1", "OPB", "Openbell", Sector::Tech, dec!(100), 0.03, 1.0);
        s.trend = trend;
        s
    }

    #[test]
    fn test_generates_one_to_three_trades_when_active() {
        let mut bots = BotPopulation::with_seed(10, 42);
        let s = stock(0.0);

        for _ in 0..200 {
            let trades = bots.generate(&[&s]);
            assert!(trades.len() <= 3);
            for t in &trades {
                assert!(t.amount > 0);
                assert_eq!(t.stock_id, s.id);
            }
        }
    }

    #[test]
    fn test_newbies_herd_into_rising_prices() {
        let mut bots = BotPopulation::with_seed(10, 7);
        let rising = stock(0.02);

        let p_up = bots.buy_probability(BotTier::Newbie, &rising);
        let falling = stock(-0.02);
        let p_down = bots.buy_probability(BotTier::Newbie, &falling);

        assert!(p_up > 0.7, "newbie FOMO too weak: {p_up}");
        assert!(p_down < 0.3, "newbie panic too weak: {p_down}");
    }

    #[test]
    fn test_tier_sizes_ordered() {
        let mut bots = BotPopulation::with_seed(10, 99);

        let avg = |bots: &mut BotPopulation, tier| -> f64 {
            (0..500).map(|_| bots.trade_size(tier) as f64).sum::<f64>() / 500.0
        };

        let newbie = avg(&mut bots, BotTier::Newbie);
        let pro = avg(&mut bots, BotTier::Pro);
        let whale = avg(&mut bots, BotTier::Whale);

        assert!(newbie < pro && pro < whale);
    }

    #[test]
    fn test_spawn_seeds_bot_players_once() {
        let mut world = World::new(GameSettings::default());
        let s = stock(0.0);
        world.stocks.insert(s.id.clone(), s);

        let mut bots = BotPopulation::with_seed(5, 1);
        bots.spawn_into(&mut world);

        assert_eq!(world.players.len(), 5);
        for bot in world.players.values() {
            assert!(bot.is_bot);
            assert!(!bot.portfolio.is_empty());
            assert!(bot.cash > Decimal::ZERO);
        }
        // Bots are excluded from the human view used by replication
        assert_eq!(world.humans().count(), 0);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let s = stock(0.01);
        let mut a = BotPopulation::with_seed(10, 1234);
        let mut b = BotPopulation::with_seed(10, 1234);

        for _ in 0..50 {
            let ta = a.generate(&[&s]);
            let tb = b.generate(&[&s]);
            assert_eq!(ta.len(), tb.len());
            for (x, y) in ta.iter().zip(tb.iter()) {
                assert_eq!(x.amount, y.amount);
                assert_eq!(x.is_buy, y.is_buy);
            }
        }
    }
}
