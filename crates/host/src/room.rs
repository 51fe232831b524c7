//! The game room actor
//!
//! One task owns the [`World`]; everything else (interval timers, the
//! transport subscriber) only sends [`HostCommand`]s. Serializing all
//! mutation through one queue is what keeps the per-tick model consistent:
//! price computation reads the previous tick's momentum and writes the
//! next, so two timers must never interleave on the same stock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use openbell_clock::{ClockEvent, SessionClock};
use openbell_core::{
    GameSettings, Notification, Player, PlayerId, Price, Side, StockId, World,
};
use openbell_market::{BotPopulation, CompanyPulse, MacroModel, OrderFlowBook, PriceEngine};
use openbell_matching::{MatchingEngine, OrderSpec};
use openbell_protocol::{
    ActionKind, NetworkMessage, OrderRequest, Replicator, Topics, Transport,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::report::{LogReportHook, ReportHook, build_report};
use crate::universe;

/// Everything that may mutate the world arrives as one of these.
#[derive(Debug)]
pub enum HostCommand {
    /// 1-second session clock
    ClockTick,
    /// Market refresh: macro, bots, prices, pending orders
    MarketTick,
    /// Periodic snapshot publish
    Broadcast,
    /// Decoded client message from the transport
    Inbound(NetworkMessage),
    Shutdown,
}

pub struct GameRoom {
    world: World,
    clock: SessionClock,
    macro_model: MacroModel,
    price_engine: PriceEngine,
    bots: BotPopulation,
    flow: OrderFlowBook,
    matching: MatchingEngine,
    replicator: Replicator,
    report_hook: Arc<dyn ReportHook>,
    /// Game-start prices, the market-index baseline
    initial_prices: HashMap<StockId, Price>,
    rng: StdRng,
}

impl GameRoom {
    pub fn new(settings: GameSettings, transport: Arc<dyn Transport>, topics: Topics) -> Self {
        Self::with_seed(settings, transport, topics, rand::random())
    }

    /// Seeded variant for reproducible rooms.
    pub fn with_seed(
        settings: GameSettings,
        transport: Arc<dyn Transport>,
        topics: Topics,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut world = World::new(settings.clone());

        for stock in universe::generate(settings.stock_count, &mut rng) {
            world.stocks.insert(stock.id.clone(), stock);
        }
        let initial_prices = world.price_table();

        let mut bots = BotPopulation::with_seed(settings.bot_count, seed.wrapping_add(1));
        bots.spawn_into(&mut world);

        Self {
            world,
            clock: SessionClock::new(),
            macro_model: MacroModel::new(),
            price_engine: PriceEngine::new(),
            bots,
            flow: OrderFlowBook::new(),
            matching: MatchingEngine::new(),
            replicator: Replicator::new(transport, topics),
            report_hook: Arc::new(LogReportHook),
            initial_prices,
            rng,
        }
    }

    pub fn set_report_hook(&mut self, hook: Arc<dyn ReportHook>) {
        self.report_hook = hook;
    }

    /// Feed a company-decision impulse into price formation. Expired
    /// pulses are swept on the next market tick.
    pub fn register_pulse(&mut self, pulse: CompanyPulse) {
        self.price_engine.register_pulse(pulse);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Leave the lobby: announce the start and push a fresh full snapshot.
    pub async fn start_game(&mut self) {
        let events = self.clock.start(&mut self.world);
        self.dispatch_clock_events(events).await;
    }

    /// Process commands until shutdown or game end.
    pub async fn run(mut self, mut rx: mpsc::Receiver<HostCommand>) {
        while let Some(cmd) = rx.recv().await {
            if !self.handle(cmd).await {
                break;
            }
        }
        info!("room loop finished");
    }

    /// Apply one command. Returns false when the room should stop.
    pub async fn handle(&mut self, cmd: HostCommand) -> bool {
        match cmd {
            HostCommand::ClockTick => {
                let events = self.clock.tick_second(&mut self.world, &mut self.rng);
                self.dispatch_clock_events(events).await
            }
            HostCommand::MarketTick => {
                self.market_tick();
                true
            }
            HostCommand::Broadcast => {
                self.replicator.sync_tick(&self.world).await;
                true
            }
            HostCommand::Inbound(msg) => {
                self.handle_inbound(msg).await;
                true
            }
            HostCommand::Shutdown => false,
        }
    }

    async fn dispatch_clock_events(&mut self, events: Vec<ClockEvent>) -> bool {
        for event in events {
            match event {
                ClockEvent::GameStarted => {
                    self.replicator.game_start(self.world.day).await;
                    self.replicator.sync_setup_all(&self.world).await;
                    self.world
                        .notify(Notification::broadcast("The market opens shortly"));
                }
                ClockEvent::SessionChanged(session) => {
                    self.world
                        .notify(Notification::broadcast(format!("{session:?} session")));
                }
                ClockEvent::ReportDue(kind) => {
                    let report = build_report(&self.world, kind);
                    let hook = Arc::clone(&self.report_hook);
                    tokio::spawn(async move { hook.publish(report).await });
                }
                ClockEvent::DayRolled { day } => {
                    self.world
                        .notify(Notification::broadcast(format!("Day {day} opens")));
                    self.replicator.sync_setup_all(&self.world).await;
                }
                ClockEvent::GameEnded => {
                    self.announce_summary();
                    self.replicator.sync_tick(&self.world).await;
                    return false;
                }
            }
        }
        true
    }

    /// One market refresh: macro update, bot flow, price formation, pending
    /// orders. Gated on the session being open.
    fn market_tick(&mut self) {
        if !self.world.market_open() {
            return;
        }
        self.world.tick_seq += 1;
        let tick_seq = self.world.tick_seq;
        let now = Utc::now();

        self.macro_model.update(now);
        if let Some(event) = self
            .macro_model
            .maybe_spawn(&mut self.rng, &self.world.settings, now)
        {
            self.world
                .notify(Notification::broadcast(event.headline.clone()));
        }
        self.world.macro_condition = self.macro_model.condition().clone();
        self.price_engine.expire_pulses(now);

        // Synthetic flow: bots feed the aggregate and the tape, nothing else
        let stocks: Vec<&openbell_core::Stock> = self.world.stocks.values().collect();
        let trades = self.bots.generate(&stocks);
        drop(stocks);
        for trade in &trades {
            let Some(stock) = self.world.stocks.get_mut(&trade.stock_id) else {
                continue;
            };
            let price = stock.price;
            stock.record_trade(now, price, trade.amount, trade.is_buy);
            let notional = price.to_f64().unwrap_or(0.0) * trade.amount as f64;
            self.flow.record(&trade.stock_id, notional, trade.is_buy);
        }

        // Drain this tick's flow atomically, then recompute every stock and
        // re-evaluate its pending orders at the new price
        let flows = self.flow.drain();
        let settings = self.world.settings.clone();
        let condition = self.world.macro_condition.clone();
        let stock_ids: Vec<StockId> = self.world.stocks.keys().cloned().collect();

        for stock_id in &stock_ids {
            let net = flows.get(stock_id).copied().unwrap_or(0.0);
            let stock = self
                .world
                .stocks
                .get_mut(stock_id)
                .expect("stock set is fixed after creation");
            let outcome =
                self.price_engine
                    .tick_stock(stock, net, &condition, &settings, now, &mut self.rng);
            if outcome.halted_at_limit {
                debug!("{} pinned at its daily limit", stock_id);
            }

            let fills = self.matching.on_tick(&mut self.world, stock_id, tick_seq);
            for fill in &fills {
                let is_bot = self
                    .world
                    .players
                    .get(&fill.player_id)
                    .is_some_and(|p| p.is_bot);
                let weight = if is_bot {
                    1.0
                } else {
                    settings.player_impact_multiplier
                };
                self.flow.record_weighted(
                    &fill.stock_id,
                    fill.notional.to_f64().unwrap_or(0.0),
                    fill.side == Side::Buy,
                    weight,
                );
            }
        }

        self.update_market_index();
    }

    async fn handle_inbound(&mut self, msg: NetworkMessage) {
        match msg {
            NetworkMessage::Join {
                name, player_id, ..
            } => self.handle_join(name, player_id).await,
            NetworkMessage::Action { player_id, kind } => {
                self.handle_action(player_id, kind).await
            }
            // Host-originated messages looping back are ignored
            other => debug!("ignoring inbound {other:?}"),
        }
    }

    /// Create-or-reconnect: a returning player keeps their entire state and
    /// simply receives a fresh snapshot.
    async fn handle_join(&mut self, name: String, player_id: PlayerId) {
        if let Some(player) = self.world.players.get(&player_id) {
            info!("{} reconnected", player.name);
        } else {
            let cash = self.world.settings.initial_cash;
            self.world
                .players
                .insert(player_id.clone(), Player::new(player_id.clone(), &name, cash));
            self.world
                .notify(Notification::broadcast(format!("{name} joined the room")));
            info!("{} joined as {}", name, player_id);
        }
        self.replicator
            .sync_setup_private(&self.world, &player_id)
            .await;
    }

    async fn handle_action(&mut self, player_id: PlayerId, kind: ActionKind) {
        // Chat never touches accounts; everything else gets an immediate
        // private state echo instead of waiting for the periodic snapshot
        let echo = !matches!(kind, ActionKind::Chat { .. });
        let actor = player_id.clone();
        match kind {
            ActionKind::SubmitOrder {
                stock_id,
                side,
                amount,
                request,
            } => {
                let spec = order_spec(request);
                match self
                    .matching
                    .submit(&mut self.world, &player_id, &stock_id, side, spec, amount)
                {
                    Ok(outcome) => {
                        // Immediate fills press on the next tick's price,
                        // with the configured human multiplier
                        let weight = self.world.settings.player_impact_multiplier;
                        for fill in &outcome.fills {
                            self.flow.record_weighted(
                                &fill.stock_id,
                                fill.notional.to_f64().unwrap_or(0.0),
                                fill.side == Side::Buy,
                                weight,
                            );
                        }
                        if outcome.queued {
                            debug!("{} queued order {}", player_id, outcome.order_id);
                        }
                    }
                    Err(e) => {
                        warn!("order from {} rejected: {}", player_id, e);
                        self.world.notify(Notification::private(
                            player_id,
                            format!("order rejected: {e}"),
                        ));
                    }
                }
            }
            ActionKind::CancelOrder { order_id } => {
                if let Err(e) = self.matching.cancel(&mut self.world, &player_id, order_id) {
                    debug!("cancel from {} failed: {}", player_id, e);
                    self.world.notify(Notification::private(
                        player_id,
                        format!("cancel failed: {e}"),
                    ));
                }
            }
            ActionKind::TakeLoan { provider, amount } => {
                self.handle_loan(player_id, provider, amount);
            }
            ActionKind::RepayLoan { amount } => {
                if let Some(player) = self.world.players.get_mut(&player_id) {
                    let repaid = player.repay_loan(amount);
                    self.world.notify(Notification::private(
                        player_id,
                        format!("repaid {repaid}"),
                    ));
                }
            }
            ActionKind::Chat { text } => {
                let name = self
                    .world
                    .players
                    .get(&player_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| player_id.to_string());
                self.world
                    .notify(Notification::broadcast(format!("{name}: {text}")));
            }
        }
        if echo {
            self.replicator.sync_setup_private(&self.world, &actor).await;
        }
    }

    fn handle_loan(&mut self, player_id: PlayerId, provider: String, amount: Decimal) {
        let Some(offer) = self
            .world
            .settings
            .loan_providers
            .iter()
            .find(|p| p.name == provider)
            .cloned()
        else {
            self.world.notify(Notification::private(
                player_id,
                format!("unknown loan provider {provider}"),
            ));
            return;
        };
        if amount <= Decimal::ZERO || amount > offer.max_amount {
            self.world.notify(Notification::private(
                player_id,
                format!("loan amount {amount} outside {}'s limit", offer.name),
            ));
            return;
        }
        if let Some(player) = self.world.players.get_mut(&player_id) {
            player.take_loan(amount, offer.rate);
            info!("{} borrowed {} from {}", player_id, amount, offer.name);
            self.world.notify(Notification::private(
                player_id,
                format!("{} granted a {amount} loan", offer.name),
            ));
        }
    }

    fn update_market_index(&mut self) {
        let mut sum = Decimal::ZERO;
        let mut count = 0u32;
        for (stock_id, base) in &self.initial_prices {
            if base.is_zero() {
                continue;
            }
            if let Some(stock) = self.world.stocks.get(stock_id) {
                sum += stock.price / base;
                count += 1;
            }
        }
        if count > 0 {
            self.world.market_index =
                (Decimal::from(1000) * sum / Decimal::from(count)).round_dp(2);
        }
    }

    fn announce_summary(&mut self) {
        let prices = self.world.price_table();
        let mut standings: Vec<(String, Decimal)> = self
            .world
            .humans()
            .map(|p| (p.name.clone(), p.total_assets(&prices)))
            .collect();
        standings.sort_by(|a, b| b.1.cmp(&a.1));

        info!("game over after day {}", self.world.day);
        for (rank, (name, total)) in standings.iter().enumerate() {
            info!("  #{} {} with {}", rank + 1, name, total);
        }
        if let Some((winner, total)) = standings.first() {
            self.world.notify(Notification::broadcast(format!(
                "Game over. {winner} wins with {total}"
            )));
        } else {
            self.world
                .notify(Notification::broadcast("Game over"));
        }
    }
}

fn order_spec(request: OrderRequest) -> OrderSpec {
    match request {
        OrderRequest::Market => OrderSpec::Market,
        OrderRequest::Limit { limit } => OrderSpec::Limit { limit },
        OrderRequest::StopLoss { trigger } => OrderSpec::StopLoss { trigger },
        OrderRequest::StopProfit { trigger } => OrderSpec::StopProfit { trigger },
        OrderRequest::TrailingStop { percent } => OrderSpec::TrailingStop { percent },
        OrderRequest::Iceberg { limit, chunk } => OrderSpec::Iceberg { limit, chunk },
    }
}

/// Spawn the periodic timers. Each one only sends commands; the room task
/// is the single writer.
pub fn spawn_timers(
    tx: mpsc::Sender<HostCommand>,
    settings: &GameSettings,
) -> Vec<JoinHandle<()>> {
    vec![
        spawn_interval(tx.clone(), Duration::from_secs(1), || HostCommand::ClockTick),
        spawn_interval(
            tx.clone(),
            Duration::from_millis(settings.market_refresh_ms),
            || HostCommand::MarketTick,
        ),
        spawn_interval(tx, Duration::from_secs(1), || HostCommand::Broadcast),
    ]
}

fn spawn_interval<F>(tx: mpsc::Sender<HostCommand>, period: Duration, make: F) -> JoinHandle<()>
where
    F: Fn() -> HostCommand + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if tx.send(make()).await.is_err() {
                break;
            }
        }
    })
}

/// Forward decoded client messages from the transport into the command
/// queue. Subscribes before returning so no join can slip past.
pub async fn spawn_inbound_pump(
    transport: Arc<dyn Transport>,
    topics: Topics,
    tx: mpsc::Sender<HostCommand>,
) -> crate::error::Result<JoinHandle<()>> {
    let mut rx = transport.subscribe(topics.host_subscriptions()).await?;
    Ok(tokio::spawn(async move {
        while let Some((topic, bytes)) = rx.recv().await {
            match NetworkMessage::decode(&bytes) {
                Ok(msg) => {
                    if tx.send(HostCommand::Inbound(msg)).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("undecodable message on {topic}: {e}"),
            }
        }
    }))
}
