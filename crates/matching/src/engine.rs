use chrono::Utc;
use log::{debug, warn};
use openbell_core::{
    Cash, Notification, OrderId, OrderKind, PendingOrder, PlayerId, Price, Side, StockId,
    TradeRecord, World,
};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::error::{OrderError, Result};

/// Order parameters as submitted by a player
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderSpec {
    /// Execute now at the tick price
    Market,
    Limit {
        limit: Price,
    },
    StopLoss {
        trigger: Price,
    },
    StopProfit {
        trigger: Price,
    },
    /// Trigger follows the highest price seen since submission;
    /// `percent` is a whole-number percentage (5 = 5%)
    TrailingStop {
        percent: Decimal,
    },
    Iceberg {
        limit: Price,
        chunk: i64,
    },
}

/// One executed fill
#[derive(Debug, Clone)]
pub struct FillReport {
    pub player_id: PlayerId,
    pub order_id: OrderId,
    pub stock_id: StockId,
    pub side: Side,
    pub price: Price,
    pub amount: i64,
    pub fee: Cash,
    /// price * amount, before fees
    pub notional: Cash,
}

/// Result of a submission: any immediate fills plus whether an order rests
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub order_id: OrderId,
    pub queued: bool,
    pub fills: Vec<FillReport>,
}

/// Executes orders against the latest tick price and keeps player
/// accounts consistent by construction (reserve at submission, refund on
/// cancel, consume pro-rata on fills).
#[derive(Debug, Default)]
pub struct MatchingEngine;

impl MatchingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Validate, reserve and (when already crossable) immediately execute
    /// a new order.
    pub fn submit(
        &mut self,
        world: &mut World,
        player_id: &PlayerId,
        stock_id: &StockId,
        side: Side,
        spec: OrderSpec,
        amount: i64,
    ) -> Result<SubmitOutcome> {
        if amount <= 0 {
            return Err(OrderError::InvalidAmount(amount));
        }
        let tick_price = world
            .stocks
            .get(stock_id)
            .ok_or_else(|| OrderError::StockNotFound(stock_id.to_string()))?
            .price;
        if !world.players.contains_key(player_id) {
            return Err(OrderError::PlayerNotFound(player_id.to_string()));
        }

        match spec {
            OrderSpec::Market => {
                let fill = match side {
                    Side::Buy => {
                        self.execute_buy(world, player_id, Uuid::new_v4(), stock_id, tick_price, amount, None)?
                    }
                    Side::Sell => self.execute_sell(
                        world, player_id, Uuid::new_v4(), stock_id, tick_price, amount, false,
                    )?,
                };
                Ok(SubmitOutcome {
                    order_id: fill.order_id,
                    queued: false,
                    fills: vec![fill],
                })
            }

            OrderSpec::Limit { limit } => {
                require_positive_price(limit)?;
                let crossable = match side {
                    Side::Buy => tick_price <= limit,
                    Side::Sell => tick_price >= limit,
                };
                if crossable {
                    let fill = match side {
                        Side::Buy => self.execute_buy(
                            world, player_id, Uuid::new_v4(), stock_id, tick_price, amount, None,
                        )?,
                        Side::Sell => self.execute_sell(
                            world, player_id, Uuid::new_v4(), stock_id, tick_price, amount, false,
                        )?,
                    };
                    return Ok(SubmitOutcome {
                        order_id: fill.order_id,
                        queued: false,
                        fills: vec![fill],
                    });
                }
                let order_id = self.queue_order(
                    world,
                    player_id,
                    stock_id,
                    side,
                    OrderKind::Limit { limit },
                    amount,
                    amount,
                )?;
                Ok(SubmitOutcome {
                    order_id,
                    queued: true,
                    fills: Vec::new(),
                })
            }

            OrderSpec::StopLoss { trigger } => {
                require_positive_price(trigger)?;
                require_sell(side, "stop-loss")?;
                let order_id = self.queue_order(
                    world,
                    player_id,
                    stock_id,
                    side,
                    OrderKind::StopLoss { trigger },
                    amount,
                    amount,
                )?;
                Ok(SubmitOutcome {
                    order_id,
                    queued: true,
                    fills: Vec::new(),
                })
            }

            OrderSpec::StopProfit { trigger } => {
                require_positive_price(trigger)?;
                require_sell(side, "stop-profit")?;
                let order_id = self.queue_order(
                    world,
                    player_id,
                    stock_id,
                    side,
                    OrderKind::StopProfit { trigger },
                    amount,
                    amount,
                )?;
                Ok(SubmitOutcome {
                    order_id,
                    queued: true,
                    fills: Vec::new(),
                })
            }

            OrderSpec::TrailingStop { percent } => {
                require_sell(side, "trailing-stop")?;
                if percent <= Decimal::ZERO || percent >= Decimal::from(100) {
                    return Err(OrderError::InvalidOrder(format!(
                        "trailing percent out of range: {percent}"
                    )));
                }
                let trigger =
                    (tick_price * (Decimal::ONE - percent / Decimal::from(100))).round_dp(2);
                let order_id = self.queue_order(
                    world,
                    player_id,
                    stock_id,
                    side,
                    OrderKind::TrailingStop { percent, trigger },
                    amount,
                    amount,
                )?;
                Ok(SubmitOutcome {
                    order_id,
                    queued: true,
                    fills: Vec::new(),
                })
            }

            OrderSpec::Iceberg { limit, chunk } => {
                require_positive_price(limit)?;
                if chunk <= 0 || chunk > amount {
                    return Err(OrderError::InvalidOrder(format!(
                        "iceberg chunk {chunk} out of range for amount {amount}"
                    )));
                }
                let crossable = match side {
                    Side::Buy => tick_price <= limit,
                    Side::Sell => tick_price >= limit,
                };
                if !crossable {
                    let order_id = self.queue_order(
                        world,
                        player_id,
                        stock_id,
                        side,
                        OrderKind::Iceberg { limit, chunk },
                        amount,
                        amount,
                    )?;
                    return Ok(SubmitOutcome {
                        order_id,
                        queued: true,
                        fills: Vec::new(),
                    });
                }

                // Immediately executable: reveal one chunk now, rest the
                // remainder as a pending order of the same kind
                let first = chunk.min(amount);
                let remainder = amount - first;
                let fill = match side {
                    Side::Buy => self.execute_buy(
                        world, player_id, Uuid::new_v4(), stock_id, tick_price, first, None,
                    )?,
                    Side::Sell => self.execute_sell(
                        world, player_id, Uuid::new_v4(), stock_id, tick_price, first, false,
                    )?,
                };
                if remainder == 0 {
                    return Ok(SubmitOutcome {
                        order_id: fill.order_id,
                        queued: false,
                        fills: vec![fill],
                    });
                }
                let order_id = self.queue_order(
                    world,
                    player_id,
                    stock_id,
                    side,
                    OrderKind::Iceberg { limit, chunk },
                    amount,
                    remainder,
                )?;
                Ok(SubmitOutcome {
                    order_id,
                    queued: true,
                    fills: vec![fill],
                })
            }
        }
    }

    /// Re-evaluate every pending order on a stock against its new tick
    /// price. Idempotent per tick: an order fills at most once per
    /// `tick_seq` even if called again.
    pub fn on_tick(
        &mut self,
        world: &mut World,
        stock_id: &StockId,
        tick_seq: u64,
    ) -> Vec<FillReport> {
        let Some(stock) = world.stocks.get(stock_id) else {
            return Vec::new();
        };
        let price = stock.price;
        let symbol = stock.symbol.clone();

        // Ratchet trailing-stop triggers up on new highs
        for player in world.players.values_mut() {
            for order in player
                .pending_orders
                .iter_mut()
                .filter(|o| &o.stock_id == stock_id)
            {
                if let OrderKind::TrailingStop { percent, trigger } = &mut order.kind {
                    let candidate =
                        (price * (Decimal::ONE - *percent / Decimal::from(100))).round_dp(2);
                    if candidate > *trigger {
                        *trigger = candidate;
                    }
                }
            }
        }

        // Deterministic rule for simultaneous triggers: FIFO by submission
        // time (order id as tiebreak), across all players
        let mut candidates: Vec<(chrono::DateTime<Utc>, PlayerId, OrderId)> = world
            .players
            .iter()
            .flat_map(|(player_id, player)| {
                player
                    .pending_orders
                    .iter()
                    .filter(|o| &o.stock_id == stock_id && o.last_fill_tick != Some(tick_seq))
                    .map(|o| (o.created_at, player_id.clone(), o.id))
                    .collect::<Vec<_>>()
            })
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0).then(a.2.cmp(&b.2)));

        let mut fills = Vec::new();
        for (_, player_id, order_id) in candidates {
            match self.try_trigger(world, &player_id, order_id, stock_id, price, tick_seq) {
                Some(fill) => {
                    world.notify(Notification::private(
                        player_id.clone(),
                        format!(
                            "{} {} x{} filled @ {}",
                            fill.side.as_str(),
                            symbol,
                            fill.amount,
                            fill.price
                        ),
                    ));
                    fills.push(fill);
                }
                None => continue,
            }
        }
        fills
    }

    /// Cancel a pending order, refunding its remaining reservation.
    ///
    /// Reports `OrderNotFound` if the order already executed; execution
    /// wins cancel races.
    pub fn cancel(
        &mut self,
        world: &mut World,
        player_id: &PlayerId,
        order_id: OrderId,
    ) -> Result<()> {
        let player = world
            .players
            .get_mut(player_id)
            .ok_or_else(|| OrderError::PlayerNotFound(player_id.to_string()))?;

        let idx = player
            .pending_orders
            .iter()
            .position(|o| o.id == order_id)
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        let order = player.pending_orders.remove(idx);

        match order.side {
            Side::Buy => {
                player.cash += order.reserved_for(order.remaining_amount);
            }
            Side::Sell => {
                player.restore_shares(&order.stock_id, order.remaining_amount);
            }
        }
        debug!("cancelled order {} for {}", order_id, player_id);
        Ok(())
    }

    /// Reserve and queue a pending order. `remaining` differs from
    /// `amount` only for an iceberg whose first chunk filled at submission.
    #[allow(clippy::too_many_arguments)]
    fn queue_order(
        &mut self,
        world: &mut World,
        player_id: &PlayerId,
        stock_id: &StockId,
        side: Side,
        kind: OrderKind,
        amount: i64,
        remaining: i64,
    ) -> Result<OrderId> {
        let fee_rate = world.settings.transaction_fee_rate;
        let player = world
            .players
            .get_mut(player_id)
            .ok_or_else(|| OrderError::PlayerNotFound(player_id.to_string()))?;

        let reserved_cash = match side {
            Side::Buy => {
                // Worst-case cost including the buy-side fee. Reservations
                // round up and fees round down, so a pro-rata slice always
                // covers its fill.
                let worst = kind
                    .worst_case_price()
                    .expect("queued orders always carry a price");
                let needed = (worst * Decimal::from(remaining) * (Decimal::ONE + fee_rate))
                    .round_dp_with_strategy(2, RoundingStrategy::AwayFromZero);
                if player.cash < needed {
                    return Err(OrderError::InsufficientCash {
                        needed,
                        available: player.cash,
                    });
                }
                player.cash -= needed;
                Some(needed)
            }
            Side::Sell => {
                let held = player.holding(stock_id);
                if held < remaining {
                    return Err(OrderError::InsufficientShares {
                        needed: remaining,
                        available: held,
                    });
                }
                player.remove_shares(stock_id, remaining);
                None
            }
        };

        let mut order = PendingOrder::new(
            stock_id.clone(),
            side,
            kind,
            amount,
            reserved_cash,
            Utc::now(),
        );
        order.remaining_amount = remaining;
        let order_id = order.id;
        player.pending_orders.push(order);
        debug!(
            "queued {} {} x{} for {} ({})",
            side.as_str(),
            stock_id,
            remaining,
            player_id,
            order_id
        );
        Ok(order_id)
    }

    /// Evaluate one pending order against the tick price, executing it if
    /// its trigger condition is met. Returns the fill, if any.
    fn try_trigger(
        &mut self,
        world: &mut World,
        player_id: &PlayerId,
        order_id: OrderId,
        stock_id: &StockId,
        price: Price,
        tick_seq: u64,
    ) -> Option<FillReport> {
        let player = world.players.get(player_id)?;
        let order = player.find_order(order_id)?;
        let (side, kind, remaining) = (order.side, order.kind, order.remaining_amount);

        // (execution price, fill amount) when triggered
        let plan: Option<(Price, i64)> = match kind {
            OrderKind::Limit { limit } => match side {
                Side::Buy if price <= limit => Some((price, remaining)),
                Side::Sell if price >= limit => Some((price, remaining)),
                _ => None,
            },
            // Stops execute at the more conservative of tick and trigger
            OrderKind::StopLoss { trigger } if price <= trigger => {
                Some((price.min(trigger), remaining))
            }
            OrderKind::StopProfit { trigger } if price >= trigger => {
                Some((price.min(trigger), remaining))
            }
            OrderKind::TrailingStop { trigger, .. } if price <= trigger => {
                Some((price.min(trigger), remaining))
            }
            OrderKind::Iceberg { limit, chunk } => match side {
                Side::Buy if price <= limit => Some((price, chunk.min(remaining))),
                Side::Sell if price >= limit => Some((price, chunk.min(remaining))),
                _ => None,
            },
            _ => None,
        };
        let (exec_price, fill_amount) = plan?;

        // Pro-rata reservation slice; the final fill consumes the whole
        // residual, including any rounding surplus
        let reserved_portion = world
            .players
            .get(player_id)?
            .find_order(order_id)?
            .reserved_for(fill_amount);

        // Execute before touching order state: a failed fill must leave the
        // order and its reservation intact for a later tick
        let fill = match side {
            Side::Buy => self.execute_buy(
                world,
                player_id,
                order_id,
                stock_id,
                exec_price,
                fill_amount,
                Some(reserved_portion),
            ),
            Side::Sell => {
                self.execute_sell(world, player_id, order_id, stock_id, exec_price, fill_amount, true)
            }
        };
        let fill = match fill {
            Ok(fill) => fill,
            Err(e) => {
                warn!("pending order {} could not fill: {}", order_id, e);
                return None;
            }
        };

        let player = world.players.get_mut(player_id)?;
        if let Some(order) = player.pending_orders.iter_mut().find(|o| o.id == order_id) {
            if let Some(reserved) = order.reserved_cash.as_mut() {
                *reserved -= reserved_portion;
            }
            order.remaining_amount -= fill_amount;
            order.last_fill_tick = Some(tick_seq);
            if order.is_filled() {
                player.pending_orders.retain(|o| o.id != order_id);
            }
        }
        Some(fill)
    }

    /// Debit cash, credit shares at weighted-average cost, book the trade.
    ///
    /// `refund` is the reservation being consumed (pending orders); market
    /// and immediately-crossed orders validate cash directly.
    #[allow(clippy::too_many_arguments)]
    fn execute_buy(
        &mut self,
        world: &mut World,
        player_id: &PlayerId,
        order_id: OrderId,
        stock_id: &StockId,
        price: Price,
        amount: i64,
        refund: Option<Cash>,
    ) -> Result<FillReport> {
        let fee_rate = world.settings.transaction_fee_rate;
        let notional = price * Decimal::from(amount);
        // Buy fees round toward zero, the counterpart of the rounded-up
        // reservation
        let fee = (notional * fee_rate).round_dp_with_strategy(2, RoundingStrategy::ToZero);
        let total = notional + fee;
        let prices = world.price_table();

        {
            let player = world
                .players
                .get_mut(player_id)
                .ok_or_else(|| OrderError::PlayerNotFound(player_id.to_string()))?;

            if let Some(refund) = refund {
                player.cash += refund;
            }
            if player.cash < total {
                // Roll the refund back so a failed validation mutates nothing
                if let Some(refund) = refund {
                    player.cash -= refund;
                }
                return Err(OrderError::InsufficientCash {
                    needed: total,
                    available: player.cash,
                });
            }
            player.cash -= total;
            player.credit_shares(stock_id, amount, price);
            player.trade_history.push(TradeRecord {
                order_id,
                stock_id: stock_id.clone(),
                side: Side::Buy,
                price,
                amount,
                fee,
                time: Utc::now(),
            });
            player.stats.trade_count += 1;
            let total_assets = player.total_assets(&prices);
            player.stats.observe_value(total_assets);
        }

        if let Some(stock) = world.stocks.get_mut(stock_id) {
            stock.record_trade(Utc::now(), price, amount, true);
        }

        Ok(FillReport {
            player_id: player_id.clone(),
            order_id,
            stock_id: stock_id.clone(),
            side: Side::Buy,
            price,
            amount,
            fee,
            notional,
        })
    }

    /// Credit proceeds net of fee and stamp tax, remove shares, book the
    /// trade. `shares_reserved` marks fills of resting sell orders whose
    /// shares already left the portfolio at submission.
    #[allow(clippy::too_many_arguments)]
    fn execute_sell(
        &mut self,
        world: &mut World,
        player_id: &PlayerId,
        order_id: OrderId,
        stock_id: &StockId,
        price: Price,
        amount: i64,
        shares_reserved: bool,
    ) -> Result<FillReport> {
        let sell_rate = world.settings.transaction_fee_rate + world.settings.stamp_tax_rate;
        let notional = price * Decimal::from(amount);
        let fee = (notional * sell_rate).round_dp(2);
        let prices = world.price_table();

        {
            let player = world
                .players
                .get_mut(player_id)
                .ok_or_else(|| OrderError::PlayerNotFound(player_id.to_string()))?;

            if !shares_reserved {
                let held = player.holding(stock_id);
                if held < amount {
                    return Err(OrderError::InsufficientShares {
                        needed: amount,
                        available: held,
                    });
                }
                player.remove_shares(stock_id, amount);
            }
            player.cash += notional - fee;
            player.cleanup_cost_basis(stock_id);
            player.trade_history.push(TradeRecord {
                order_id,
                stock_id: stock_id.clone(),
                side: Side::Sell,
                price,
                amount,
                fee,
                time: Utc::now(),
            });
            player.stats.trade_count += 1;
            let total_assets = player.total_assets(&prices);
            player.stats.observe_value(total_assets);
        }

        if let Some(stock) = world.stocks.get_mut(stock_id) {
            stock.record_trade(Utc::now(), price, amount, false);
        }

        Ok(FillReport {
            player_id: player_id.clone(),
            order_id,
            stock_id: stock_id.clone(),
            side: Side::Sell,
            price,
            amount,
            fee,
            notional,
        })
    }
}

fn require_positive_price(price: Price) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(OrderError::InvalidPrice(price));
    }
    Ok(())
}

fn require_sell(side: Side, kind: &str) -> Result<()> {
    if side != Side::Sell {
        return Err(OrderError::InvalidOrder(format!("{kind} orders must sell")));
    }
    Ok(())
}
