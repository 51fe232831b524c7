//! Client-side world mirror
//!
//! `ClientWorld` is a pure projection: it never simulates, it only applies
//! snapshots from the host. Two rules keep it consistent under loss and
//! reordering: ticks apply at most once and never backwards (seq guard),
//! and locally-submitted orders stay provisional until an authoritative
//! snapshot confirms them or a full interval passes without confirmation.

use std::collections::HashMap;

use log::debug;
use openbell_core::{
    GamePhase, GameSettings, Notification, OrderId, PendingOrder, PlayerId, StockId,
    TradingSession,
};
use rust_decimal::Decimal;

use crate::messages::NetworkMessage;
use crate::snapshot::{PlayerView, StockQuote};

/// A pending order as the client sees it.
#[derive(Debug, Clone)]
pub enum PendingEntry {
    /// Submitted locally, not yet seen in an authoritative snapshot.
    /// `seen_seq` is the latest tick applied when it was created.
    Provisional { order: PendingOrder, seen_seq: u64 },
    /// Present in the latest authoritative snapshot.
    Confirmed(PendingOrder),
}

impl PendingEntry {
    pub fn order(&self) -> &PendingOrder {
        match self {
            PendingEntry::Provisional { order, .. } => order,
            PendingEntry::Confirmed(order) => order,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, PendingEntry::Confirmed(_))
    }
}

/// Replicated room state for one player.
#[derive(Debug)]
pub struct ClientWorld {
    pub player_id: PlayerId,
    /// Highest tick sequence applied so far
    pub seq: u64,
    pub day: u32,
    pub phase: GamePhase,
    pub session: TradingSession,
    pub time_left_secs: u32,
    pub market_index: Decimal,
    pub settings: Option<GameSettings>,
    pub quotes: HashMap<StockId, StockQuote>,
    /// This player's latest authoritative state
    pub me: Option<PlayerView>,
    /// Pending orders merged from snapshots and local submissions
    pub pending: Vec<PendingEntry>,
    pub notifications: Vec<Notification>,
}

impl ClientWorld {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            seq: 0,
            day: 1,
            phase: GamePhase::Lobby,
            session: TradingSession::Morning,
            time_left_secs: 0,
            market_index: Decimal::new(1000, 0),
            settings: None,
            quotes: HashMap::new(),
            me: None,
            pending: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Mirror a locally-submitted order until the host confirms it.
    pub fn add_provisional(&mut self, order: PendingOrder) {
        self.pending.push(PendingEntry::Provisional {
            order,
            seen_seq: self.seq,
        });
    }

    /// Drop a locally-cancelled order immediately; the next snapshot is
    /// authoritative either way.
    pub fn remove_pending(&mut self, order_id: OrderId) {
        self.pending.retain(|e| e.order().id != order_id);
    }

    /// Apply an inbound message. Returns false when the message was stale
    /// or not addressed to state this client mirrors.
    pub fn apply(&mut self, msg: &NetworkMessage) -> bool {
        match msg {
            NetworkMessage::SyncSetup(setup) => {
                self.phase = setup.phase;
                self.day = setup.day;
                self.settings = Some(setup.settings.clone());
                if let Some(me) = setup.players.iter().find(|p| p.id == self.player_id) {
                    self.pending = me
                        .pending_orders
                        .iter()
                        .cloned()
                        .map(PendingEntry::Confirmed)
                        .collect();
                    self.me = Some(me.clone());
                }
                true
            }
            NetworkMessage::GameStart { day } => {
                self.phase = GamePhase::Opening;
                self.day = *day;
                true
            }
            NetworkMessage::SyncTick(tick) => {
                if tick.seq <= self.seq {
                    debug!("ignoring stale tick {} (at {})", tick.seq, self.seq);
                    return false;
                }
                self.seq = tick.seq;
                self.day = tick.day;
                self.phase = tick.phase;
                self.session = tick.session;
                self.time_left_secs = tick.time_left_secs;
                self.market_index = tick.market_index;
                self.quotes = tick
                    .stocks
                    .iter()
                    .cloned()
                    .map(|q| (q.id.clone(), q))
                    .collect();
                self.notifications = tick.notifications.clone();

                if let Some(me) = tick.players.iter().find(|p| p.id == self.player_id) {
                    self.reconcile_pending(&me.pending_orders, tick.seq);
                    self.me = Some(me.clone());
                }
                true
            }
            // Join and Action flow client→host only
            _ => false,
        }
    }

    /// Authoritative orders win; a provisional entry survives only until
    /// the first tick that postdates its submission, after which silence
    /// means the host rejected (or never saw) it.
    fn reconcile_pending(&mut self, authoritative: &[PendingOrder], seq: u64) {
        let mut merged: Vec<PendingEntry> = authoritative
            .iter()
            .cloned()
            .map(PendingEntry::Confirmed)
            .collect();

        for entry in self.pending.drain(..) {
            if let PendingEntry::Provisional { order, seen_seq } = entry {
                let confirmed = merged.iter().any(|e| e.order().id == order.id);
                if !confirmed && seen_seq + 1 >= seq {
                    merged.push(PendingEntry::Provisional { order, seen_seq });
                }
            }
        }
        self.pending = merged;
    }
}
