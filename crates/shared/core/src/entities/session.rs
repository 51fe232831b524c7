use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PlayerId;

/// Top-level room phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Lobby,
    Opening,
    Trading,
    Ended,
}

/// Intraday session while the phase is `Trading`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingSession {
    Morning,
    Break,
    Afternoon,
    DayEnd,
}

impl TradingSession {
    /// Whether the market ticks during this session.
    pub fn is_open(&self) -> bool {
        matches!(self, TradingSession::Morning | TradingSession::Afternoon)
    }
}

/// A short message surfaced to players (fills, triggers, macro headlines).
/// `player_id = None` addresses the whole room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub player_id: Option<PlayerId>,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn broadcast(text: impl Into<String>) -> Self {
        Self {
            player_id: None,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn private(player_id: PlayerId, text: impl Into<String>) -> Self {
        Self {
            player_id: Some(player_id),
            text: text.into(),
            at: Utc::now(),
        }
    }
}
