//! Openbell Matching Engine
//!
//! Owns every player's pending orders and executes them against the latest
//! tick price. There is no order book crossing between players: the host
//! price is the counterparty, which is what makes the classroom market fair
//! to read and cheap to run.
//!
//! Execution rules:
//! - Market orders fill immediately at the tick price, no reservation.
//! - Limit/iceberg orders fill immediately when already crossable,
//!   otherwise rest with a worst-case cash (buy) or share (sell)
//!   reservation.
//! - Stop-loss / stop-profit / trailing-stop are sell-side protective
//!   orders triggered by the tick price crossing their trigger.
//! - Simultaneous triggers in one tick execute FIFO by submission time;
//!   re-evaluating the same tick never executes an order twice.

mod engine;
mod error;

pub use engine::{FillReport, MatchingEngine, OrderSpec, SubmitOutcome};
pub use error::{OrderError, Result};
