//! Openbell Market Model
//!
//! Everything that moves prices between ticks:
//! - [`MacroModel`]: randomly spawned macro events with finite lifetimes,
//!   folded additively into a shared [`openbell_core::MacroCondition`] and
//!   reverted exactly on expiry.
//! - [`OrderFlowBook`]: the per-tick net signed notional per stock, the
//!   single price-pressure input consumed atomically each tick.
//! - [`PriceEngine`]: the bounded per-tick price recomputation with daily
//!   limit bands.
//! - [`BotPopulation`]: four tiers of synthetic traders feeding the flow
//!   book.

mod bots;
mod flow;
mod macro_model;
mod price;

pub use bots::{BotPopulation, BotTier, BotTrade};
pub use flow::OrderFlowBook;
pub use macro_model::MacroModel;
pub use price::{CompanyPulse, PriceEngine, TickOutcome};
