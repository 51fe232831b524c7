//! Openbell Session Clock
//!
//! The trading-day state machine:
//!
//! ```text
//! LOBBY -> OPENING -> MORNING -> BREAK -> AFTERNOON -> DAY_END
//!             ^                                           |
//!             +--------- next day (gapped open) ----------+
//!                                                         |
//!                                              last day -> ENDED
//! ```
//!
//! The machine is pure: the host owns the 1 Hz timer and calls
//! [`SessionClock::tick_second`] once per second. Clients never run this
//! machine; they receive the current phase and countdown via replication.

mod session;

pub use session::{ClockEvent, ReportKind, SessionClock};
