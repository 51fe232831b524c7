//! Openbell Host
//!
//! The authoritative side of a room: owns the world, drives the session
//! clock and the market tick pipeline, executes player actions and
//! replicates state to clients.

pub mod error;
pub mod report;
pub mod room;
pub mod universe;

pub use error::{HostError, Result};
pub use report::{LogReportHook, MarketReport, ReportHook, build_report};
pub use room::{GameRoom, HostCommand, spawn_inbound_pump, spawn_timers};
