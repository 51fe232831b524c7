//! Report generation seam
//!
//! The actual prose generator is an external collaborator; the core only
//! assembles a structured snapshot and hands it off fire-and-forget. The
//! default hook just logs.

use async_trait::async_trait;
use log::info;
use openbell_clock::ReportKind;
use openbell_core::World;
use rust_decimal::Decimal;

/// Structured market summary handed to the report collaborator.
#[derive(Debug, Clone)]
pub struct MarketReport {
    pub kind: ReportKind,
    pub day: u32,
    pub market_index: Decimal,
    /// Top movers: (symbol, change vs open in percent)
    pub movers: Vec<(String, Decimal)>,
    /// Leading humans: (name, total assets)
    pub standings: Vec<(String, Decimal)>,
}

pub fn build_report(world: &World, kind: ReportKind) -> MarketReport {
    let mut movers: Vec<(String, Decimal)> = world
        .stocks
        .values()
        .map(|s| (s.symbol.clone(), s.change_percent()))
        .collect();
    movers.sort_by(|a, b| b.1.abs().cmp(&a.1.abs()));
    movers.truncate(3);

    let prices = world.price_table();
    let mut standings: Vec<(String, Decimal)> = world
        .humans()
        .map(|p| (p.name.clone(), p.total_assets(&prices)))
        .collect();
    standings.sort_by(|a, b| b.1.cmp(&a.1));
    standings.truncate(5);

    MarketReport {
        kind,
        day: world.day,
        market_index: world.market_index,
        movers,
        standings,
    }
}

/// Consumes report snapshots. Advisory only: nothing in the simulation
/// waits on or reads back from a report.
#[async_trait]
pub trait ReportHook: Send + Sync {
    async fn publish(&self, report: MarketReport);
}

/// Default hook: write the summary to the log.
pub struct LogReportHook;

#[async_trait]
impl ReportHook for LogReportHook {
    async fn publish(&self, report: MarketReport) {
        info!(
            "{:?} report, day {}: index {}, movers {:?}, standings {:?}",
            report.kind, report.day, report.market_index, report.movers, report.standings
        );
    }
}
