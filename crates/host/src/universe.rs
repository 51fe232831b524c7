//! Stock universe generation
//!
//! Fictional companies with hand-tuned volatility and beta per sector.
//! Opening prices are randomized per room so no two games start alike.

use openbell_core::{Sector, Stock};
use rand::Rng;
use rust_decimal::{Decimal, prelude::FromPrimitive};

/// symbol, name, sector, volatility, beta
const COMPANIES: &[(&str, &str, Sector, f64, f64)] = &[
    ("NOVA", "Nova Semiconductors", Sector::Tech, 0.030, 1.4),
    ("ORBT", "Orbit Cloudworks", Sector::Tech, 0.026, 1.3),
    ("MERD", "Meridian Bancorp", Sector::Finance, 0.014, 0.9),
    ("ATLS", "Atlas Mutual Holdings", Sector::Finance, 0.012, 0.8),
    ("HELI", "Helios Drilling", Sector::Energy, 0.024, 1.1),
    ("VOLT", "Voltaic Grid Systems", Sector::Energy, 0.020, 1.0),
    ("CRSP", "Crispbread Foods", Sector::Consumer, 0.010, 0.6),
    ("LUMN", "Lumen Retail Group", Sector::Consumer, 0.016, 0.9),
    ("VITA", "Vitalis Biolabs", Sector::Healthcare, 0.028, 1.2),
    ("CURA", "Curant Medical", Sector::Healthcare, 0.015, 0.7),
    ("FORG", "Forgeline Heavy Industries", Sector::Industrial, 0.018, 1.0),
    ("KEEL", "Keelworth Shipyards", Sector::Industrial, 0.022, 1.1),
];

/// Build the initial stock set for a room.
pub fn generate<R: Rng>(count: usize, rng: &mut R) -> Vec<Stock> {
    COMPANIES
        .iter()
        .take(count.min(COMPANIES.len()))
        .map(|(symbol, name, sector, volatility, beta)| {
            let price = Decimal::from_f64(rng.gen_range(20.0..150.0))
                .unwrap_or(Decimal::from(50))
                .round_dp(2);
            Stock::new(
                symbol.to_lowercase(),
                *symbol,
                *name,
                *sector,
                price,
                *volatility,
                *beta,
            )
        })
        .collect()
}
