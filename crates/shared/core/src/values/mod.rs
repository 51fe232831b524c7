mod ring;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

pub use ring::RingBuffer;

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Cash / notional value - uses Decimal for precision
pub type Cash = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;
