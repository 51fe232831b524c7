use rust_decimal::Decimal;
use thiserror::Error;

/// Submission-time validation failures and contended cancels.
///
/// Business-as-usual non-events (a resting order whose trigger has not been
/// reached) are not errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("Price must be positive, got {0}")]
    InvalidPrice(Decimal),

    #[error("Insufficient cash: need {needed}, have {available}")]
    InsufficientCash { needed: Decimal, available: Decimal },

    #[error("Insufficient shares: need {needed}, have {available}")]
    InsufficientShares { needed: i64, available: i64 },

    #[error("Stock not found: {0}")]
    StockNotFound(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),
}

pub type Result<T> = std::result::Result<T, OrderError>;
