//! Openbell Core Domain
//!
//! Pure domain types for the openbell market simulation.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    // Macro economy
    EventCategory,
    EventSeverity,
    GamePhase,
    // Settings
    GameSettings,
    LoanProvider,
    MacroCondition,
    MacroEvent,
    MacroImpact,
    Notification,
    // Orders
    OrderId,
    OrderKind,
    PendingOrder,
    // Players
    Player,
    PlayerId,
    PlayerStats,
    PricePoint,
    Sector,
    Side,
    // Stocks
    Stock,
    StockId,
    StockTransaction,
    TradeRecord,
    TradingSession,
    // World
    World,
};
pub use values::{Cash, Price, RingBuffer, Timestamp};
