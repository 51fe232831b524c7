mod macro_event;
mod order;
mod player;
mod session;
mod settings;
mod stock;
mod world;

pub use macro_event::{EventCategory, EventSeverity, MacroCondition, MacroEvent, MacroImpact};
pub use order::{OrderId, OrderKind, PendingOrder, Side};
pub use player::{Player, PlayerId, PlayerStats, TradeRecord};
pub use session::{GamePhase, Notification, TradingSession};
pub use settings::{GameSettings, LoanProvider};
pub use stock::{PricePoint, Sector, Stock, StockId, StockTransaction};
pub use world::World;
