//! Openbell Replication Protocol
//!
//! Host-authoritative pub/sub replication: the host owns the world and
//! periodically publishes lossy snapshots; clients mirror them and send
//! fire-and-forget intents back. At-most-once delivery everywhere, with
//! the periodic full-ish resend making loss self-healing.

pub mod client;
pub mod error;
pub mod host;
pub mod messages;
pub mod snapshot;
pub mod topics;
pub mod transport;

pub use client::{ClientWorld, PendingEntry};
pub use error::{ProtocolError, TransportError};
pub use host::Replicator;
pub use messages::{ActionKind, NetworkMessage, OrderRequest};
pub use snapshot::{DepthLevel, PlayerView, SetupSnapshot, StockQuote, TickSnapshot};
pub use topics::{Topics, topic_matches};
pub use transport::{ChannelTransport, Transport};
