//! Openbell Client
//!
//! Pure mirror of the host's replicated state, plus helpers to send
//! intents. No simulation runs here.

pub mod error;
pub mod session;

pub use error::{ClientError, Result};
pub use session::RoomClient;
