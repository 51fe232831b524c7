//! Error types for the protocol crate

use thiserror::Error;

/// Transport-level errors.
///
/// Replication is at-most-once: callers log these and let the next
/// periodic snapshot heal any gap.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Send failed: {0}")]
    Send(String),

    #[error("Subscription failed: {0}")]
    Subscribe(String),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Message-level errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Decoding failed: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Decode(e.to_string())
    }
}
