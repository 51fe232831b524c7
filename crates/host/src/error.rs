//! Error types for the host crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] openbell_protocol::ProtocolError),

    #[error("Transport error: {0}")]
    Transport(#[from] openbell_protocol::TransportError),

    #[error("Command channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, HostError>;
