//! Error types for the client crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] openbell_protocol::ProtocolError),

    #[error("Transport error: {0}")]
    Transport(#[from] openbell_protocol::TransportError),

    #[error("Disconnected from room")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, ClientError>;
