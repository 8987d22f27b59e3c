//! Error types for the relay runtime.

use relay_core::EndpointId;
use relay_protocol::RelayError;

/// Errors that can occur while configuring or running chains.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unknown peer: {0}")]
    UnknownPeer(EndpointId),
    #[error("{chain} is already connected to {peer}")]
    AlreadyConnected { chain: EndpointId, peer: EndpointId },
    #[error("link to {0} is closed")]
    LinkClosed(EndpointId),
    #[error("inbox of {0} is full")]
    LinkFull(EndpointId),
    #[error("relay error: {0}")]
    Relay(#[from] RelayError),
    #[error("chain task failed: {0}")]
    Task(String),
}
