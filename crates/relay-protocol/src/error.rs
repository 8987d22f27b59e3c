//! Protocol error types.
//!
//! These errors cover every failure of the relay operations: receiving from
//! the inbound queue, recording a delivered payload, and applying an
//! acknowledgment. None of them is retried internally.

use relay_core::{ContentHash, EndpointId, Sequence};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("content hash collision on {hash}: stored payload differs")]
    HashCollision { hash: ContentHash },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReceiveError {
    #[error("no packet to receive")]
    EmptyQueue,

    #[error("packet sequence mismatch: expected {expected}, got {got}")]
    SequenceMismatch { expected: Sequence, got: Sequence },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AckError {
    #[error("ack addressed to {actual}, but this endpoint is {expected}")]
    ForeignAck {
        expected: EndpointId,
        actual: EndpointId,
    },

    #[error("ack for unknown sequence {0}")]
    UnknownSequence(Sequence),

    #[error("packet {0} already acknowledged")]
    AlreadyAcknowledged(Sequence),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("receive error: {0}")]
    Receive(#[from] ReceiveError),

    #[error("ack error: {0}")]
    Ack(#[from] AckError),
}
