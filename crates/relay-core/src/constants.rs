//! Protocol constants.

/// First sequence number assigned by a sender and expected by a receiver.
pub const INITIAL_SEQUENCE: u64 = 1;

/// Length in bytes of a [`crate::types::ContentHash`] (SHA-256 output).
pub const CONTENT_HASH_LEN: usize = 32;
