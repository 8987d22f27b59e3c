//! Core types for the cross-chain packet relay.
//!
//! This crate defines the values exchanged between two chain endpoints:
//! packets and acknowledgments, the content hash used to key delivered
//! payloads, and the clock capability every time-sensitive operation takes.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod clock;
pub mod constants;
pub mod hash;
pub mod packet;
pub mod types;

#[cfg(feature = "std")]
pub use clock::SystemClock;
pub use clock::{Clock, ManualClock};
pub use constants::{CONTENT_HASH_LEN, INITIAL_SEQUENCE};
pub use hash::content_hash;
pub use packet::{Ack, Packet};
pub use types::{ContentHash, EndpointId, InvalidLength, Sequence, Timestamp};
