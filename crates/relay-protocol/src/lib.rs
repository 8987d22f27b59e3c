//! Packet relay protocol state machines.
//!
//! This crate implements the stateful side of the relay: per-endpoint
//! sequence counters and inbound queues, strict in-order delivery, explicit
//! acknowledgments applied to the sender's outbound ledger, the
//! content-addressed store of delivered payloads, and timeout sweeping.
//!
//! Everything here is synchronous and free of I/O. Callers drive time through
//! a [`relay_core::Clock`].

pub mod endpoint;
pub mod error;
pub mod ledger;
pub mod relay;
pub mod store;

pub use endpoint::{Delivery, Endpoint};
pub use error::{AckError, ReceiveError, RelayError, StoreError};
pub use ledger::OutboundLedger;
pub use store::{DeliveredStore, InsertOutcome};
