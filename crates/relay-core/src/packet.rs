//! Packets and acknowledgments.
//!
//! A [`Packet`] is created by the sending endpoint and queued at the
//! destination. Its identifying fields never change after creation; only the
//! `acknowledged` flag flips, once, on the sender's own record when the
//! matching [`Ack`] comes back.

extern crate alloc;

use alloc::vec::Vec;

use crate::types::{EndpointId, Sequence, Timestamp};

/// A single ordered, timeout-bound unit of transferred payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Per-sender sequence number, assigned at send time.
    pub sequence: Sequence,
    /// Endpoint that assigned `sequence`; acknowledgments are routed here.
    pub source: EndpointId,
    /// Sender-chain height after which the packet is stale. Carried, not enforced.
    pub timeout_height: u64,
    /// Absolute deadline on the sender's clock.
    pub timeout_timestamp: Timestamp,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
    /// Set once the destination has confirmed delivery.
    pub acknowledged: bool,
}

impl Packet {
    pub fn new(
        sequence: Sequence,
        source: EndpointId,
        payload: Vec<u8>,
        timeout_height: u64,
        timeout_timestamp: Timestamp,
    ) -> Self {
        Self {
            sequence,
            source,
            timeout_height,
            timeout_timestamp,
            payload,
            acknowledged: false,
        }
    }

    /// Whether the deadline lies strictly before `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.timeout_timestamp.is_before(now)
    }

    /// The acknowledgment a receiver sends back for this packet.
    pub fn ack(&self) -> Ack {
        Ack {
            sequence: self.sequence,
            sender: self.source.clone(),
        }
    }

    /// Flip the acknowledged flag. Returns `false` if it was already set.
    pub fn mark_acknowledged(&mut self) -> bool {
        !core::mem::replace(&mut self.acknowledged, true)
    }
}

/// Delivery confirmation for one packet, addressed to its sender.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ack {
    pub sequence: Sequence,
    /// The endpoint that originally sent the packet.
    pub sender: EndpointId,
}
