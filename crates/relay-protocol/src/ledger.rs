//! Sender-side record of outbound packets.
//!
//! Every packet an endpoint sends is held here under its sequence number
//! until the destination acknowledges it. Acknowledgments arrive as explicit
//! [`Ack`] messages rather than through a packet object shared with the
//! receiver.
//!
//! Acknowledged packets are dropped from the ledger. Only their sequence
//! numbers are remembered: a watermark below which every sequence is
//! settled, plus the acknowledged sequences above it.

use std::collections::{BTreeMap, BTreeSet};

use relay_core::{Ack, EndpointId, INITIAL_SEQUENCE, Packet, Sequence, Timestamp};

use crate::error::AckError;

#[derive(Debug, Clone)]
pub struct OutboundLedger {
    owner: EndpointId,
    in_flight: BTreeMap<Sequence, Packet>,
    /// Every sequence below this has been acknowledged.
    acked_below: Sequence,
    /// Acknowledged sequences at or above `acked_below`.
    acked_above: BTreeSet<Sequence>,
    acknowledged: usize,
}

impl OutboundLedger {
    pub fn new(owner: EndpointId) -> Self {
        Self {
            owner,
            in_flight: BTreeMap::new(),
            acked_below: INITIAL_SEQUENCE,
            acked_above: BTreeSet::new(),
            acknowledged: 0,
        }
    }

    /// Record a freshly sent packet.
    pub fn record(&mut self, packet: Packet) {
        self.in_flight.insert(packet.sequence, packet);
    }

    /// Remove an in-flight packet that never left this endpoint.
    pub fn discard(&mut self, sequence: Sequence) -> Option<Packet> {
        self.in_flight.remove(&sequence)
    }

    /// The in-flight packet `sequence`, if it is still awaiting an ack.
    pub fn get(&self, sequence: Sequence) -> Option<&Packet> {
        self.in_flight.get(&sequence)
    }

    /// `Some(true)` once acknowledged, `Some(false)` while in flight, `None`
    /// if never sent.
    pub fn is_acknowledged(&self, sequence: Sequence) -> Option<bool> {
        if self.is_settled(sequence) {
            Some(true)
        } else if self.in_flight.contains_key(&sequence) {
            Some(false)
        } else {
            None
        }
    }

    fn is_settled(&self, sequence: Sequence) -> bool {
        (sequence >= INITIAL_SEQUENCE && sequence < self.acked_below)
            || self.acked_above.contains(&sequence)
    }

    /// Apply an acknowledgment, settling the packet exactly once.
    ///
    /// Returns the packet, now marked acknowledged and no longer held.
    pub fn apply(&mut self, ack: &Ack) -> Result<Packet, AckError> {
        if ack.sender != self.owner {
            return Err(AckError::ForeignAck {
                expected: self.owner.clone(),
                actual: ack.sender.clone(),
            });
        }
        if self.is_settled(ack.sequence) {
            return Err(AckError::AlreadyAcknowledged(ack.sequence));
        }
        let mut packet = self
            .in_flight
            .remove(&ack.sequence)
            .ok_or(AckError::UnknownSequence(ack.sequence))?;
        packet.mark_acknowledged();

        self.acknowledged += 1;
        self.acked_above.insert(ack.sequence);
        while self.acked_above.remove(&self.acked_below) {
            self.acked_below += 1;
        }
        Ok(packet)
    }

    /// Unacknowledged packets in ascending sequence order.
    pub fn pending(&self) -> impl Iterator<Item = &Packet> {
        self.in_flight.values()
    }

    /// Sequences of unacknowledged packets whose deadline lies before `now`.
    ///
    /// Read-only: resending is left to whoever drives the relay.
    pub fn expired(&self, now: Timestamp) -> Vec<Sequence> {
        self.pending()
            .filter(|p| p.is_expired(now))
            .map(|p| p.sequence)
            .collect()
    }

    pub fn acknowledged_count(&self) -> usize {
        self.acknowledged
    }

    /// Number of packets still in flight.
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}
