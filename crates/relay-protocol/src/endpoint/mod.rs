//! One side of a two-party packet exchange.
//!
//! An [`Endpoint`] owns its inbound queue, its send and receive sequence
//! counters, the store of payloads it has delivered, and the ledger of
//! packets it has sent. The queue and counters form a single unit of
//! consistency: every mutating operation takes `&mut self`.
//!
//! Sending is split into a sender half ([`Endpoint::prepare_send`]) and a
//! destination half ([`Endpoint::enqueue`]) so that neither side ever needs
//! access to the other's state at the same time.

pub mod queue;

use std::collections::VecDeque;
use std::time::Duration;

use relay_core::{
    Ack, Clock, ContentHash, EndpointId, INITIAL_SEQUENCE, Packet, Sequence, Timestamp,
    content_hash,
};

use crate::error::{AckError, ReceiveError};
use crate::ledger::OutboundLedger;
use crate::store::DeliveredStore;

/// Outcome of a successful [`Endpoint::receive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Acknowledgment to route back to the packet's sender.
    pub ack: Ack,
    /// Key the payload was stored under.
    pub hash: ContentHash,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Endpoint {
    id: EndpointId,
    height: u64,
    inbound: VecDeque<Packet>,
    next_send_seq: Sequence,
    next_recv_seq: Sequence,
    delivered: DeliveredStore,
    outbound: OutboundLedger,
}

impl Endpoint {
    pub fn new(id: impl Into<EndpointId>) -> Self {
        let id = id.into();
        Self {
            outbound: OutboundLedger::new(id.clone()),
            id,
            height: 0,
            inbound: VecDeque::new(),
            next_send_seq: INITIAL_SEQUENCE,
            next_recv_seq: INITIAL_SEQUENCE,
            delivered: DeliveredStore::new(),
        }
    }

    // ------------------------------------------------------------------ //
    // Send
    // ------------------------------------------------------------------ //

    /// Build the next outbound packet and record it in the outbound ledger.
    ///
    /// Assigns the current send sequence and advances it. The deadline is
    /// `clock.now() + timeout`. Only the sender's state is touched.
    pub fn prepare_send(
        &mut self,
        payload: Vec<u8>,
        timeout_height: u64,
        timeout: Duration,
        clock: &impl Clock,
    ) -> Packet {
        let sequence = self.next_send_seq;
        self.next_send_seq += 1;

        let deadline = clock.now().saturating_add(timeout);
        let packet = Packet::new(
            sequence,
            self.id.clone(),
            payload,
            timeout_height,
            deadline,
        );
        self.outbound.record(packet.clone());

        tracing::debug!(
            endpoint = %self.id,
            sequence,
            deadline = %deadline,
            len = packet.payload.len(),
            "relay: packet sent"
        );
        packet
    }

    /// Undo the most recent [`Endpoint::prepare_send`] when its packet could
    /// not be handed to the destination.
    ///
    /// Only the latest sequence can be cancelled, and only while it is still
    /// in flight. Returns the withdrawn packet.
    pub fn cancel_send(&mut self, sequence: Sequence) -> Option<Packet> {
        if sequence.checked_add(1) != Some(self.next_send_seq) {
            return None;
        }
        let packet = self.outbound.discard(sequence)?;
        self.next_send_seq = sequence;
        tracing::debug!(endpoint = %self.id, sequence, "relay: send cancelled");
        Some(packet)
    }

    /// Append an arriving packet to the tail of the inbound queue.
    pub fn enqueue(&mut self, packet: Packet) {
        tracing::trace!(
            endpoint = %self.id,
            sequence = packet.sequence,
            source = %packet.source,
            queued = self.inbound.len() + 1,
            "relay: packet queued"
        );
        self.inbound.push_back(packet);
    }

    /// Send `payload` to `destination`, returning a copy of the packet.
    ///
    /// The copy can be inspected or re-injected to simulate an adversarial
    /// network; the sender's own record lives in its outbound ledger.
    pub fn send(
        &mut self,
        destination: &mut Endpoint,
        payload: Vec<u8>,
        timeout_height: u64,
        timeout: Duration,
        clock: &impl Clock,
    ) -> Packet {
        let packet = self.prepare_send(payload, timeout_height, timeout, clock);
        destination.enqueue(packet.clone());
        packet
    }

    // ------------------------------------------------------------------ //
    // Receive / acknowledge
    // ------------------------------------------------------------------ //

    /// Consume the head of the inbound queue if it carries the expected
    /// sequence.
    ///
    /// Only the head is inspected. On any error the endpoint is left exactly
    /// as it was.
    pub fn receive(&mut self) -> Result<Delivery, ReceiveError> {
        let packet = self.inbound.pop_front().ok_or(ReceiveError::EmptyQueue)?;

        if packet.sequence != self.next_recv_seq {
            let got = packet.sequence;
            self.inbound.push_front(packet);
            tracing::trace!(
                endpoint = %self.id,
                expected = self.next_recv_seq,
                got,
                "relay: head-of-line sequence mismatch"
            );
            return Err(ReceiveError::SequenceMismatch {
                expected: self.next_recv_seq,
                got,
            });
        }

        let hash = content_hash(&packet.payload);
        let origin = (packet.source.clone(), packet.sequence);
        if let Err(e) = self.delivered.insert(hash, &packet.payload, origin) {
            self.inbound.push_front(packet);
            tracing::warn!(endpoint = %self.id, "relay: refusing delivery: {e}");
            return Err(e.into());
        }
        self.next_recv_seq += 1;

        tracing::debug!(
            endpoint = %self.id,
            sequence = packet.sequence,
            source = %packet.source,
            hash = %hash,
            "relay: packet received"
        );

        Ok(Delivery {
            ack: packet.ack(),
            hash,
            payload: packet.payload,
        })
    }

    /// Apply an acknowledgment for one of this endpoint's own packets.
    pub fn apply_ack(&mut self, ack: &Ack) -> Result<(), AckError> {
        self.outbound.apply(ack)?;
        tracing::debug!(
            endpoint = %self.id,
            sequence = ack.sequence,
            "relay: packet acknowledged"
        );
        Ok(())
    }

    // ------------------------------------------------------------------ //
    // Timeouts and height
    // ------------------------------------------------------------------ //

    /// Evict every queued packet whose deadline lies strictly before `now`.
    ///
    /// Evicted packets are never acknowledged and `next_recv_seq` is not
    /// touched, so evicting the expected packet leaves a gap that blocks the
    /// queue. Returns the number of packets evicted.
    pub fn sweep_timeouts(&mut self, now: Timestamp) -> usize {
        let evicted = queue::evict_expired(&mut self.inbound, now);
        if !evicted.is_empty() {
            tracing::debug!(
                endpoint = %self.id,
                now = %now,
                ?evicted,
                remaining = self.inbound.len(),
                "relay: timed-out packets evicted"
            );
        }
        evicted.len()
    }

    /// Advance the local height by one round.
    pub fn advance_height(&mut self) {
        self.height += 1;
        tracing::trace!(endpoint = %self.id, height = self.height, "relay: height advanced");
    }

    // ------------------------------------------------------------------ //
    // Accessors
    // ------------------------------------------------------------------ //

    pub fn id(&self) -> &EndpointId {
        &self.id
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// Next sequence this endpoint will assign to an outgoing packet.
    pub fn next_send_seq(&self) -> Sequence {
        self.next_send_seq
    }

    /// Next sequence this endpoint expects to consume.
    pub fn next_recv_seq(&self) -> Sequence {
        self.next_recv_seq
    }

    pub fn inbound(&self) -> &VecDeque<Packet> {
        &self.inbound
    }

    /// Direct access to the inbound queue for fault injection (reordering,
    /// dropping or duplicating packets in transit).
    pub fn inbound_mut(&mut self) -> &mut VecDeque<Packet> {
        &mut self.inbound
    }

    pub fn delivered(&self) -> &DeliveredStore {
        &self.delivered
    }

    pub fn outbound(&self) -> &OutboundLedger {
        &self.outbound
    }

    /// A sent packet still awaiting its acknowledgment.
    pub fn sent(&self, sequence: Sequence) -> Option<&Packet> {
        self.outbound.get(sequence)
    }

    /// Whether sent packet `sequence` has been acknowledged; `None` if this
    /// endpoint never sent it.
    pub fn is_acknowledged(&self, sequence: Sequence) -> Option<bool> {
        self.outbound.is_acknowledged(sequence)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use relay_core::ManualClock;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn sequences_are_unique_and_monotonic(n in 0usize..200) {
            let mut a = Endpoint::new("chain-a");
            let mut b = Endpoint::new("chain-b");
            let clock = ManualClock::default();
            let mut seqs = Vec::with_capacity(n);
            for i in 0..n {
                let p = a.send(&mut b, vec![i as u8], 0, Duration::from_secs(1), &clock);
                seqs.push(p.sequence);
            }
            prop_assert_eq!(a.next_send_seq(), n as u64 + INITIAL_SEQUENCE);
            prop_assert!(seqs.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(a.outbound().len(), n);
        }

        #[test]
        fn sweep_is_idempotent(
            deadlines in proptest::collection::vec(0u64..1_000, 0..50),
            now in 0u64..1_000,
        ) {
            let mut a = Endpoint::new("chain-a");
            let mut b = Endpoint::new("chain-b");
            let clock = ManualClock::default();
            for d in &deadlines {
                a.send(&mut b, b"p".to_vec(), 0, Duration::from_millis(*d), &clock);
            }
            let now = Timestamp::from_millis(now);
            b.sweep_timeouts(now);
            let after_first: Vec<Sequence> = b.inbound().iter().map(|p| p.sequence).collect();
            prop_assert_eq!(b.sweep_timeouts(now), 0);
            let after_second: Vec<Sequence> = b.inbound().iter().map(|p| p.sequence).collect();
            prop_assert_eq!(&after_first, &after_second);
            prop_assert!(b.inbound().iter().all(|p| !p.is_expired(now)));
            prop_assert_eq!(b.next_recv_seq(), INITIAL_SEQUENCE);
        }
    }
}
