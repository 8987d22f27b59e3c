//! In-process links between chains.
//!
//! Every chain owns one inbox carrying packets and acknowledgments from its
//! counterparty, which holds a cloned [`LinkTx`] for it. Both channels are
//! FIFO, so packets pushed by the sender arrive in the order their sequences
//! were assigned.
//!
//! The packet channel is bounded: a sender facing a full inbox gets the
//! packet back instead of queueing without limit. Acks are unbounded because
//! at most one ack exists per packet the receiving chain itself still holds
//! in flight, and a bounded ack channel could stall two chains delivering to
//! each other.

use relay_core::{Ack, Packet};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Sending half of a chain's inbox.
#[derive(Debug, Clone)]
pub struct LinkTx {
    pub(crate) packets: mpsc::Sender<Packet>,
    pub(crate) acks: mpsc::UnboundedSender<Ack>,
}

impl LinkTx {
    /// Push a packet without waiting; fails when the inbox is full or gone.
    pub fn send_packet(&self, packet: Packet) -> Result<(), TrySendError<Packet>> {
        self.packets.try_send(packet)
    }

    pub fn send_ack(&self, ack: Ack) -> Result<(), Ack> {
        self.acks.send(ack).map_err(|e| e.0)
    }

    /// Whether the receiving chain has been dropped.
    pub fn is_closed(&self) -> bool {
        self.packets.is_closed()
    }
}

/// Receiving half of a chain's inbox.
#[derive(Debug)]
pub struct LinkRx {
    pub(crate) packets: mpsc::Receiver<Packet>,
    pub(crate) acks: mpsc::UnboundedReceiver<Ack>,
}

/// Create a new inbox buffering up to `capacity` packets.
pub fn inbox(capacity: usize) -> (LinkTx, LinkRx) {
    let (packet_tx, packet_rx) = mpsc::channel(capacity);
    let (ack_tx, ack_rx) = mpsc::unbounded_channel();
    (
        LinkTx {
            packets: packet_tx,
            acks: ack_tx,
        },
        LinkRx {
            packets: packet_rx,
            acks: ack_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{EndpointId, Timestamp};

    fn make_packet(seq: u64) -> Packet {
        Packet::new(
            seq,
            EndpointId::from("chain-a"),
            vec![seq as u8],
            0,
            Timestamp::ZERO,
        )
    }

    #[test]
    fn packets_arrive_in_order() {
        let (tx, mut rx) = inbox(8);
        for seq in 1..=5 {
            tx.send_packet(make_packet(seq)).unwrap();
        }
        for seq in 1..=5 {
            assert_eq!(rx.packets.try_recv().unwrap().sequence, seq);
        }
    }

    #[test]
    fn acks_travel_separately() {
        let (tx, mut rx) = inbox(8);
        tx.send_ack(make_packet(3).ack()).unwrap();
        assert!(rx.packets.try_recv().is_err());
        assert_eq!(rx.acks.try_recv().unwrap().sequence, 3);
    }

    #[test]
    fn dropped_inbox_closes_link() {
        let (tx, rx) = inbox(8);
        assert!(!tx.is_closed());
        drop(rx);
        assert!(tx.is_closed());
        match tx.send_packet(make_packet(1)) {
            Err(TrySendError::Closed(p)) => assert_eq!(p.sequence, 1),
            other => panic!("expected closed link, got {other:?}"),
        }
    }

    #[test]
    fn full_inbox_returns_packet() {
        let (tx, mut rx) = inbox(2);
        tx.send_packet(make_packet(1)).unwrap();
        tx.send_packet(make_packet(2)).unwrap();
        match tx.send_packet(make_packet(3)) {
            Err(TrySendError::Full(p)) => assert_eq!(p.sequence, 3),
            other => panic!("expected full inbox, got {other:?}"),
        }

        assert_eq!(rx.packets.try_recv().unwrap().sequence, 1);
        tx.send_packet(make_packet(3)).unwrap();
    }
}
