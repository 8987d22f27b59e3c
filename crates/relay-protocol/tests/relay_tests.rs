//! End-to-end packet lifecycle between two endpoints.

use std::time::Duration;

use relay_core::{Clock, EndpointId, INITIAL_SEQUENCE, ManualClock, Timestamp, content_hash};
use relay_protocol::relay::{advance_height, deliver, send, sweep_timeouts};
use relay_protocol::{Endpoint, ReceiveError, RelayError};

fn chains() -> (Endpoint, Endpoint) {
    (Endpoint::new("chain-a"), Endpoint::new("chain-b"))
}

// ---------------------------------------------------------------------------
// Sequencing
// ---------------------------------------------------------------------------

#[test]
fn n_sends_assign_n_distinct_sequences() {
    let (mut a, mut b) = chains();
    let clock = ManualClock::default();

    let mut seen = std::collections::HashSet::new();
    for i in 0..25u8 {
        let p = send(&mut a, &mut b, vec![i], 10, Duration::from_secs(5), &clock);
        assert!(seen.insert(p.sequence), "sequence {} reused", p.sequence);
    }
    assert_eq!(a.next_send_seq(), 25 + INITIAL_SEQUENCE);
    assert_eq!(seen.len(), 25);
}

#[test]
fn counters_are_per_direction() {
    let (mut a, mut b) = chains();
    let clock = ManualClock::default();

    send(&mut a, &mut b, "a1", 0, Duration::from_secs(5), &clock);
    send(&mut a, &mut b, "a2", 0, Duration::from_secs(5), &clock);
    let from_b = send(&mut b, &mut a, "b1", 0, Duration::from_secs(5), &clock);

    assert_eq!(from_b.sequence, 1);
    deliver(&mut a, &mut b).unwrap();
    deliver(&mut b, &mut a).unwrap();
    deliver(&mut b, &mut a).unwrap();
    assert_eq!(a.next_recv_seq(), 2);
    assert_eq!(b.next_recv_seq(), 3);
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn send_then_receive_round_trip() {
    let (mut a, mut b) = chains();
    let clock = ManualClock::default();

    let packet = send(&mut a, &mut b, "tx1", 10, Duration::from_secs(5), &clock);
    deliver(&mut b, &mut a).unwrap();

    let hash = content_hash(b"tx1");
    assert_eq!(b.delivered().get(&hash), Some(&b"tx1"[..]));
    assert_eq!(a.is_acknowledged(packet.sequence), Some(true));
    assert!(a.sent(packet.sequence).is_none());
    assert_eq!(
        b.delivered().by_origin(&EndpointId::from("chain-a"), packet.sequence),
        Some(&hash)
    );
}

#[test]
fn two_packets_in_order_scenario() {
    let (mut a, mut b) = chains();
    let clock = ManualClock::new(Timestamp::from_millis(1_700_000_000_000));
    let timeout = Duration::from_secs(5);

    let p1 = send(&mut a, &mut b, "tx1", 10, timeout, &clock);
    let p2 = send(&mut a, &mut b, "tx2", 10, timeout, &clock);

    deliver(&mut b, &mut a).unwrap();
    deliver(&mut b, &mut a).unwrap();

    assert_eq!(b.delivered().len(), 2);
    assert_eq!(b.delivered().get(&content_hash(b"tx1")), Some(&b"tx1"[..]));
    assert_eq!(b.delivered().get(&content_hash(b"tx2")), Some(&b"tx2"[..]));
    assert_eq!(a.is_acknowledged(p1.sequence), Some(true));
    assert_eq!(a.is_acknowledged(p2.sequence), Some(true));
    assert_eq!(a.outbound().pending().count(), 0);
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn out_of_order_head_blocks_queue() {
    let (mut a, mut b) = chains();
    let clock = ManualClock::default();
    let timeout = Duration::from_secs(5);

    send(&mut a, &mut b, "tx1", 10, timeout, &clock);
    let p2 = send(&mut a, &mut b, "tx2", 10, timeout, &clock);

    // Network reordering: packet 2 overtakes packet 1.
    b.inbound_mut().push_front(p2);

    let err = deliver(&mut b, &mut a).unwrap_err();
    assert_eq!(
        err,
        RelayError::Receive(ReceiveError::SequenceMismatch {
            expected: 1,
            got: 2
        })
    );
    assert!(err.to_string().contains("packet sequence mismatch"));
    assert_eq!(b.next_recv_seq(), 1);
    assert!(b.delivered().is_empty());

    // Retrying does not skip ahead.
    assert!(deliver(&mut b, &mut a).is_err());
    assert_eq!(b.inbound().len(), 3);
}

#[test]
fn queue_unblocks_once_expected_packet_reaches_head() {
    let (mut a, mut b) = chains();
    let clock = ManualClock::default();
    let timeout = Duration::from_secs(5);

    send(&mut a, &mut b, "tx1", 10, timeout, &clock);
    send(&mut a, &mut b, "tx2", 10, timeout, &clock);
    b.inbound_mut().swap(0, 1);
    assert!(deliver(&mut b, &mut a).is_err());

    b.inbound_mut().swap(0, 1);
    deliver(&mut b, &mut a).unwrap();
    deliver(&mut b, &mut a).unwrap();
    assert_eq!(b.delivered().len(), 2);
}

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

#[test]
fn expired_packet_cannot_be_received() {
    let (mut a, mut b) = chains();
    let clock = ManualClock::default();

    send(&mut a, &mut b, "tx1", 10, Duration::from_millis(50), &clock);
    clock.advance(Duration::from_millis(60));
    advance_height(&mut b);
    sweep_timeouts(&mut b, &clock);

    assert_eq!(
        deliver(&mut b, &mut a).unwrap_err(),
        RelayError::Receive(ReceiveError::EmptyQueue)
    );
    assert!(b.delivered().is_empty());
    assert_eq!(a.is_acknowledged(1), Some(false));
    assert_eq!(b.height(), 1);
}

#[test]
fn within_deadline_then_expired_scenario() {
    let (mut a, mut b) = chains();
    let clock = ManualClock::default();
    let timeout = Duration::from_millis(50);

    // Arrives within its deadline.
    send(&mut a, &mut b, "tx1", 10, timeout, &clock);
    clock.advance(Duration::from_millis(20));
    advance_height(&mut b);
    sweep_timeouts(&mut b, &clock);
    deliver(&mut b, &mut a).unwrap();
    assert_eq!(b.delivered().len(), 1);

    // Delayed past its deadline.
    send(&mut a, &mut b, "tx2", 10, timeout, &clock);
    clock.advance(Duration::from_millis(60));
    advance_height(&mut b);
    sweep_timeouts(&mut b, &clock);

    let err = deliver(&mut b, &mut a).unwrap_err();
    assert!(err.to_string().contains("no packet to receive"));
    assert_eq!(b.delivered().len(), 1);
    assert_eq!(b.delivered().get(&content_hash(b"tx1")), Some(&b"tx1"[..]));
}

#[test]
fn eviction_of_expected_packet_leaves_gap() {
    let (mut a, mut b) = chains();
    let clock = ManualClock::default();

    send(&mut a, &mut b, "tx1", 10, Duration::from_millis(10), &clock);
    send(&mut a, &mut b, "tx2", 10, Duration::from_secs(5), &clock);
    clock.advance(Duration::from_millis(11));
    assert_eq!(sweep_timeouts(&mut b, &clock), 1);

    assert_eq!(
        deliver(&mut b, &mut a).unwrap_err(),
        RelayError::Receive(ReceiveError::SequenceMismatch {
            expected: 1,
            got: 2
        })
    );
    assert_eq!(a.outbound().expired(clock.now()), vec![1]);
}

#[test]
fn sweep_twice_is_noop() {
    let (mut a, mut b) = chains();
    let clock = ManualClock::default();

    send(&mut a, &mut b, "tx1", 10, Duration::from_millis(10), &clock);
    send(&mut a, &mut b, "tx2", 10, Duration::from_secs(5), &clock);
    send(&mut a, &mut b, "tx3", 10, Duration::from_millis(20), &clock);
    clock.advance(Duration::from_millis(30));

    assert_eq!(sweep_timeouts(&mut b, &clock), 2);
    let snapshot = b.inbound().clone();
    assert_eq!(sweep_timeouts(&mut b, &clock), 0);
    assert_eq!(b.inbound(), &snapshot);
}

#[test]
fn sweep_on_empty_queue() {
    let (_, mut b) = chains();
    let clock = ManualClock::default();
    assert_eq!(sweep_timeouts(&mut b, &clock), 0);
}

#[test]
fn height_does_not_expire_packets() {
    let (mut a, mut b) = chains();
    let clock = ManualClock::default();

    send(&mut a, &mut b, "tx1", 1, Duration::from_secs(5), &clock);
    for _ in 0..10 {
        advance_height(&mut b);
    }
    sweep_timeouts(&mut b, &clock);
    deliver(&mut b, &mut a).unwrap();
}
