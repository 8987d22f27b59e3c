//! Pairwise relay operations.
//!
//! These functions express the protocol across two endpoints held by a single
//! control flow (a test driver or simulation loop): send, deliver with
//! acknowledgment, timeout sweep and height progression.

use std::time::Duration;

use relay_core::{Clock, Packet};

use crate::endpoint::{Delivery, Endpoint};
use crate::error::RelayError;

/// Send `payload` from `source` to `destination`'s inbound queue.
pub fn send(
    source: &mut Endpoint,
    destination: &mut Endpoint,
    payload: impl Into<Vec<u8>>,
    timeout_height: u64,
    timeout: Duration,
    clock: &impl Clock,
) -> Packet {
    source.send(destination, payload.into(), timeout_height, timeout, clock)
}

/// Receive the head of `destination`'s queue and apply the resulting
/// acknowledgment to `source`.
///
/// If the receive fails neither endpoint changes. If the ack is rejected by
/// `source` (it was not the packet's sender, or already saw this ack) the
/// delivery on `destination` stands and the ack error is returned.
pub fn deliver(destination: &mut Endpoint, source: &mut Endpoint) -> Result<Delivery, RelayError> {
    let delivery = destination.receive()?;
    source.apply_ack(&delivery.ack)?;
    Ok(delivery)
}

/// Evict timed-out packets from `endpoint`'s queue using `clock`'s current time.
pub fn sweep_timeouts(endpoint: &mut Endpoint, clock: &impl Clock) -> usize {
    endpoint.sweep_timeouts(clock.now())
}

/// Advance `endpoint`'s height by one.
pub fn advance_height(endpoint: &mut Endpoint) {
    endpoint.advance_height();
}
