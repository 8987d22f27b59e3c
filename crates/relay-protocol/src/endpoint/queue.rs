//! Inbound queue helpers.

use std::collections::VecDeque;

use relay_core::{Packet, Sequence, Timestamp};

/// Remove every packet whose deadline lies strictly before `now`, in one
/// pass, keeping survivors in arrival order. Returns the evicted sequences.
pub fn evict_expired(queue: &mut VecDeque<Packet>, now: Timestamp) -> Vec<Sequence> {
    let mut evicted = Vec::new();
    queue.retain(|p| {
        if p.is_expired(now) {
            evicted.push(p.sequence);
            false
        } else {
            true
        }
    });
    evicted
}
