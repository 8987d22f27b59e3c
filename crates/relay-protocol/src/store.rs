//! Content-addressed store of delivered payloads.
//!
//! Payloads are keyed by their SHA-256 content hash and never removed. A
//! hash already bound to different bytes is reported as a collision instead
//! of being overwritten. A secondary index maps each delivery's origin
//! `(sender, sequence)` to the hash it was stored under.

use std::collections::HashMap;

use relay_core::{ContentHash, EndpointId, Sequence};

use crate::error::StoreError;

/// Result of a successful [`DeliveredStore::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The hash was not yet present.
    Inserted,
    /// The same bytes were already stored under this hash.
    Duplicate,
}

#[derive(Debug, Default, Clone)]
pub struct DeliveredStore {
    payloads: HashMap<ContentHash, Vec<u8>>,
    by_origin: HashMap<(EndpointId, Sequence), ContentHash>,
}

impl DeliveredStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `payload` may be stored under `hash` without mutating.
    pub fn check(&self, hash: &ContentHash, payload: &[u8]) -> Result<(), StoreError> {
        match self.payloads.get(hash) {
            Some(existing) if existing.as_slice() != payload => {
                Err(StoreError::HashCollision { hash: *hash })
            }
            _ => Ok(()),
        }
    }

    /// Record a delivered payload. On error nothing is modified.
    pub fn insert(
        &mut self,
        hash: ContentHash,
        payload: &[u8],
        origin: (EndpointId, Sequence),
    ) -> Result<InsertOutcome, StoreError> {
        self.check(&hash, payload)?;
        let outcome = if self.payloads.contains_key(&hash) {
            InsertOutcome::Duplicate
        } else {
            self.payloads.insert(hash, payload.to_vec());
            InsertOutcome::Inserted
        };
        self.by_origin.insert(origin, hash);
        Ok(outcome)
    }

    pub fn get(&self, hash: &ContentHash) -> Option<&[u8]> {
        self.payloads.get(hash).map(Vec::as_slice)
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.payloads.contains_key(hash)
    }

    /// Hash under which the packet `(sender, sequence)` was stored.
    pub fn by_origin(&self, sender: &EndpointId, sequence: Sequence) -> Option<&ContentHash> {
        self.by_origin.get(&(sender.clone(), sequence))
    }

    /// Number of distinct payloads.
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Number of deliveries recorded, including duplicate payloads.
    pub fn deliveries(&self) -> usize {
        self.by_origin.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ContentHash, &[u8])> {
        self.payloads.iter().map(|(h, p)| (h, p.as_slice()))
    }
}
