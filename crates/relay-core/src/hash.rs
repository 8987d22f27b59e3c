//! SHA-256 content hashing for delivered payloads.

use sha2::{Digest, Sha256};

use crate::constants::CONTENT_HASH_LEN;
use crate::types::ContentHash;

/// Compute the SHA-256 hash of the given data.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; CONTENT_HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Content key under which a receiving endpoint stores a payload.
pub fn content_hash(payload: &[u8]) -> ContentHash {
    ContentHash::new(sha256(payload))
}
