//! Newtype wrappers for protocol identifiers, hashes and timestamps.
//!
//! These types keep chain identifiers, content keys and clock readings from
//! being mixed up with the raw strings, byte arrays and integers they wrap.

extern crate alloc;

use alloc::string::String;
use core::fmt;
use core::time::Duration;

use crate::constants::CONTENT_HASH_LEN;

/// Per-sender packet sequence number.
pub type Sequence = u64;

/// Helper to write lowercase hex without the `hex` crate.
fn fmt_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for byte in bytes {
        write!(f, "{:02x}", byte)?;
    }
    Ok(())
}

/// Identifier of one side of a packet exchange (a chain's relay endpoint).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(String);

impl EndpointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EndpointId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EndpointId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EndpointId({})", self.0)
    }
}

/// A 32-byte SHA-256 digest of a packet payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct ContentHash(pub(crate) [u8; CONTENT_HASH_LEN]);

impl ContentHash {
    pub const fn new(bytes: [u8; CONTENT_HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; CONTENT_HASH_LEN] {
        self.0
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for ContentHash {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; CONTENT_HASH_LEN] = bytes.try_into().map_err(|_| InvalidLength {
            expected: CONTENT_HASH_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hex(&self.0, f)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash(")?;
        fmt_hex(&self.0[..4], f)?;
        write!(f, "..)")
    }
}

/// A point on a [`crate::clock::Clock`] timeline, in milliseconds.
///
/// Only timestamps read from the same clock are comparable.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Add a duration, clamping at the end of the timeline.
    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Strict ordering used by timeout checks: a deadline equal to `now` has
    /// not yet elapsed.
    pub fn is_before(self, other: Timestamp) -> bool {
        self.0 < other.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms)", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Error for byte slices of the wrong length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLength {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for InvalidLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid length: expected {} bytes, got {}",
            self.expected, self.actual
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidLength {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::ToString;

    #[test]
    fn test_content_hash_try_from_slice() {
        let bytes = [0xABu8; 32];
        let h = ContentHash::try_from(bytes.as_slice()).unwrap();
        assert_eq!(h.as_ref(), &bytes);
    }

    #[test]
    fn test_content_hash_try_from_wrong_length() {
        let err = ContentHash::try_from([0u8; 16].as_slice()).unwrap_err();
        assert_eq!(
            err,
            InvalidLength {
                expected: 32,
                actual: 16
            }
        );
        assert_eq!(err.to_string(), "invalid length: expected 32 bytes, got 16");
    }

    #[test]
    fn test_content_hash_display_and_debug() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xde;
        bytes[1] = 0xad;
        bytes[2] = 0xbe;
        bytes[3] = 0xef;
        let h = ContentHash::new(bytes);
        let shown = h.to_string();
        assert_eq!(shown.len(), 64);
        assert!(shown.starts_with("deadbeef00"));
        assert_eq!(format!("{h:?}"), "ContentHash(deadbeef..)");
    }

    #[test]
    fn test_endpoint_id_display() {
        let id = EndpointId::from("chain-a");
        assert_eq!(id.to_string(), "chain-a");
        assert_eq!(id.as_str(), "chain-a");
        assert_eq!(format!("{id:?}"), "EndpointId(chain-a)");
    }

    #[test]
    fn test_timestamp_saturating_add() {
        let t = Timestamp::from_millis(1_000);
        assert_eq!(
            t.saturating_add(Duration::from_millis(250)),
            Timestamp::from_millis(1_250)
        );
        let end = Timestamp::from_millis(u64::MAX - 1);
        assert_eq!(
            end.saturating_add(Duration::from_secs(10)),
            Timestamp::from_millis(u64::MAX)
        );
    }

    #[test]
    fn test_timestamp_is_before_is_strict() {
        let a = Timestamp::from_millis(10);
        let b = Timestamp::from_millis(11);
        assert!(a.is_before(b));
        assert!(!b.is_before(a));
        assert!(!a.is_before(a));
    }
}
