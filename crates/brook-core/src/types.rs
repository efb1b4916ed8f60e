//! Core ledger types: identifiers, commitment hashes, stream configurations.
//!
//! All timestamps are seconds as `u32`. Per-second rates are fixed-point
//! `u128` with [`RATE_EXTRA_DECIMALS`](crate::constants::RATE_EXTRA_DECIMALS)
//! extra decimals.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A timestamp or duration in seconds.
pub type Timestamp = u32;

/// A cycle index. Cycle `C` covers `[(C-1)*cycle_secs, C*cycle_secs)`.
/// Index 0 is a reserved sentinel ("no cycle recorded").
pub type CycleIdx = u32;

/// A 32-byte commitment hash.
///
/// Used for receiver-list commitments (BLAKE3) and the streams history
/// hash chain. The zero hash is reserved for the empty receiver list and
/// the start of a history chain.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash (32 zero bytes). Commitment of an empty receiver list
    /// and the root of every history hash chain.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a Hash256 from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Opaque account identifier.
///
/// Identity and ownership are external collaborators; the ledger only
/// keys state by this value and never interprets it.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account:{}", self.0)
    }
}

/// Opaque asset identifier. Ledger slots are never shared across assets.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct AssetId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset:{}", self.0)
    }
}

/// Configuration of a single stream: rate, optional start, optional duration.
///
/// `start == 0` means "effective at the sender's update time".
/// `duration == 0` means "until funds run out" (a *default end*: the
/// stream ends at whatever max-end timestamp the balance supports).
///
/// Configs are totally ordered by `(rate_per_sec, start, duration)`; the
/// order canonicalizes receiver lists for hashing and deduplication.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct StreamConfig {
    /// Streamed amount per second, fixed-point with
    /// [`RATE_PER_SEC_MULTIPLIER`](crate::constants::RATE_PER_SEC_MULTIPLIER)
    /// as the denominator. Must be nonzero in a valid receiver list.
    pub rate_per_sec: u128,
    /// Start timestamp, or 0 for "effective immediately".
    pub start: Timestamp,
    /// Duration in seconds, or 0 for a default end.
    pub duration: u32,
}

impl StreamConfig {
    /// Config streaming `rate_per_sec` from the update time until funds run out.
    pub fn new(rate_per_sec: u128) -> Self {
        Self { rate_per_sec, start: 0, duration: 0 }
    }

    /// Config with an explicit start and duration (0 keeps the default).
    pub fn with_timing(rate_per_sec: u128, start: Timestamp, duration: u32) -> Self {
        Self { rate_per_sec, start, duration }
    }
}

/// A stream endpoint: which account is paid, and how.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct StreamReceiver {
    /// The account receiving the stream.
    pub account_id: AccountId,
    /// The stream configuration.
    pub config: StreamConfig,
}

impl StreamReceiver {
    /// Convenience constructor.
    pub fn new(account_id: AccountId, config: StreamConfig) -> Self {
        Self { account_id, config }
    }
}
