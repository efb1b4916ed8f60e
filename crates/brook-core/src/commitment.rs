//! BLAKE3 commitment hashing for receiver lists and the history chain.
//!
//! Uses domain-separated hashing so the three commitment kinds can never
//! collide with each other:
//! - Stream receiver list: `BLAKE3(0x02 || entries)`
//! - History link: `BLAKE3(0x03 || prev || streams_hash || update_time || max_end)`
//! - Splits receiver list: `BLAKE3(0x04 || entries)`
//!
//! All integers are encoded little-endian at fixed width. An empty
//! receiver list hashes to [`Hash256::ZERO`], and a history chain starts
//! from [`Hash256::ZERO`].
//!
//! The ledger persists only these hashes, never the lists themselves:
//! callers must resupply the full list on every call and it is re-hashed
//! and compared against the stored commitment.

use crate::types::{Hash256, StreamReceiver, Timestamp};

/// Domain separation prefix for stream receiver list hashes.
const STREAMS_PREFIX: u8 = 0x02;

/// Domain separation prefix for history chain links.
const HISTORY_PREFIX: u8 = 0x03;

/// Domain separation prefix for splits receiver list hashes.
const SPLITS_PREFIX: u8 = 0x04;

/// Commitment hash of a stream receiver list.
///
/// Returns [`Hash256::ZERO`] for an empty list. The list is hashed as
/// given; callers are expected to have validated the canonical order.
pub fn hash_stream_receivers(receivers: &[StreamReceiver]) -> Hash256 {
    if receivers.is_empty() {
        return Hash256::ZERO;
    }
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[STREAMS_PREFIX]);
    for receiver in receivers {
        hasher.update(&receiver.account_id.0.to_le_bytes());
        hasher.update(&receiver.config.rate_per_sec.to_le_bytes());
        hasher.update(&receiver.config.start.to_le_bytes());
        hasher.update(&receiver.config.duration.to_le_bytes());
    }
    Hash256(hasher.finalize().into())
}

/// Extend a history hash chain by one configuration change.
///
/// `streams_hash` is the commitment of the configuration set at
/// `update_time`, and `max_end` the max-end computed for it. Each link
/// makes the full update history verifiable without storing it.
pub fn hash_history(
    prev: Hash256,
    streams_hash: Hash256,
    update_time: Timestamp,
    max_end: Timestamp,
) -> Hash256 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[HISTORY_PREFIX]);
    hasher.update(prev.as_bytes());
    hasher.update(streams_hash.as_bytes());
    hasher.update(&update_time.to_le_bytes());
    hasher.update(&max_end.to_le_bytes());
    Hash256(hasher.finalize().into())
}

/// Commitment hash of a splits receiver list given as `(account, weight)`
/// pairs. Returns [`Hash256::ZERO`] for an empty list.
pub fn hash_splits_entries(entries: &[(u64, u32)]) -> Hash256 {
    if entries.is_empty() {
        return Hash256::ZERO;
    }
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[SPLITS_PREFIX]);
    for (account, weight) in entries {
        hasher.update(&account.to_le_bytes());
        hasher.update(&weight.to_le_bytes());
    }
    Hash256(hasher.finalize().into())
}
