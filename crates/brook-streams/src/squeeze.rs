//! Squeezing: collecting funds streamed in the current, unfinished cycle.
//!
//! The ledger stores only the tip of each sender's history hash chain, so
//! a receiver who wants funds before the cycle ends must present the
//! sender's update history. Each entry is either the full receiver list
//! of that update or just its commitment hash; replaying the chain from a
//! claimed start link and comparing against the stored tip proves the
//! history authentic. Only full entries can then be squeezed from.
//!
//! An entry's configuration is live from its `update_time` until the next
//! entry's `update_time`, clipped by its own `max_end`. The engine walks
//! entries newest-first, tightening the end cap as it goes.

use serde::{Deserialize, Serialize};

use brook_core::commitment::{hash_history, hash_stream_receivers};
use brook_core::error::StreamsError;
use brook_core::types::{AccountId, Hash256, StreamReceiver, Timestamp};

use crate::cycles::{stream_range, streamed_amt};

/// One link of a sender's configuration history.
///
/// `Skipped` entries carry only the commitment hash of their receiver
/// list. They keep the chain verifiable while letting the caller omit
/// lists that cannot have streamed to them anyway.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub enum StreamsHistoryEntry {
    /// Full receiver list of one configuration change.
    Full {
        /// Receiver list set by this change, in canonical order.
        receivers: Vec<StreamReceiver>,
        /// When the change took effect.
        update_time: Timestamp,
        /// Max end computed for the change.
        max_end: Timestamp,
    },
    /// Commitment-only entry, not squeezable.
    Skipped {
        /// Commitment hash of the receiver list set by this change.
        streams_hash: Hash256,
        /// When the change took effect.
        update_time: Timestamp,
        /// Max end computed for the change.
        max_end: Timestamp,
    },
}

impl StreamsHistoryEntry {
    /// When this configuration took effect.
    pub fn update_time(&self) -> Timestamp {
        match self {
            Self::Full { update_time, .. } | Self::Skipped { update_time, .. } => *update_time,
        }
    }

    /// Max end of this configuration.
    pub fn max_end(&self) -> Timestamp {
        match self {
            Self::Full { max_end, .. } | Self::Skipped { max_end, .. } => *max_end,
        }
    }

    /// Commitment hash of this entry's receiver list.
    pub fn streams_hash(&self) -> Hash256 {
        match self {
            Self::Full { receivers, .. } => hash_stream_receivers(receivers),
            Self::Skipped { streams_hash, .. } => *streams_hash,
        }
    }
}

/// Verify that `entries` replays the sender's history hash chain from
/// `start_hash` to exactly `expected`.
///
/// `start_hash` is [`Hash256::ZERO`] for a complete history; a later
/// chain link lets the caller omit entries older than anything they want
/// to squeeze. The included entries must be contiguous and in order; any
/// gap, reordering, or tampered field changes the tip and fails the
/// comparison.
pub fn verify_history(
    start_hash: Hash256,
    entries: &[StreamsHistoryEntry],
    expected: Hash256,
) -> Result<(), StreamsError> {
    let mut hash = start_hash;
    for entry in entries {
        hash = hash_history(hash, entry.streams_hash(), entry.update_time(), entry.max_end());
    }
    if hash == expected {
        Ok(())
    } else {
        Err(StreamsError::InvalidHistory)
    }
}

/// Amount streamed to `target` by one configuration, within
/// `[start_cap, end_cap)`.
///
/// Truncation matches the delta ledger, so the squeezed amount is exactly
/// what the receivable walk would have credited for the same window.
pub fn squeezed_amt(
    cycle_secs: u32,
    receivers: &[StreamReceiver],
    update_time: Timestamp,
    max_end: Timestamp,
    target: AccountId,
    start_cap: Timestamp,
    end_cap: Timestamp,
) -> u128 {
    let mut amount = 0u128;
    for receiver in receivers {
        if receiver.account_id != target {
            continue;
        }
        let (start, end) = stream_range(receiver, update_time, max_end, start_cap, end_cap);
        amount += streamed_amt(cycle_secs, receiver.config.rate_per_sec, start, end);
    }
    amount
}

#[cfg(test)]
mod tests {
    use super::*;
    use brook_core::constants::RATE_PER_SEC_MULTIPLIER as M;
    use brook_core::types::StreamConfig;

    const CS: u32 = 10;

    fn rcv(account: u64, rate_units: u128) -> StreamReceiver {
        StreamReceiver::new(AccountId(account), StreamConfig::new(rate_units * M))
    }

    fn full(receivers: Vec<StreamReceiver>, update_time: u32, max_end: u32) -> StreamsHistoryEntry {
        StreamsHistoryEntry::Full { receivers, update_time, max_end }
    }

    fn chain_tip(entries: &[StreamsHistoryEntry]) -> Hash256 {
        let mut hash = Hash256::ZERO;
        for e in entries {
            hash = hash_history(hash, e.streams_hash(), e.update_time(), e.max_end());
        }
        hash
    }

    // ------------------------------------------------------------------
    // History verification
    // ------------------------------------------------------------------

    #[test]
    fn empty_history_verifies_against_zero() {
        assert!(verify_history(Hash256::ZERO, &[], Hash256::ZERO).is_ok());
    }

    #[test]
    fn complete_chain_verifies() {
        let entries = vec![
            full(vec![rcv(1, 1)], 0, 100),
            full(vec![rcv(1, 2), rcv(2, 1)], 50, 150),
        ];
        let tip = chain_tip(&entries);
        assert!(verify_history(Hash256::ZERO, &entries, tip).is_ok());
    }

    #[test]
    fn skipped_entry_contributes_its_hash() {
        let receivers = vec![rcv(1, 1)];
        let as_full = vec![full(receivers.clone(), 0, 100)];
        let as_skipped = vec![StreamsHistoryEntry::Skipped {
            streams_hash: hash_stream_receivers(&receivers),
            update_time: 0,
            max_end: 100,
        }];
        assert_eq!(chain_tip(&as_full), chain_tip(&as_skipped));
    }

    #[test]
    fn truncated_chain_fails() {
        let entries = vec![full(vec![rcv(1, 1)], 0, 100), full(vec![rcv(1, 2)], 50, 150)];
        let tip = chain_tip(&entries);
        assert!(matches!(
            verify_history(Hash256::ZERO, &entries[..1], tip),
            Err(StreamsError::InvalidHistory)
        ));
    }

    #[test]
    fn tampered_entry_fails() {
        let entries = vec![full(vec![rcv(1, 1)], 0, 100)];
        let tip = chain_tip(&entries);
        let forged = vec![full(vec![rcv(1, 1_000)], 0, 100)];
        assert!(verify_history(Hash256::ZERO, &forged, tip).is_err());
    }

    #[test]
    fn suffix_verifies_from_a_mid_chain_start() {
        let entries = vec![
            full(vec![rcv(1, 1)], 0, 100),
            full(vec![rcv(1, 2)], 50, 150),
            full(vec![rcv(1, 3)], 80, 200),
        ];
        let tip = chain_tip(&entries);
        let mid = chain_tip(&entries[..1]);
        assert!(verify_history(mid, &entries[1..], tip).is_ok());
        // But not from the wrong link.
        assert!(verify_history(mid, &entries[2..], tip).is_err());
    }

    #[test]
    fn reordered_chain_fails() {
        let a = full(vec![rcv(1, 1)], 0, 100);
        let b = full(vec![rcv(2, 1)], 50, 150);
        let tip = chain_tip(&[a.clone(), b.clone()]);
        assert!(verify_history(Hash256::ZERO, &[b, a], tip).is_err());
    }

    // ------------------------------------------------------------------
    // Squeezed amounts
    // ------------------------------------------------------------------

    #[test]
    fn squeezes_only_the_target() {
        let receivers = vec![rcv(1, 1), rcv(2, 3)];
        // Window [10, 15): 5 seconds.
        assert_eq!(squeezed_amt(CS, &receivers, 0, 100, AccountId(1), 10, 15), 5);
        assert_eq!(squeezed_amt(CS, &receivers, 0, 100, AccountId(2), 10, 15), 15);
        assert_eq!(squeezed_amt(CS, &receivers, 0, 100, AccountId(9), 10, 15), 0);
    }

    #[test]
    fn window_clips_to_max_end() {
        let receivers = vec![rcv(1, 1)];
        // max_end = 12 inside the window [10, 20).
        assert_eq!(squeezed_amt(CS, &receivers, 0, 12, AccountId(1), 10, 20), 2);
    }

    #[test]
    fn window_clips_to_update_time() {
        let receivers = vec![rcv(1, 1)];
        // Config set at t=14; cap [10, 20) yields [14, 20).
        assert_eq!(squeezed_amt(CS, &receivers, 14, 100, AccountId(1), 10, 20), 6);
    }

    #[test]
    fn repeated_receiver_entries_accumulate() {
        // Two configs for the same account in one list.
        let receivers = vec![rcv(1, 1), rcv(1, 2)];
        assert_eq!(squeezed_amt(CS, &receivers, 0, 100, AccountId(1), 0, 10), 30);
    }

    #[test]
    fn empty_window_squeezes_nothing() {
        let receivers = vec![rcv(1, 5)];
        assert_eq!(squeezed_amt(CS, &receivers, 0, 100, AccountId(1), 15, 15), 0);
        assert_eq!(squeezed_amt(CS, &receivers, 0, 100, AccountId(1), 20, 15), 0);
    }
}
