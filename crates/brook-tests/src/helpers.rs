//! Shared test helpers for E2E and integration tests.

use brook_core::constants::RATE_PER_SEC_MULTIPLIER;
use brook_core::types::{AccountId, AssetId, StreamConfig, StreamReceiver, Timestamp};
use brook_ledger::Ledger;
use brook_splits::SplitsReceiver;
use brook_streams::{StreamsHistoryEntry, StreamsStateView};

/// The cycle length used throughout the scenario tests.
pub const CYCLE: u32 = 10;

/// The single asset most scenarios run against.
pub const ASSET: AssetId = AssetId(1);

/// A ledger with the standard test cycle length.
pub fn ledger() -> Ledger {
    Ledger::new(CYCLE)
}

/// Receiver streaming `rate_units` whole units per second, no explicit
/// timing.
pub fn stream_to(account: u64, rate_units: u128) -> StreamReceiver {
    StreamReceiver::new(
        AccountId(account),
        StreamConfig::new(rate_units * RATE_PER_SEC_MULTIPLIER),
    )
}

/// Receiver with explicit timing; zeros keep the defaults.
pub fn stream_to_timed(
    account: u64,
    rate_units: u128,
    start: Timestamp,
    duration: u32,
) -> StreamReceiver {
    StreamReceiver::new(
        AccountId(account),
        StreamConfig::with_timing(rate_units * RATE_PER_SEC_MULTIPLIER, start, duration),
    )
}

/// Splits receiver shorthand.
pub fn split_to(account: u64, weight: u32) -> SplitsReceiver {
    SplitsReceiver::new(AccountId(account), weight)
}

/// Full history entry matching a sender's state after a schedule change.
pub fn history_entry(
    receivers: &[StreamReceiver],
    state: StreamsStateView,
) -> StreamsHistoryEntry {
    StreamsHistoryEntry::Full {
        receivers: receivers.to_vec(),
        update_time: state.update_time,
        max_end: state.max_end,
    }
}
