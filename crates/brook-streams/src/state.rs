//! Per-(account, asset) streams state.
//!
//! The ledger persists commitment hashes, not receiver lists: the caller
//! must resupply the full current list and prove it matches
//! [`StreamsState::streams_hash`]. The history hash chain makes every past
//! configuration verifiable for squeezing without storing it.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use brook_core::types::{AccountId, CycleIdx, Hash256, Timestamp};

/// Signed per-cycle delta pair.
///
/// For a finished cycle, the receivable amount equals the running sum of
/// `this_cycle` values plus every earlier cycle's `next_cycle` carry.
/// Entries for cycles before the stored next-receivable pointer are always
/// absent (already consumed and deleted).
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct AmtDelta {
    /// Delta of the amount receivable in this cycle.
    pub this_cycle: i128,
    /// Delta carried into the next cycle's receivable amount.
    pub next_cycle: i128,
}

/// Full streams state for one `(account, asset)` slot.
#[derive(
    Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct StreamsState {
    /// Commitment hash of the active receiver list. [`Hash256::ZERO`] when
    /// no receivers are configured.
    pub streams_hash: Hash256,
    /// Running hash chain over all configuration changes.
    pub history_hash: Hash256,
    /// First cycle with unconsumed deltas. 0 until the slot first receives.
    pub next_receivable_cycle: CycleIdx,
    /// Timestamp of the last configuration change. Monotonically
    /// non-decreasing.
    pub update_time: Timestamp,
    /// Latest timestamp at which the balance still funds the schedule.
    pub max_end: Timestamp,
    /// Balance remaining at `update_time` under the previous configuration.
    pub balance: u128,
    /// Sparse cycle-indexed delta ledger for funds streamed *to* this slot.
    pub amt_deltas: BTreeMap<CycleIdx, AmtDelta>,
    /// Per-sender timestamp up to which squeezing has been applied.
    pub next_squeezed: HashMap<AccountId, Timestamp>,
}

/// Copyable snapshot of the fields a host needs to assemble squeeze
/// histories and drive `set_streams`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamsStateView {
    /// Commitment hash of the active receiver list.
    pub streams_hash: Hash256,
    /// Current tip of the history hash chain.
    pub history_hash: Hash256,
    /// Timestamp of the last configuration change.
    pub update_time: Timestamp,
    /// Max end of the active schedule.
    pub max_end: Timestamp,
    /// Balance remaining at `update_time`.
    pub balance: u128,
}

impl StreamsState {
    /// Snapshot the host-facing fields.
    pub fn view(&self) -> StreamsStateView {
        StreamsStateView {
            streams_hash: self.streams_hash,
            history_hash: self.history_hash,
            update_time: self.update_time,
            max_end: self.max_end,
            balance: self.balance,
        }
    }
}
