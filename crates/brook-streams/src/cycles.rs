//! Cycle arithmetic: streamed amounts, stream ranges, and delta bookkeeping.
//!
//! Time is partitioned into cycles of `cycle_secs` seconds. Cycle `C`
//! covers `[(C-1)*cycle_secs, C*cycle_secs)`; index 0 is reserved. A
//! stream of rate `r` over `[start, end)` is recorded as two delta entries
//! per boundary so that the running sum of `this_cycle` plus carried
//! `next_cycle` values, cycle by cycle, equals the exact receivable amount
//! of each cycle. This turns O(seconds) streams into O(1) bookkeeping per
//! schedule change.
//!
//! [`streamed_amt`] truncates fractional rates at every cycle boundary
//! with exactly the same rounding as [`add_delta`], so balances, cycle
//! receivables, and squeeze amounts always agree to the unit. Rounding
//! loss is below one asset unit per receiver per crossed boundary.

use std::collections::BTreeMap;

use brook_core::constants::RATE_PER_SEC_MULTIPLIER;
use brook_core::types::{CycleIdx, StreamReceiver, Timestamp};

use crate::state::{AmtDelta, StreamsState};

/// Cycle containing `timestamp`. Never returns the reserved index 0.
pub fn cycle_of(cycle_secs: u32, timestamp: Timestamp) -> CycleIdx {
    timestamp / cycle_secs + 1
}

/// Start of the cycle containing `timestamp`.
pub fn cycle_start(cycle_secs: u32, timestamp: Timestamp) -> Timestamp {
    timestamp - timestamp % cycle_secs
}

/// Amount streamed at `rate` over `[start, end)`, truncated per cycle
/// boundary.
///
/// The per-cycle truncation matches [`add_delta`], keeping the delta
/// ledger and direct range computations in exact agreement. Saturating
/// multiplication is used so that adversarially long ranges cannot wrap;
/// saturated values only ever occur above any balance the ledger accepts.
pub fn streamed_amt(cycle_secs: u32, rate: u128, start: Timestamp, end: Timestamp) -> u128 {
    if end <= start {
        return 0;
    }
    let cs = cycle_secs as u128;
    let ended_cycles = (end / cycle_secs - start / cycle_secs) as u128;
    let amt_per_cycle = cs * rate / RATE_PER_SEC_MULTIPLIER;
    ended_cycles
        .saturating_mul(amt_per_cycle)
        .saturating_add((end % cycle_secs) as u128 * rate / RATE_PER_SEC_MULTIPLIER)
        .saturating_sub((start % cycle_secs) as u128 * rate / RATE_PER_SEC_MULTIPLIER)
}

/// Effective `[start, end)` range of a receiver under a schedule updated
/// at `update_time` with the given `max_end`, clipped to
/// `[start_cap, end_cap)`.
///
/// A zero config start means "at the update time"; a zero duration means
/// "until `max_end`". Explicit ends are additionally clipped to `max_end`,
/// and nothing streams before `update_time`. Returns an empty range
/// (`start == end`) when the receiver is inactive in the window.
pub fn stream_range(
    receiver: &StreamReceiver,
    update_time: Timestamp,
    max_end: Timestamp,
    start_cap: Timestamp,
    end_cap: Timestamp,
) -> (Timestamp, Timestamp) {
    let config = &receiver.config;
    let mut start = if config.start == 0 { update_time } else { config.start };
    let end64 = if config.duration == 0 {
        max_end as u64
    } else {
        (start as u64 + config.duration as u64).min(max_end as u64)
    };
    if start < update_time {
        start = update_time;
    }
    if start < start_cap {
        start = start_cap;
    }
    let mut end = end64 as u32;
    if end > end_cap {
        end = end_cap;
    }
    if end < start {
        end = start;
    }
    (start, end)
}

/// Future `[start, end)` range of a receiver, i.e. clipped to `[now, ∞)`.
/// Used when replacing schedules: only effects from `now` on are touched.
pub fn stream_range_in_future(
    receiver: &StreamReceiver,
    update_time: Timestamp,
    max_end: Timestamp,
    now: Timestamp,
) -> (Timestamp, Timestamp) {
    stream_range(receiver, update_time, max_end, now, Timestamp::MAX)
}

/// Record a rate change taking effect at `timestamp`.
///
/// In a cycle fully covered by the stream, `cycle_secs * rate` is
/// streamed; in the part of the boundary cycle before `timestamp`,
/// `(timestamp % cycle_secs) * rate` is not. Splitting the entry into
/// `this_cycle`/`next_cycle` makes the running-sum walk exact.
fn add_delta(
    amt_deltas: &mut BTreeMap<CycleIdx, AmtDelta>,
    cycle_secs: u32,
    timestamp: Timestamp,
    amt_per_sec: i128,
) {
    let multiplier = RATE_PER_SEC_MULTIPLIER as i128;
    // |amt_per_sec| <= MAX_RATE_PER_SEC, so both products fit i128.
    let full_cycle = cycle_secs as i128 * amt_per_sec / multiplier;
    let next_cycle = (timestamp % cycle_secs) as i128 * amt_per_sec / multiplier;
    let delta = amt_deltas.entry(cycle_of(cycle_secs, timestamp)).or_default();
    delta.this_cycle += full_cycle - next_cycle;
    delta.next_cycle += next_cycle;
}

/// Apply a stream of `amt_per_sec` over `[start, end)` to a receiver's
/// delta ledger. Negative rates remove a previously recorded range.
///
/// For positive rates the receiver's next-receivable pointer is pulled
/// back to the range's first cycle if it has never been set or points
/// past it.
pub fn add_delta_range(
    state: &mut StreamsState,
    cycle_secs: u32,
    start: Timestamp,
    end: Timestamp,
    amt_per_sec: i128,
) {
    if start == end {
        return;
    }
    if amt_per_sec > 0 {
        let first_cycle = cycle_of(cycle_secs, start);
        if state.next_receivable_cycle == 0 || state.next_receivable_cycle > first_cycle {
            state.next_receivable_cycle = first_cycle;
        }
    }
    add_delta(&mut state.amt_deltas, cycle_secs, start, amt_per_sec);
    add_delta(&mut state.amt_deltas, cycle_secs, end, -amt_per_sec);
}

/// Remove a squeezed amount from the receivable of the cycle containing
/// `now`, leaving all later cycles untouched.
///
/// Equivalent to a one-second negative delta range at the cycle start,
/// but written directly on the entry so the amount (not a rate) never
/// passes through the fixed-point multiplier.
pub fn deduct_squeezed(state: &mut StreamsState, cycle_secs: u32, now: Timestamp, amount: u128) {
    let delta = state.amt_deltas.entry(cycle_of(cycle_secs, now)).or_default();
    delta.this_cycle -= amount as i128;
    delta.next_cycle += amount as i128;
}

/// Exact balance remaining at `timestamp` for a schedule of `receivers`
/// set at `update_time` with `last_balance` and the given `max_end`.
///
/// Callers guarantee `timestamp >= update_time`. The subtraction cannot
/// underflow: `max_end` was chosen so the schedule never commits more
/// than the funded balance.
pub fn calc_balance(
    cycle_secs: u32,
    last_balance: u128,
    receivers: &[StreamReceiver],
    update_time: Timestamp,
    max_end: Timestamp,
    timestamp: Timestamp,
) -> u128 {
    let mut balance = last_balance;
    for receiver in receivers {
        let (start, end) = stream_range(receiver, update_time, max_end, update_time, timestamp);
        balance = balance.saturating_sub(streamed_amt(
            cycle_secs,
            receiver.config.rate_per_sec,
            start,
            end,
        ));
    }
    balance
}
