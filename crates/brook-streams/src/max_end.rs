//! Max-end calculation: the latest timestamp at which a balance still
//! fully funds a schedule.
//!
//! Receivers with an explicit duration have a fixed end; receivers with
//! `duration == 0` ("default end") end exactly at the candidate timestamp
//! being tested, coupling their contribution to the search itself. The
//! default-end receivers are collected through a min-heap keyed by start
//! time and drained into a start-sorted table with prefix sums of rate
//! and rate·start, so each feasibility probe costs
//! `O(n_fixed + log n_default)` instead of a full rescan, and the binary
//! search over `[now, u32::MAX]` stays `O(log(range))` probes.
//!
//! Probes use seconds-exact arithmetic (one truncating division per
//! group), which never undercounts the cycle-truncated amounts actually
//! debited later; the result is therefore conservative: the schedule is
//! guaranteed funded through the returned timestamp.
//!
//! Caller-supplied hints only narrow the search bracket. A wrong hint
//! costs extra probes, never a different result.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use brook_core::constants::RATE_PER_SEC_MULTIPLIER;
use brook_core::types::{StreamReceiver, Timestamp};

/// A receiver span with a fixed end, clipped to start no earlier than the
/// update time. Rates are fixed-point per second.
#[derive(Clone, Copy, Debug)]
struct FixedSpan {
    start: Timestamp,
    end: Timestamp,
    rate: u128,
}

/// Start-sorted default-end receivers with prefix aggregates.
///
/// `rate_sum[i]` and `rate_start_sum[i]` cover the first `i` entries, so
/// the committed amount of every default-end receiver active at `T` is
/// `T * rate_sum[k] - rate_start_sum[k]` for the partition point `k`.
#[derive(Debug, Default)]
struct DefaultEnds {
    starts: Vec<Timestamp>,
    rate_sum: Vec<u128>,
    rate_start_sum: Vec<u128>,
}

impl DefaultEnds {
    /// Drain a min-heap of `(start, rate)` candidates into sorted order
    /// and build the prefix aggregates.
    fn from_heap(mut heap: BinaryHeap<Reverse<(Timestamp, u128)>>) -> Self {
        let mut table = Self {
            starts: Vec::with_capacity(heap.len()),
            rate_sum: Vec::with_capacity(heap.len() + 1),
            rate_start_sum: Vec::with_capacity(heap.len() + 1),
        };
        table.rate_sum.push(0);
        table.rate_start_sum.push(0);
        while let Some(Reverse((start, rate))) = heap.pop() {
            let rate_sum = table.rate_sum.last().copied().unwrap_or(0);
            let rate_start_sum = table.rate_start_sum.last().copied().unwrap_or(0);
            table.starts.push(start);
            table.rate_sum.push(rate_sum.saturating_add(rate));
            table
                .rate_start_sum
                .push(rate_start_sum.saturating_add(rate.saturating_mul(start as u128)));
        }
        table
    }

    /// Multiplier-scaled amount committed by receivers with `start <= at`.
    fn committed_scaled(&self, at: Timestamp) -> u128 {
        let k = self.starts.partition_point(|&start| start <= at);
        (at as u128)
            .saturating_mul(self.rate_sum[k])
            .saturating_sub(self.rate_start_sum[k])
    }

    fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Compute the max end for `balance` over a validated receiver list, as
/// of `now`. Hints with value 0 are ignored; other hints seed the search.
///
/// Returns `now` when nothing can stream (no receivers active at or after
/// `now`, or a zero balance).
pub fn calc_max_end(
    balance: u128,
    receivers: &[StreamReceiver],
    now: Timestamp,
    end_hints: [Timestamp; 2],
) -> Timestamp {
    let mut fixed = Vec::new();
    let mut default_heap = BinaryHeap::new();
    for receiver in receivers {
        let config = &receiver.config;
        let start = if config.start == 0 { now } else { config.start.max(now) };
        if config.duration == 0 {
            default_heap.push(Reverse((start, config.rate_per_sec)));
        } else {
            let config_start = if config.start == 0 { now } else { config.start };
            let end = (config_start as u64 + config.duration as u64).min(Timestamp::MAX as u64)
                as Timestamp;
            if end > start {
                fixed.push(FixedSpan { start, end, rate: config.rate_per_sec });
            }
        }
    }
    let defaults = DefaultEnds::from_heap(default_heap);
    if balance == 0 || (fixed.is_empty() && defaults.is_empty()) {
        return now;
    }

    let balance_scaled = balance.saturating_mul(RATE_PER_SEC_MULTIPLIER);
    let is_enough = |at: Timestamp| -> bool {
        let mut committed = defaults.committed_scaled(at);
        for span in &fixed {
            if span.start >= at {
                continue;
            }
            let end = span.end.min(at);
            committed = committed
                .saturating_add(span.rate.saturating_mul((end - span.start) as u128));
            if committed > balance_scaled {
                return false;
            }
        }
        committed <= balance_scaled
    };

    let mut lo = now;
    let mut hi = Timestamp::MAX;
    if is_enough(hi) {
        return hi;
    }
    // Hints narrow the bracket when they happen to be right.
    for &hint in &end_hints {
        if hint > lo && hint < hi {
            if is_enough(hint) {
                lo = hint;
            } else {
                hi = hint - 1;
            }
        }
    }
    // Invariant: is_enough(lo), !is_enough(hi + 1).
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        if is_enough(mid) {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}
