//! The streams engine: schedule changes, receivable settlement, squeezing.
//!
//! All state is keyed by `(account, asset)`. Every mutation takes the
//! caller's clock as an explicit `now`; the engine only requires it to
//! never move backwards per slot.

use std::collections::HashMap;

use tracing::debug;

use brook_core::commitment::{hash_history, hash_stream_receivers};
use brook_core::constants::MAX_TOTAL_BALANCE;
use brook_core::error::StreamsError;
use brook_core::receivers::validate_stream_receivers;
use brook_core::types::{AccountId, AssetId, Hash256, StreamReceiver, Timestamp};

use crate::cycles::{
    add_delta_range, calc_balance, cycle_of, cycle_start, deduct_squeezed,
    stream_range_in_future,
};
use crate::max_end::calc_max_end;
use crate::squeeze::{squeezed_amt, verify_history, StreamsHistoryEntry};
use crate::state::{StreamsState, StreamsStateView};

/// Result of a schedule change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetStreamsOutcome {
    /// Stored balance after the change.
    pub new_balance: u128,
    /// Actually applied balance change. Smaller in magnitude than the
    /// requested delta when a withdrawal exceeded the remaining balance.
    pub applied_delta: i128,
    /// Max end of the new schedule.
    pub max_end: Timestamp,
}

/// Result of receiving finished cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiveOutcome {
    /// Amount credited.
    pub amount: u128,
    /// Finished cycles still unreceived after this call.
    pub cycles_left: u32,
}

/// Result of squeezing a sender's current-cycle funds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SqueezeOutcome {
    /// Amount credited.
    pub amount: u128,
    /// Timestamp up to which this sender is now squeezed.
    pub next_squeezed: Timestamp,
}

/// In-memory streams ledger for all `(account, asset)` slots.
#[derive(Debug)]
pub struct StreamsEngine {
    cycle_secs: u32,
    states: HashMap<(AccountId, AssetId), StreamsState>,
    total_balances: HashMap<AssetId, u128>,
}

impl StreamsEngine {
    /// Create an engine with the given cycle length in seconds.
    ///
    /// Cycle length is a deployment constant; changing it would silently
    /// re-bucket every stored delta. Must be at least 2 so that a cycle
    /// boundary and a mid-cycle timestamp can be distinct.
    pub fn new(cycle_secs: u32) -> Self {
        assert!(cycle_secs > 1, "cycle_secs must be greater than 1");
        Self { cycle_secs, states: HashMap::new(), total_balances: HashMap::new() }
    }

    /// Cycle length in seconds.
    pub fn cycle_secs(&self) -> u32 {
        self.cycle_secs
    }

    /// Snapshot of one slot's host-facing state.
    pub fn state(&self, account: AccountId, asset: AssetId) -> StreamsStateView {
        self.states.get(&(account, asset)).map(StreamsState::view).unwrap_or_else(|| {
            StreamsState::default().view()
        })
    }

    /// Sum of all stored stream balances for one asset.
    pub fn total_balance(&self, asset: AssetId) -> u128 {
        self.total_balances.get(&asset).copied().unwrap_or(0)
    }

    /// Replace `account`'s schedule for `asset`.
    ///
    /// `curr_receivers` must be the full list currently committed to.
    /// `balance_delta` adds to or withdraws from the remaining balance;
    /// a withdrawal is clamped to what is left, and `i128::MIN` drains
    /// the slot. Hints seed the max-end search and never change results.
    pub fn set_streams(
        &mut self,
        account: AccountId,
        asset: AssetId,
        curr_receivers: &[StreamReceiver],
        balance_delta: i128,
        new_receivers: &[StreamReceiver],
        now: Timestamp,
        end_hints: [Timestamp; 2],
    ) -> Result<SetStreamsOutcome, StreamsError> {
        validate_stream_receivers(new_receivers)?;
        let old = self.state(account, asset);
        if hash_stream_receivers(curr_receivers) != old.streams_hash {
            return Err(StreamsError::InvalidCurrentList);
        }
        if now < old.update_time {
            return Err(StreamsError::TimestampTooEarly {
                timestamp: now,
                update_time: old.update_time,
            });
        }

        let last_balance = calc_balance(
            self.cycle_secs,
            old.balance,
            curr_receivers,
            old.update_time,
            old.max_end,
            now,
        );
        let new_balance = if balance_delta >= 0 {
            last_balance.saturating_add(balance_delta as u128)
        } else {
            // i128::MIN drains everything through the same clamp.
            last_balance.saturating_sub(balance_delta.unsigned_abs())
        };
        let total = self
            .total_balance(asset)
            .saturating_sub(old.balance)
            .saturating_add(new_balance);
        if total > MAX_TOTAL_BALANCE {
            return Err(StreamsError::BalanceTooHigh { total, max: MAX_TOTAL_BALANCE });
        }
        let applied_delta = new_balance as i128 - last_balance as i128;

        let new_max_end = calc_max_end(new_balance, new_receivers, now, end_hints);
        self.update_receiver_states(
            asset,
            curr_receivers,
            old.update_time,
            old.max_end,
            new_receivers,
            new_max_end,
            now,
        );

        let new_hash = hash_stream_receivers(new_receivers);
        let state = self.states.entry((account, asset)).or_default();
        state.streams_hash = new_hash;
        state.history_hash = hash_history(old.history_hash, new_hash, now, new_max_end);
        state.update_time = now;
        state.max_end = new_max_end;
        state.balance = new_balance;
        self.total_balances.insert(asset, total);

        debug!(
            account = %account,
            asset = %asset,
            now,
            new_balance,
            applied_delta,
            max_end = new_max_end,
            receivers = new_receivers.len(),
            "streams: schedule updated",
        );
        Ok(SetStreamsOutcome { new_balance, applied_delta, max_end: new_max_end })
    }

    /// Apply the delta-ledger difference between the old and new schedule
    /// to every affected receiver, touching only effects from `now` on.
    ///
    /// Both lists are in canonical order, so a single merge pass pairs up
    /// unchanged entries; a receiver kept with an identical effective
    /// range is skipped entirely.
    #[allow(clippy::too_many_arguments)]
    fn update_receiver_states(
        &mut self,
        asset: AssetId,
        curr: &[StreamReceiver],
        curr_update_time: Timestamp,
        curr_max_end: Timestamp,
        new: &[StreamReceiver],
        new_max_end: Timestamp,
        now: Timestamp,
    ) {
        let cycle_secs = self.cycle_secs;
        let mut apply = |states: &mut HashMap<(AccountId, AssetId), StreamsState>,
                         receiver: &StreamReceiver,
                         start: Timestamp,
                         end: Timestamp,
                         sign: i128| {
            if start == end {
                return;
            }
            let state = states.entry((receiver.account_id, asset)).or_default();
            let rate = receiver.config.rate_per_sec as i128;
            add_delta_range(state, cycle_secs, start, end, sign * rate);
        };

        let mut ci = 0;
        let mut ni = 0;
        while ci < curr.len() || ni < new.len() {
            let curr_key = curr.get(ci).map(|r| (r.account_id, r.config));
            let new_key = new.get(ni).map(|r| (r.account_id, r.config));
            match (curr_key, new_key) {
                (Some(c), Some(n)) if c == n => {
                    let receiver = &curr[ci];
                    let old_range =
                        stream_range_in_future(receiver, curr_update_time, curr_max_end, now);
                    let new_range = stream_range_in_future(receiver, now, new_max_end, now);
                    if old_range != new_range {
                        apply(&mut self.states, receiver, old_range.0, old_range.1, -1);
                        apply(&mut self.states, receiver, new_range.0, new_range.1, 1);
                    }
                    ci += 1;
                    ni += 1;
                }
                (Some(c), n) if n.is_none() || Some(c) < n => {
                    let receiver = &curr[ci];
                    let (start, end) =
                        stream_range_in_future(receiver, curr_update_time, curr_max_end, now);
                    apply(&mut self.states, receiver, start, end, -1);
                    ci += 1;
                }
                _ => {
                    let receiver = &new[ni];
                    let (start, end) = stream_range_in_future(receiver, now, new_max_end, now);
                    apply(&mut self.states, receiver, start, end, 1);
                    ni += 1;
                }
            }
        }
    }

    /// Balance remaining at `now` under the committed schedule.
    pub fn balance_at(
        &self,
        account: AccountId,
        asset: AssetId,
        curr_receivers: &[StreamReceiver],
        now: Timestamp,
    ) -> Result<u128, StreamsError> {
        let state = self.state(account, asset);
        if hash_stream_receivers(curr_receivers) != state.streams_hash {
            return Err(StreamsError::InvalidCurrentList);
        }
        if now < state.update_time {
            return Err(StreamsError::TimestampTooEarly {
                timestamp: now,
                update_time: state.update_time,
            });
        }
        Ok(calc_balance(
            self.cycle_secs,
            state.balance,
            curr_receivers,
            state.update_time,
            state.max_end,
            now,
        ))
    }

    /// Number of finished cycles with unreceived funds.
    pub fn receivable_cycles(&self, account: AccountId, asset: AssetId, now: Timestamp) -> u32 {
        match self.states.get(&(account, asset)) {
            Some(state) if state.next_receivable_cycle != 0 => {
                cycle_of(self.cycle_secs, now).saturating_sub(state.next_receivable_cycle)
            }
            _ => 0,
        }
    }

    /// Amount a `receive` over at most `max_cycles` would credit, without
    /// mutating anything.
    pub fn receivable(
        &self,
        account: AccountId,
        asset: AssetId,
        now: Timestamp,
        max_cycles: u32,
    ) -> u128 {
        let Some(state) = self.states.get(&(account, asset)) else { return 0 };
        let (from, to) = self.receive_span(state, now, max_cycles);
        let mut amt_per_cycle = 0i128;
        let mut received = 0i128;
        for cycle in from..to {
            if let Some(delta) = state.amt_deltas.get(&cycle) {
                amt_per_cycle += delta.this_cycle;
                received += amt_per_cycle;
                amt_per_cycle += delta.next_cycle;
            } else {
                received += amt_per_cycle;
            }
        }
        // Receivables are sums of funded positive ranges, never negative.
        received.max(0) as u128
    }

    /// Receive funds from up to `max_cycles` finished cycles.
    ///
    /// Consumed delta entries are deleted and the running carry is folded
    /// into the first unreceived cycle, so receiving in batches credits
    /// exactly what one big receive would.
    pub fn receive(
        &mut self,
        account: AccountId,
        asset: AssetId,
        now: Timestamp,
        max_cycles: u32,
    ) -> ReceiveOutcome {
        let cycle_secs = self.cycle_secs;
        let Some(state) = self.states.get_mut(&(account, asset)) else {
            return ReceiveOutcome { amount: 0, cycles_left: 0 };
        };
        let (from, to) = Self::receive_span_of(cycle_secs, state, now, max_cycles);
        if from == 0 {
            return ReceiveOutcome { amount: 0, cycles_left: 0 };
        }
        let cycles_left = cycle_of(cycle_secs, now).saturating_sub(to);
        if from >= to {
            return ReceiveOutcome { amount: 0, cycles_left };
        }
        let mut amt_per_cycle = 0i128;
        let mut received = 0i128;
        for cycle in from..to {
            if let Some(delta) = state.amt_deltas.remove(&cycle) {
                amt_per_cycle += delta.this_cycle;
                received += amt_per_cycle;
                amt_per_cycle += delta.next_cycle;
            } else {
                received += amt_per_cycle;
            }
        }
        state.next_receivable_cycle = to;
        if amt_per_cycle != 0 {
            state.amt_deltas.entry(to).or_default().this_cycle += amt_per_cycle;
        }
        let amount = received.max(0) as u128;
        debug!(
            account = %account,
            asset = %asset,
            now,
            amount,
            cycles = to - from,
            cycles_left,
            "streams: received cycles",
        );
        ReceiveOutcome { amount, cycles_left }
    }

    fn receive_span(
        &self,
        state: &StreamsState,
        now: Timestamp,
        max_cycles: u32,
    ) -> (u32, u32) {
        Self::receive_span_of(self.cycle_secs, state, now, max_cycles)
    }

    /// `[from, to)` cycle span a receive would consume. Only finished
    /// cycles are ever in the span.
    fn receive_span_of(
        cycle_secs: u32,
        state: &StreamsState,
        now: Timestamp,
        max_cycles: u32,
    ) -> (u32, u32) {
        let from = state.next_receivable_cycle;
        if from == 0 {
            return (0, 0);
        }
        let finished = cycle_of(cycle_secs, now);
        let to = from.saturating_add(max_cycles).min(finished).max(from);
        (from, to)
    }

    /// What a squeeze with the same arguments would credit, without
    /// mutating anything.
    #[allow(clippy::too_many_arguments)]
    pub fn squeezable(
        &self,
        account: AccountId,
        asset: AssetId,
        sender: AccountId,
        history_start: Hash256,
        history: &[StreamsHistoryEntry],
        now: Timestamp,
    ) -> Result<SqueezeOutcome, StreamsError> {
        verify_history(history_start, history, self.state(sender, asset).history_hash)?;
        let start_cap = self.squeeze_start_cap(account, asset, sender, now);
        let amount = self.squeeze_history_amt(account, history, start_cap, now);
        Ok(SqueezeOutcome { amount, next_squeezed: now })
    }

    /// Collect funds `sender` streamed to `account` within the current,
    /// unfinished cycle.
    ///
    /// `history` must replay the sender's configuration history from the
    /// `history_start` link to the current tip; entries whose receiver
    /// lists are withheld (`Skipped`) verify but contribute nothing. The
    /// squeezed amount is deducted from the current cycle's receivable so
    /// a later `receive` cannot pay it twice.
    #[allow(clippy::too_many_arguments)]
    pub fn squeeze(
        &mut self,
        account: AccountId,
        asset: AssetId,
        sender: AccountId,
        history_start: Hash256,
        history: &[StreamsHistoryEntry],
        now: Timestamp,
    ) -> Result<SqueezeOutcome, StreamsError> {
        verify_history(history_start, history, self.state(sender, asset).history_hash)?;
        let start_cap = self.squeeze_start_cap(account, asset, sender, now);
        let amount = self.squeeze_history_amt(account, history, start_cap, now);

        let cycle_secs = self.cycle_secs;
        let state = self.states.entry((account, asset)).or_default();
        state.next_squeezed.insert(sender, now);
        if amount > 0 {
            deduct_squeezed(state, cycle_secs, now, amount);
        }
        debug!(
            account = %account,
            asset = %asset,
            sender = %sender,
            now,
            amount,
            "streams: squeezed",
        );
        Ok(SqueezeOutcome { amount, next_squeezed: now })
    }

    /// Start of the still-unsqueezed window for `(account, sender)`:
    /// the current cycle start, or later if part of the cycle has already
    /// been squeezed from this sender.
    fn squeeze_start_cap(
        &self,
        account: AccountId,
        asset: AssetId,
        sender: AccountId,
        now: Timestamp,
    ) -> Timestamp {
        let cycle_begin = cycle_start(self.cycle_secs, now);
        self.states
            .get(&(account, asset))
            .and_then(|state| state.next_squeezed.get(&sender).copied())
            .map_or(cycle_begin, |squeezed| squeezed.max(cycle_begin))
    }

    /// Walk `history` newest-first, tightening the end cap to each older
    /// entry's update time, and sum the target's squeezable amounts.
    fn squeeze_history_amt(
        &self,
        account: AccountId,
        history: &[StreamsHistoryEntry],
        start_cap: Timestamp,
        now: Timestamp,
    ) -> u128 {
        let mut amount = 0u128;
        let mut end_cap = now;
        for entry in history.iter().rev() {
            if end_cap <= start_cap {
                break;
            }
            if let StreamsHistoryEntry::Full { receivers, update_time, max_end } = entry {
                amount += squeezed_amt(
                    self.cycle_secs,
                    receivers,
                    *update_time,
                    *max_end,
                    account,
                    start_cap,
                    end_cap,
                );
            }
            end_cap = end_cap.min(entry.update_time());
        }
        amount
    }
}
