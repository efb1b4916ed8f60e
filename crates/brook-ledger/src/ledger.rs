//! The combined ledger facade.

use tracing::debug;

use brook_core::error::LedgerError;
use brook_core::types::{AccountId, AssetId, Hash256, StreamReceiver, Timestamp};
use brook_splits::{SplitOutcome, SplitsEngine, SplitsReceiver};
use brook_streams::{
    ReceiveOutcome, SetStreamsOutcome, SqueezeOutcome, StreamsEngine, StreamsHistoryEntry,
    StreamsStateView,
};

/// One streams engine and one splits engine behind a single surface.
///
/// Streamed payouts land in the splits side as splittable balances; see
/// the crate docs for the flow.
#[derive(Debug)]
pub struct Ledger {
    streams: StreamsEngine,
    splits: SplitsEngine,
}

impl Ledger {
    /// Create a ledger with the given cycle length in seconds (at least 2).
    pub fn new(cycle_secs: u32) -> Self {
        Self { streams: StreamsEngine::new(cycle_secs), splits: SplitsEngine::new() }
    }

    /// Cycle length in seconds.
    pub fn cycle_secs(&self) -> u32 {
        self.streams.cycle_secs()
    }

    // ------------------------------------------------------------------
    // Streaming
    // ------------------------------------------------------------------

    /// Snapshot of an account's streams state for one asset. Hosts use it
    /// to build squeeze histories and to pass max-end hints.
    pub fn streams_state(&self, account: AccountId, asset: AssetId) -> StreamsStateView {
        self.streams.state(account, asset)
    }

    /// Replace an account's streaming schedule for one asset.
    ///
    /// The host settles the returned `applied_delta` in the underlying
    /// asset: positive means funds were taken in, negative means funds
    /// were paid back out.
    #[allow(clippy::too_many_arguments)]
    pub fn set_streams(
        &mut self,
        account: AccountId,
        asset: AssetId,
        curr_receivers: &[StreamReceiver],
        balance_delta: i128,
        new_receivers: &[StreamReceiver],
        now: Timestamp,
        end_hints: [Timestamp; 2],
    ) -> Result<SetStreamsOutcome, LedgerError> {
        let outcome = self.streams.set_streams(
            account,
            asset,
            curr_receivers,
            balance_delta,
            new_receivers,
            now,
            end_hints,
        )?;
        Ok(outcome)
    }

    /// Streaming balance remaining at `now`.
    pub fn balance_at(
        &self,
        account: AccountId,
        asset: AssetId,
        curr_receivers: &[StreamReceiver],
        now: Timestamp,
    ) -> Result<u128, LedgerError> {
        Ok(self.streams.balance_at(account, asset, curr_receivers, now)?)
    }

    /// Number of finished cycles with unreceived funds.
    pub fn receivable_cycles(&self, account: AccountId, asset: AssetId, now: Timestamp) -> u32 {
        self.streams.receivable_cycles(account, asset, now)
    }

    /// What a `receive` over at most `max_cycles` would credit.
    pub fn receivable(
        &self,
        account: AccountId,
        asset: AssetId,
        now: Timestamp,
        max_cycles: u32,
    ) -> u128 {
        self.streams.receivable(account, asset, now, max_cycles)
    }

    /// Receive streamed funds from finished cycles. The amount becomes
    /// splittable for the receiving account.
    pub fn receive(
        &mut self,
        account: AccountId,
        asset: AssetId,
        now: Timestamp,
        max_cycles: u32,
    ) -> ReceiveOutcome {
        let outcome = self.streams.receive(account, asset, now, max_cycles);
        self.splits.add_splittable(account, asset, outcome.amount);
        outcome
    }

    /// What a squeeze with the same arguments would credit.
    #[allow(clippy::too_many_arguments)]
    pub fn squeezable(
        &self,
        account: AccountId,
        asset: AssetId,
        sender: AccountId,
        history_start: Hash256,
        history: &[StreamsHistoryEntry],
        now: Timestamp,
    ) -> Result<SqueezeOutcome, LedgerError> {
        Ok(self.streams.squeezable(account, asset, sender, history_start, history, now)?)
    }

    /// Squeeze funds streamed by `sender` within the current cycle. The
    /// amount becomes splittable for the receiving account.
    #[allow(clippy::too_many_arguments)]
    pub fn squeeze(
        &mut self,
        account: AccountId,
        asset: AssetId,
        sender: AccountId,
        history_start: Hash256,
        history: &[StreamsHistoryEntry],
        now: Timestamp,
    ) -> Result<SqueezeOutcome, LedgerError> {
        let outcome =
            self.streams.squeeze(account, asset, sender, history_start, history, now)?;
        self.splits.add_splittable(account, asset, outcome.amount);
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Splitting
    // ------------------------------------------------------------------

    /// Commitment hash of an account's splits configuration.
    pub fn splits_hash(&self, account: AccountId) -> Hash256 {
        self.splits.splits_hash(account)
    }

    /// Replace an account's splits configuration.
    pub fn set_splits(
        &mut self,
        account: AccountId,
        receivers: &[SplitsReceiver],
    ) -> Result<(), LedgerError> {
        Ok(self.splits.set_splits(account, receivers)?)
    }

    /// Received funds not yet split.
    pub fn splittable(&self, account: AccountId, asset: AssetId) -> u128 {
        self.splits.splittable(account, asset)
    }

    /// Divide an account's splittable balance among its splits receivers.
    pub fn split(
        &mut self,
        account: AccountId,
        asset: AssetId,
        curr_receivers: &[SplitsReceiver],
    ) -> Result<SplitOutcome, LedgerError> {
        Ok(self.splits.split(account, asset, curr_receivers)?)
    }

    /// Deposit funds straight into `to`'s splittable balance. `from` is
    /// the paying account; the ledger records it only for tracing, custody
    /// is the host's concern.
    pub fn give(
        &mut self,
        from: AccountId,
        to: AccountId,
        asset: AssetId,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.splits.give(to, asset, amount)?;
        debug!(from = %from, to = %to, asset = %asset, amount, "ledger: give");
        Ok(())
    }

    /// The account's own share, ready for withdrawal.
    pub fn collectable(&self, account: AccountId, asset: AssetId) -> u128 {
        self.splits.collectable(account, asset)
    }

    /// Withdraw the collectable balance. The host pays the returned
    /// amount out in the underlying asset.
    pub fn collect(&mut self, account: AccountId, asset: AssetId) -> u128 {
        self.splits.collect(account, asset)
    }
}
