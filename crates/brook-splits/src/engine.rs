//! The splits engine: splittable balances, weighted division, collection.
//!
//! Only the commitment hash of an account's splits configuration is
//! stored; callers resupply the full list when splitting and it is
//! verified first. The configuration is per account, shared by all
//! assets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use brook_core::constants::{MAX_TOTAL_BALANCE, TOTAL_SPLITS_WEIGHT};
use brook_core::error::SplitsError;
use brook_core::types::{AccountId, AssetId, Hash256};

use crate::receivers::{hash_splits_receivers, validate_splits_receivers, SplitsReceiver};

/// Balances of one `(account, asset)` slot.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct SplitsBalance {
    /// Received but not yet divided among the splits receivers.
    pub splittable: u128,
    /// The account's own share, ready to leave the ledger.
    pub collectable: u128,
}

/// Result of dividing a splittable balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Amount kept by the account as collectable.
    pub collectable: u128,
    /// Amount forwarded to the splits receivers.
    pub split: u128,
}

/// In-memory splits ledger for all accounts.
#[derive(Debug, Default)]
pub struct SplitsEngine {
    splits_hashes: HashMap<AccountId, Hash256>,
    balances: HashMap<(AccountId, AssetId), SplitsBalance>,
    total_balances: HashMap<AssetId, u128>,
}

impl SplitsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commitment hash of `account`'s splits configuration.
    /// [`Hash256::ZERO`] when none was ever set.
    pub fn splits_hash(&self, account: AccountId) -> Hash256 {
        self.splits_hashes.get(&account).copied().unwrap_or(Hash256::ZERO)
    }

    /// Balances of one slot.
    pub fn balance(&self, account: AccountId, asset: AssetId) -> SplitsBalance {
        self.balances.get(&(account, asset)).copied().unwrap_or_default()
    }

    /// Received funds not yet split.
    pub fn splittable(&self, account: AccountId, asset: AssetId) -> u128 {
        self.balance(account, asset).splittable
    }

    /// The account's own share, ready for withdrawal.
    pub fn collectable(&self, account: AccountId, asset: AssetId) -> u128 {
        self.balance(account, asset).collectable
    }

    /// Sum of all splittable and collectable balances for one asset.
    pub fn total_balance(&self, asset: AssetId) -> u128 {
        self.total_balances.get(&asset).copied().unwrap_or(0)
    }

    /// Replace `account`'s splits configuration.
    ///
    /// Takes effect for future splits only; an already splittable balance
    /// is divided by whatever configuration is active when `split` runs.
    pub fn set_splits(
        &mut self,
        account: AccountId,
        receivers: &[SplitsReceiver],
    ) -> Result<(), SplitsError> {
        validate_splits_receivers(receivers)?;
        let hash = hash_splits_receivers(receivers);
        self.splits_hashes.insert(account, hash);
        debug!(
            account = %account,
            receivers = receivers.len(),
            hash = %hash,
            "splits: configuration updated",
        );
        Ok(())
    }

    /// Deposit `amount` into `account`'s splittable balance from outside
    /// the ledger.
    pub fn give(
        &mut self,
        account: AccountId,
        asset: AssetId,
        amount: u128,
    ) -> Result<(), SplitsError> {
        let total = self.total_balance(asset).saturating_add(amount);
        if total > MAX_TOTAL_BALANCE {
            return Err(SplitsError::BalanceTooHigh { total, max: MAX_TOTAL_BALANCE });
        }
        self.total_balances.insert(asset, total);
        self.balances.entry((account, asset)).or_default().splittable += amount;
        debug!(account = %account, asset = %asset, amount, "splits: funds given");
        Ok(())
    }

    /// Credit funds that already live in the ledger (streamed and then
    /// received or squeezed) to `account`'s splittable balance.
    ///
    /// Unlike [`give`](Self::give) this is not a host deposit, so it is
    /// not rejected at the balance cap; the amount still counts into the
    /// per-asset total so `collect` keeps the total exact.
    pub fn add_splittable(&mut self, account: AccountId, asset: AssetId, amount: u128) {
        if amount == 0 {
            return;
        }
        let total = self.total_balance(asset).saturating_add(amount);
        self.total_balances.insert(asset, total);
        self.balances.entry((account, asset)).or_default().splittable += amount;
    }

    /// Divide `account`'s splittable balance among its splits receivers.
    ///
    /// Shares are allocated by cumulative weight with floor rounding, so
    /// the same balance and configuration always produce the same shares
    /// and the rounding loss stays with the account, never a receiver.
    /// The splittable balance is zeroed before receivers are credited, so
    /// an account splitting to itself sees the returned share as new
    /// splittable funds.
    pub fn split(
        &mut self,
        account: AccountId,
        asset: AssetId,
        curr_receivers: &[SplitsReceiver],
    ) -> Result<SplitOutcome, SplitsError> {
        if hash_splits_receivers(curr_receivers) != self.splits_hash(account) {
            return Err(SplitsError::InvalidCurrentSplits);
        }
        let slot = self.balances.entry((account, asset)).or_default();
        let splittable = slot.splittable;
        slot.splittable = 0;

        let mut split = 0u128;
        let mut cumulative_weight = 0u64;
        for receiver in curr_receivers {
            cumulative_weight += receiver.weight as u64;
            // Cumulative floors make per-receiver shares order-independent
            // of how the rounding dust falls.
            let share =
                splittable * cumulative_weight as u128 / TOTAL_SPLITS_WEIGHT as u128 - split;
            split += share;
            self.balances.entry((receiver.account_id, asset)).or_default().splittable += share;
        }
        let collectable = splittable - split;
        let slot = self.balances.entry((account, asset)).or_default();
        slot.collectable += collectable;

        debug!(
            account = %account,
            asset = %asset,
            splittable,
            split,
            collectable,
            "splits: balance divided",
        );
        Ok(SplitOutcome { collectable, split })
    }

    /// Withdraw `account`'s collectable balance. Returns the amount, which
    /// leaves the ledger.
    pub fn collect(&mut self, account: AccountId, asset: AssetId) -> u128 {
        let Some(slot) = self.balances.get_mut(&(account, asset)) else { return 0 };
        let amount = slot.collectable;
        slot.collectable = 0;
        if let Some(total) = self.total_balances.get_mut(&asset) {
            *total = total.saturating_sub(amount);
        }
        debug!(account = %account, asset = %asset, amount, "splits: collected");
        amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brook_core::constants::MAX_SPLITS_RECEIVERS;

    const ASSET: AssetId = AssetId(1);

    fn rcv(account: u64, weight: u32) -> SplitsReceiver {
        SplitsReceiver::new(AccountId(account), weight)
    }

    // ------------------------------------------------------------------
    // set_splits and give
    // ------------------------------------------------------------------

    #[test]
    fn fresh_account_has_zero_everything() {
        let eng = SplitsEngine::new();
        assert_eq!(eng.splits_hash(AccountId(1)), Hash256::ZERO);
        assert_eq!(eng.splittable(AccountId(1), ASSET), 0);
        assert_eq!(eng.collectable(AccountId(1), ASSET), 0);
    }

    #[test]
    fn set_splits_stores_the_hash() {
        let mut eng = SplitsEngine::new();
        let receivers = vec![rcv(2, 500_000)];
        eng.set_splits(AccountId(1), &receivers).unwrap();
        assert_eq!(eng.splits_hash(AccountId(1)), hash_splits_receivers(&receivers));
    }

    #[test]
    fn set_splits_rejects_invalid_lists() {
        let mut eng = SplitsEngine::new();
        assert!(eng.set_splits(AccountId(1), &[rcv(1, 0)]).is_err());
        assert_eq!(eng.splits_hash(AccountId(1)), Hash256::ZERO);
    }

    #[test]
    fn give_credits_splittable() {
        let mut eng = SplitsEngine::new();
        eng.give(AccountId(1), ASSET, 100).unwrap();
        eng.give(AccountId(1), ASSET, 20).unwrap();
        assert_eq!(eng.splittable(AccountId(1), ASSET), 120);
        assert_eq!(eng.total_balance(ASSET), 120);
    }

    #[test]
    fn internal_credits_count_into_the_total() {
        let mut eng = SplitsEngine::new();
        eng.give(AccountId(1), ASSET, 100).unwrap();
        eng.add_splittable(AccountId(2), ASSET, 50);
        assert_eq!(eng.total_balance(ASSET), 150);

        // Collecting the credited funds leaves the deposit fully tracked.
        eng.split(AccountId(2), ASSET, &[]).unwrap();
        assert_eq!(eng.collect(AccountId(2), ASSET), 50);
        assert_eq!(eng.total_balance(ASSET), 100);
        assert_eq!(eng.splittable(AccountId(1), ASSET), 100);
    }

    #[test]
    fn give_enforces_the_balance_cap() {
        let mut eng = SplitsEngine::new();
        eng.give(AccountId(1), ASSET, MAX_TOTAL_BALANCE).unwrap();
        let err = eng.give(AccountId(2), ASSET, 1).unwrap_err();
        assert!(matches!(err, SplitsError::BalanceTooHigh { .. }));
        // Other assets are unaffected.
        assert!(eng.give(AccountId(2), AssetId(9), 1).is_ok());
    }

    // ------------------------------------------------------------------
    // split
    // ------------------------------------------------------------------

    #[test]
    fn split_divides_by_weight() {
        let mut eng = SplitsEngine::new();
        let receivers = vec![rcv(2, 400_000), rcv(3, 600_000)];
        eng.set_splits(AccountId(1), &receivers).unwrap();
        eng.give(AccountId(1), ASSET, 10).unwrap();

        let out = eng.split(AccountId(1), ASSET, &receivers).unwrap();
        assert_eq!(out, SplitOutcome { collectable: 0, split: 10 });
        assert_eq!(eng.splittable(AccountId(2), ASSET), 4);
        assert_eq!(eng.splittable(AccountId(3), ASSET), 6);
        assert_eq!(eng.splittable(AccountId(1), ASSET), 0);
    }

    #[test]
    fn split_requires_the_current_list() {
        let mut eng = SplitsEngine::new();
        let receivers = vec![rcv(2, 500_000)];
        eng.set_splits(AccountId(1), &receivers).unwrap();
        let err = eng.split(AccountId(1), ASSET, &[]).unwrap_err();
        assert_eq!(err, SplitsError::InvalidCurrentSplits);
    }

    #[test]
    fn unconfigured_account_keeps_everything() {
        let mut eng = SplitsEngine::new();
        eng.give(AccountId(1), ASSET, 55).unwrap();
        let out = eng.split(AccountId(1), ASSET, &[]).unwrap();
        assert_eq!(out, SplitOutcome { collectable: 55, split: 0 });
        assert_eq!(eng.collectable(AccountId(1), ASSET), 55);
    }

    #[test]
    fn partial_weights_leave_a_remainder() {
        let mut eng = SplitsEngine::new();
        let receivers = vec![rcv(2, 250_000)];
        eng.set_splits(AccountId(1), &receivers).unwrap();
        eng.give(AccountId(1), ASSET, 100).unwrap();

        let out = eng.split(AccountId(1), ASSET, &receivers).unwrap();
        assert_eq!(out, SplitOutcome { collectable: 75, split: 25 });
    }

    #[test]
    fn rounding_dust_stays_with_the_account() {
        let mut eng = SplitsEngine::new();
        // Three thirds that do not quite cover the total.
        let receivers = vec![rcv(2, 333_333), rcv(3, 333_333), rcv(4, 333_333)];
        eng.set_splits(AccountId(1), &receivers).unwrap();
        eng.give(AccountId(1), ASSET, 100).unwrap();

        let out = eng.split(AccountId(1), ASSET, &receivers).unwrap();
        assert_eq!(eng.splittable(AccountId(2), ASSET), 33);
        assert_eq!(eng.splittable(AccountId(3), ASSET), 33);
        assert_eq!(eng.splittable(AccountId(4), ASSET), 33);
        assert_eq!(out, SplitOutcome { collectable: 1, split: 99 });
    }

    #[test]
    fn tiny_amounts_split_to_nothing() {
        let mut eng = SplitsEngine::new();
        let receivers = vec![rcv(2, 1)];
        eng.set_splits(AccountId(1), &receivers).unwrap();
        eng.give(AccountId(1), ASSET, 10).unwrap();

        let out = eng.split(AccountId(1), ASSET, &receivers).unwrap();
        assert_eq!(out, SplitOutcome { collectable: 10, split: 0 });
    }

    #[test]
    fn split_twice_is_a_noop_the_second_time() {
        let mut eng = SplitsEngine::new();
        let receivers = vec![rcv(2, 500_000)];
        eng.set_splits(AccountId(1), &receivers).unwrap();
        eng.give(AccountId(1), ASSET, 10).unwrap();

        eng.split(AccountId(1), ASSET, &receivers).unwrap();
        let again = eng.split(AccountId(1), ASSET, &receivers).unwrap();
        assert_eq!(again, SplitOutcome { collectable: 0, split: 0 });
    }

    #[test]
    fn self_split_re_enters_splittable() {
        let mut eng = SplitsEngine::new();
        let receivers = vec![rcv(1, 500_000)];
        eng.set_splits(AccountId(1), &receivers).unwrap();
        eng.give(AccountId(1), ASSET, 100).unwrap();

        let out = eng.split(AccountId(1), ASSET, &receivers).unwrap();
        assert_eq!(out, SplitOutcome { collectable: 50, split: 50 });
        // The self-share is splittable again.
        assert_eq!(eng.splittable(AccountId(1), ASSET), 50);
        let out = eng.split(AccountId(1), ASSET, &receivers).unwrap();
        assert_eq!(out, SplitOutcome { collectable: 25, split: 25 });
    }

    #[test]
    fn split_chains_through_receivers() {
        let mut eng = SplitsEngine::new();
        let one_to_two = vec![rcv(2, TOTAL_SPLITS_WEIGHT)];
        let two_to_three = vec![rcv(3, TOTAL_SPLITS_WEIGHT)];
        eng.set_splits(AccountId(1), &one_to_two).unwrap();
        eng.set_splits(AccountId(2), &two_to_three).unwrap();
        eng.give(AccountId(1), ASSET, 40).unwrap();

        eng.split(AccountId(1), ASSET, &one_to_two).unwrap();
        eng.split(AccountId(2), ASSET, &two_to_three).unwrap();
        assert_eq!(eng.splittable(AccountId(3), ASSET), 40);
    }

    // ------------------------------------------------------------------
    // collect
    // ------------------------------------------------------------------

    #[test]
    fn collect_takes_the_collectable_balance() {
        let mut eng = SplitsEngine::new();
        eng.give(AccountId(1), ASSET, 70).unwrap();
        eng.split(AccountId(1), ASSET, &[]).unwrap();

        assert_eq!(eng.collect(AccountId(1), ASSET), 70);
        assert_eq!(eng.collect(AccountId(1), ASSET), 0);
        assert_eq!(eng.total_balance(ASSET), 0);
    }

    #[test]
    fn collect_without_state_is_zero() {
        let mut eng = SplitsEngine::new();
        assert_eq!(eng.collect(AccountId(9), ASSET), 0);
    }

    // ------------------------------------------------------------------
    // Property tests
    // ------------------------------------------------------------------

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            /// Splitting conserves funds exactly: shares plus the kept
            /// remainder always equal the splittable balance.
            #[test]
            fn split_conserves_funds(
                weights in proptest::collection::vec(1u32..5_000, 0..MAX_SPLITS_RECEIVERS),
                amount in 0u128..1_000_000_000_000,
            ) {
                let receivers: Vec<_> = weights
                    .iter()
                    .enumerate()
                    .map(|(i, &w)| rcv(i as u64 + 2, w))
                    .collect();
                let mut eng = SplitsEngine::new();
                eng.set_splits(AccountId(1), &receivers).unwrap();
                eng.give(AccountId(1), ASSET, amount).unwrap();

                let out = eng.split(AccountId(1), ASSET, &receivers).unwrap();
                let forwarded: u128 = receivers
                    .iter()
                    .map(|r| eng.splittable(r.account_id, ASSET))
                    .sum();
                prop_assert_eq!(out.split, forwarded);
                prop_assert_eq!(out.split + out.collectable, amount);
            }

            /// Each share is within one unit of the exact weighted value.
            #[test]
            fn shares_are_proportional(
                weights in proptest::collection::vec(1u32..5_000, 1..50),
                amount in 0u128..1_000_000_000,
            ) {
                let receivers: Vec<_> = weights
                    .iter()
                    .enumerate()
                    .map(|(i, &w)| rcv(i as u64 + 2, w))
                    .collect();
                let mut eng = SplitsEngine::new();
                eng.set_splits(AccountId(1), &receivers).unwrap();
                eng.give(AccountId(1), ASSET, amount).unwrap();
                eng.split(AccountId(1), ASSET, &receivers).unwrap();

                for r in &receivers {
                    let exact = amount * r.weight as u128 / TOTAL_SPLITS_WEIGHT as u128;
                    let got = eng.splittable(r.account_id, ASSET);
                    prop_assert!(got == exact || got == exact + 1, "{got} vs {exact}");
                }
            }
        }
    }
}
