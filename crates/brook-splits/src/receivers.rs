//! Splits receiver lists and their validation.

use serde::{Deserialize, Serialize};

use brook_core::commitment::hash_splits_entries;
use brook_core::constants::{MAX_SPLITS_RECEIVERS, TOTAL_SPLITS_WEIGHT};
use brook_core::error::SplitsError;
use brook_core::types::{AccountId, Hash256};

/// A splits endpoint: which account gets a share, and how big.
///
/// A receiver with weight `w` gets `w / TOTAL_SPLITS_WEIGHT` of every
/// split amount, rounded down deterministically.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct SplitsReceiver {
    /// The account receiving the share.
    pub account_id: AccountId,
    /// Relative weight out of [`TOTAL_SPLITS_WEIGHT`].
    pub weight: u32,
}

impl SplitsReceiver {
    /// Convenience constructor.
    pub fn new(account_id: AccountId, weight: u32) -> Self {
        Self { account_id, weight }
    }
}

/// Validate a splits receiver list.
///
/// Entries must be strictly ascending by account (one share per account),
/// weights nonzero, and the weight sum at most [`TOTAL_SPLITS_WEIGHT`].
/// A sum below the total is fine; the uncovered remainder stays with the
/// splitting account.
pub fn validate_splits_receivers(receivers: &[SplitsReceiver]) -> Result<(), SplitsError> {
    if receivers.len() > MAX_SPLITS_RECEIVERS {
        return Err(SplitsError::TooManyReceivers {
            count: receivers.len(),
            max: MAX_SPLITS_RECEIVERS,
        });
    }
    let mut sum = 0u64;
    for (index, receiver) in receivers.iter().enumerate() {
        if receiver.weight == 0 {
            return Err(SplitsError::ZeroWeight { index });
        }
        sum += receiver.weight as u64;
        if index > 0 {
            let prev = &receivers[index - 1];
            if prev.account_id == receiver.account_id {
                return Err(SplitsError::DuplicateReceiver { index });
            }
            if prev.account_id > receiver.account_id {
                return Err(SplitsError::NotSorted { index });
            }
        }
    }
    if sum > TOTAL_SPLITS_WEIGHT as u64 {
        return Err(SplitsError::WeightSumTooHigh { sum, max: TOTAL_SPLITS_WEIGHT });
    }
    Ok(())
}

/// Commitment hash of a splits receiver list.
pub fn hash_splits_receivers(receivers: &[SplitsReceiver]) -> Hash256 {
    let entries: Vec<(u64, u32)> =
        receivers.iter().map(|r| (r.account_id.0, r.weight)).collect();
    hash_splits_entries(&entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rcv(account: u64, weight: u32) -> SplitsReceiver {
        SplitsReceiver::new(AccountId(account), weight)
    }

    #[test]
    fn empty_list_is_valid() {
        assert!(validate_splits_receivers(&[]).is_ok());
    }

    #[test]
    fn sorted_list_under_total_is_valid() {
        let list = vec![rcv(1, 400_000), rcv(2, 600_000)];
        assert!(validate_splits_receivers(&list).is_ok());
    }

    #[test]
    fn rejects_zero_weight() {
        let err = validate_splits_receivers(&[rcv(1, 0)]).unwrap_err();
        assert_eq!(err, SplitsError::ZeroWeight { index: 0 });
    }

    #[test]
    fn rejects_unsorted() {
        let err = validate_splits_receivers(&[rcv(2, 1), rcv(1, 1)]).unwrap_err();
        assert_eq!(err, SplitsError::NotSorted { index: 1 });
    }

    #[test]
    fn rejects_duplicate_account() {
        let err = validate_splits_receivers(&[rcv(1, 1), rcv(1, 2)]).unwrap_err();
        assert_eq!(err, SplitsError::DuplicateReceiver { index: 1 });
    }

    #[test]
    fn rejects_weight_sum_above_total() {
        let list = vec![rcv(1, TOTAL_SPLITS_WEIGHT), rcv(2, 1)];
        let err = validate_splits_receivers(&list).unwrap_err();
        assert_eq!(
            err,
            SplitsError::WeightSumTooHigh {
                sum: TOTAL_SPLITS_WEIGHT as u64 + 1,
                max: TOTAL_SPLITS_WEIGHT,
            },
        );
    }

    #[test]
    fn full_weight_to_one_receiver_is_valid() {
        assert!(validate_splits_receivers(&[rcv(1, TOTAL_SPLITS_WEIGHT)]).is_ok());
    }

    #[test]
    fn rejects_too_many() {
        let list: Vec<_> = (0..MAX_SPLITS_RECEIVERS as u64 + 1).map(|i| rcv(i, 1)).collect();
        let err = validate_splits_receivers(&list).unwrap_err();
        assert!(matches!(err, SplitsError::TooManyReceivers { .. }));
    }

    #[test]
    fn hash_is_empty_for_no_receivers() {
        assert_eq!(hash_splits_receivers(&[]), Hash256::ZERO);
    }

    #[test]
    fn hash_depends_on_weights() {
        let a = hash_splits_receivers(&[rcv(1, 10)]);
        let b = hash_splits_receivers(&[rcv(1, 11)]);
        assert_ne!(a, b);
    }
}
