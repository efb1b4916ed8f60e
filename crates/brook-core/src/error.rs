//! Error types for the Brook ledger.
//!
//! Every failure is synchronous and all-or-nothing: validation and hash
//! verification complete before any state is mutated, so a returned error
//! always means "nothing changed".
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiversError {
    #[error("too many receivers: {count} > {max}")] TooManyReceivers { count: usize, max: usize },
    #[error("zero rate at receiver {index}")] ZeroRate { index: usize },
    #[error("rate above cap at receiver {index}")] RateTooHigh { index: usize },
    #[error("receivers not sorted at position {index}")] NotSorted { index: usize },
    #[error("duplicate receiver at position {index}")] DuplicateReceiver { index: usize },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamsError {
    #[error("current receiver list does not match stored commitment")] InvalidCurrentList,
    #[error("timestamp {timestamp} before last update {update_time}")] TimestampTooEarly { timestamp: u32, update_time: u32 },
    #[error("total streams balance too high: {total} > {max}")] BalanceTooHigh { total: u128, max: u128 },
    #[error("history does not replay to the stored history hash")] InvalidHistory,
    #[error(transparent)] Receivers(#[from] ReceiversError),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitsError {
    #[error("too many splits receivers: {count} > {max}")] TooManyReceivers { count: usize, max: usize },
    #[error("zero weight at receiver {index}")] ZeroWeight { index: usize },
    #[error("splits receivers not sorted at position {index}")] NotSorted { index: usize },
    #[error("duplicate splits receiver at position {index}")] DuplicateReceiver { index: usize },
    #[error("splits weights sum too high: {sum} > {max}")] WeightSumTooHigh { sum: u64, max: u32 },
    #[error("current splits receivers do not match stored commitment")] InvalidCurrentSplits,
    #[error("total splits balance too high: {total} > {max}")] BalanceTooHigh { total: u128, max: u128 },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)] Receivers(#[from] ReceiversError),
    #[error(transparent)] Streams(#[from] StreamsError),
    #[error(transparent)] Splits(#[from] SplitsError),
}
