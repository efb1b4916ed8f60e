//! Ledger constants. Amounts are `u128` asset units; rates are fixed-point.

/// Extra decimals carried by per-second rates relative to asset units.
///
/// A rate of `1 * RATE_PER_SEC_MULTIPLIER` streams exactly one asset unit
/// per second; smaller rates stream fractional units whose remainders are
/// truncated per cycle boundary.
pub const RATE_EXTRA_DECIMALS: u32 = 9;

/// Fixed-point denominator for per-second rates: `10^RATE_EXTRA_DECIMALS`.
pub const RATE_PER_SEC_MULTIPLIER: u128 = 1_000_000_000;

/// Maximum number of receivers in one stream configuration.
///
/// Bounds the cost of hashing, validation, max-end probing, and cycle
/// delta updates in a single call.
pub const MAX_STREAMS_RECEIVERS: usize = 100;

/// Maximum per-second rate.
///
/// Keeps every `rate * u32` product inside `i128`, so streamed-amount and
/// signed cycle-delta arithmetic never overflows the 128-bit words.
pub const MAX_RATE_PER_SEC: u128 = (1 << 88) - 1;

/// Maximum sum of all stored stream balances per asset.
///
/// A defensive capacity bound, not a ledger concept: it keeps per-cycle
/// delta accumulators comfortably inside `i128` under any schedule.
pub const MAX_TOTAL_BALANCE: u128 = (1 << 96) - 1;

/// Maximum number of receivers in one splits configuration.
pub const MAX_SPLITS_RECEIVERS: usize = 200;

/// Total weight of a splits configuration.
///
/// A receiver with weight `w` gets `w / TOTAL_SPLITS_WEIGHT` of every
/// split amount; weights summing below the total leave the remainder
/// collectable by the splitting account.
pub const TOTAL_SPLITS_WEIGHT: u32 = 1_000_000;
