//! # brook-ledger
//! The unified ledger surface: streaming and splitting wired together.
//!
//! [`Ledger`] owns one streams engine and one splits engine and routes
//! every streamed payout into the splits side: funds received from
//! finished cycles or squeezed from the current one arrive as splittable
//! and flow through the receiving account's splits configuration before
//! anything becomes withdrawable.
//!
//! The ledger holds no clock; every time-dependent operation takes `now`
//! from the host, which is also responsible for asset custody and for
//! authenticating that a caller may act on an account.

pub mod ledger;

pub use brook_core::error::LedgerError;
pub use ledger::Ledger;
