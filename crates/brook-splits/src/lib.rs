//! # brook-splits
//! The splitting half of the Brook ledger: weighted, deterministic routing
//! of received funds.
//!
//! Every account carries one splits configuration shared across assets.
//! Funds arrive as *splittable*, are divided among the configured
//! receivers by weight (each receiving splittable funds of their own, so
//! splits chain), and whatever the weights do not cover becomes
//! *collectable* by the account itself.

pub mod engine;
pub mod receivers;

pub use engine::{SplitOutcome, SplitsBalance, SplitsEngine};
pub use receivers::{hash_splits_receivers, validate_splits_receivers, SplitsReceiver};
