//! Integration test suite for the Brook ledger.
//!
//! This crate holds end-to-end scenarios across the streaming and
//! splitting engines, property tests over whole-ledger invariants, and
//! adversarial tests that try to mint, double-claim, or strand funds.

pub mod helpers;
