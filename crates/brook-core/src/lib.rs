//! # brook-core
//! Foundation types, constants, and commitment hashing for the Brook ledger.

pub mod commitment;
pub mod constants;
pub mod error;
pub mod receivers;
pub mod types;
