//! # brook-streams
//! The streaming half of the Brook ledger: per-second streams settled into
//! fixed-length cycles.
//!
//! State is keyed by `(account, asset)` and owned by [`StreamsEngine`].
//! Callers never hold references into it; they resupply the committed
//! receiver list on every call and it is verified against the stored
//! commitment hash before anything is mutated.

pub mod cycles;
pub mod engine;
pub mod max_end;
pub mod squeeze;
pub mod state;

pub use engine::{ReceiveOutcome, SetStreamsOutcome, SqueezeOutcome, StreamsEngine};
pub use squeeze::StreamsHistoryEntry;
pub use state::{AmtDelta, StreamsState, StreamsStateView};
