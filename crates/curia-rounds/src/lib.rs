//! # curia-rounds
//!
//! Round Plane of the **Curia** commit-reveal curation core.
//!
//! - [`CommitmentStore`]: commitments keyed by id and by (pair, curator)
//! - [`RoundPhaseMachine`]: forward-only phase transitions and their hooks
//! - [`RoundLedger`]: rounds, pairs and the store, mutated as one unit
//! - [`PairSelector`]: deterministic next-pair selection for curators
//! - [`RevealProcessor`]: decrypt-then-compare reveal binding
//! - [`PairTally`]: stake-weighted result of a pair's revealed votes
//! - [`curator_observations`]: what a scored round says about each curator
//! - [`CurationEngine`]: admission, reveals and phase advances under one lock
//!
//! ## Round Lifecycle
//!
//! ```text
//!   SETUP ──▶ COMMIT ──▶ REVEAL ──▶ SCORED ──▶ CLOSED
//!             commits    reveals    non-revealers
//!             accepted   accepted   penalized
//! ```

pub mod engine;
pub mod ledger;
pub mod phase_machine;
pub mod quality;
pub mod reveal;
pub mod selector;
pub mod store;
pub mod tally;

pub use engine::CurationEngine;
pub use ledger::RoundLedger;
pub use phase_machine::{PhaseTransitionReport, RoundPhaseMachine};
pub use quality::curator_observations;
pub use reveal::{RevealProcessor, Revealed};
pub use selector::{PairSelector, is_eligible_curation_phase};
pub use store::{CommitmentStore, NewCommitment};
pub use tally::PairTally;
