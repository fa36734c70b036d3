//! # curia-types
//!
//! Shared types, errors, and configuration for the **Curia** commit-reveal
//! curation core.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`PairId`], [`RoundId`], [`MarketId`], [`CommitmentId`], [`AgentId`], [`MatchId`], [`WalletAddress`], [`KeyId`]
//! - **Round model**: [`Round`], [`Pair`], [`RoundPhase`]
//! - **Commitment model**: [`Commitment`], [`Choice`]
//! - **Rating model**: [`AgentRating`], [`MatchResult`], [`MatchOutcome`], [`RatingUpdate`]
//! - **Curator model**: [`CuratorObservation`], [`ObservationKind`], [`CuratorStanding`]
//! - **Configuration**: [`CuriaConfig`], [`CommitSecurityConfig`], [`RatingConfig`], [`LoggingConfig`]
//! - **Errors**: [`CuriaError`] with `CR_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod commitment;
pub mod config;
pub mod constants;
pub mod curator;
pub mod error;
pub mod ids;
pub mod pair;
pub mod phase;
pub mod rating;

// Re-export all primary types at crate root for ergonomic imports:
//   use curia_types::{Commitment, Pair, RoundPhase, CuriaError, ...};

pub use commitment::*;
pub use config::*;
pub use curator::*;
pub use error::*;
pub use ids::*;
pub use pair::*;
pub use phase::*;
pub use rating::*;

// Constants are accessed via `curia_types::constants::FOO`
// (not re-exported to avoid name collisions).
