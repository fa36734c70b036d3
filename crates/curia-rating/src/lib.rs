//! # curia-rating
//!
//! Rating Plane of the **Curia** curation core.
//!
//! - [`elo`]: expected score and the paired K-factor update
//! - [`MatchIdempotencyGuard`]: each match moves ratings at most once
//! - [`EloRater`]: both-or-neither updates, calibration-pair exclusion,
//!   leaderboard projection
//! - [`CuratorScorer`]: calibration, audit and consensus rates folded into
//!   curator standing (reward band, suspension, voting power)
//!
//! Golden and audit pairs measure curators, not agents; they never reach
//! the rater and feed the curator scorer instead.

pub mod curator;
pub mod elo;
pub mod idempotency;
pub mod rater;

pub use curator::{
    CuratorScorer, blended_score, curator_score, reward_multiplier, should_suspend, voting_power,
};
pub use elo::{calculate_ratings, expected_score};
pub use idempotency::MatchIdempotencyGuard;
pub use rater::EloRater;
