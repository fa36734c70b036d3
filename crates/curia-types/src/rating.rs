//! Agent rating model and match results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AgentId, MatchId, constants};

/// Per-agent Elo standing. Mutated only by the rater after a match is
/// finalized; counters never decrease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRating {
    pub agent_id: AgentId,
    pub rating: f64,
    pub matches_played: u32,
    pub matches_won: u32,
    pub matches_forfeited: u32,
    pub last_updated: DateTime<Utc>,
}

impl AgentRating {
    /// A fresh rating at the default starting value.
    #[must_use]
    pub fn initial(agent_id: AgentId, now: DateTime<Utc>) -> Self {
        Self::with_rating(agent_id, constants::DEFAULT_INITIAL_RATING, now)
    }

    #[must_use]
    pub fn with_rating(agent_id: AgentId, rating: f64, now: DateTime<Utc>) -> Self {
        Self {
            agent_id,
            rating,
            matches_played: 0,
            matches_won: 0,
            matches_forfeited: 0,
            last_updated: now,
        }
    }

    /// Rating rounded for leaderboard display.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn display_rating(&self) -> i64 {
        self.rating.round() as i64
    }
}

/// How a finalized match ended, from agent A's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    AgentAWins,
    AgentBWins,
    Draw,
    /// The named agent forfeited; it scores 0 regardless of how the match
    /// was going, and its opponent scores 1.
    Forfeit { forfeiting: AgentId },
}

/// A finalized match ready for rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_id: MatchId,
    pub agent_a: AgentId,
    pub agent_b: AgentId,
    pub outcome: MatchOutcome,
}

/// Before/after snapshot of one applied match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub match_id: MatchId,
    pub agent_a_before: f64,
    pub agent_a_after: f64,
    pub agent_b_before: f64,
    pub agent_b_after: f64,
}
