//! Elo rater: applies decided matches to agent ratings.
//!
//! Both agents of a match are updated under one lock, after every check has
//! passed. Readers never observe one side updated and the other not, and a
//! rejected match leaves the ledger untouched.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use curia_types::{
    AgentId, AgentRating, CuriaError, MatchId, MatchOutcome, MatchResult, Pair, RatingConfig,
    RatingUpdate, Result,
};
use tracing::info;

use crate::elo::calculate_ratings;
use crate::idempotency::MatchIdempotencyGuard;

#[derive(Debug)]
struct RatingLedger {
    ratings: HashMap<AgentId, AgentRating>,
    guard: MatchIdempotencyGuard,
}

#[derive(Debug)]
pub struct EloRater {
    ledger: Mutex<RatingLedger>,
    k_factor: f64,
    initial_rating: f64,
}

/// Scores for (A, B) and the winner, if any.
fn scores(result: &MatchResult) -> Result<(f64, f64, Option<AgentId>)> {
    Ok(match result.outcome {
        MatchOutcome::AgentAWins => (1.0, 0.0, Some(result.agent_a)),
        MatchOutcome::AgentBWins => (0.0, 1.0, Some(result.agent_b)),
        MatchOutcome::Draw => (0.5, 0.5, None),
        MatchOutcome::Forfeit { forfeiting } if forfeiting == result.agent_a => {
            (0.0, 1.0, Some(result.agent_b))
        }
        MatchOutcome::Forfeit { forfeiting } if forfeiting == result.agent_b => {
            (1.0, 0.0, Some(result.agent_a))
        }
        MatchOutcome::Forfeit { forfeiting } => {
            return Err(CuriaError::InvalidMatch {
                reason: format!("forfeiting agent {forfeiting} is not a participant"),
            });
        }
    })
}

impl EloRater {
    /// # Errors
    /// [`CuriaError::Configuration`] if `config` does not validate.
    pub fn new(config: &RatingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ledger: Mutex::new(RatingLedger {
                ratings: HashMap::new(),
                guard: MatchIdempotencyGuard::new(config.idempotency_cache_size)?,
            }),
            k_factor: config.k_factor,
            initial_rating: config.initial_rating,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, RatingLedger>> {
        self.ledger
            .lock()
            .map_err(|_| CuriaError::Internal("rating ledger lock poisoned".into()))
    }

    /// Seed an agent's standing, e.g. when restoring from a projection.
    pub fn register(&self, rating: AgentRating) -> Result<()> {
        self.lock()?.ratings.insert(rating.agent_id, rating);
        Ok(())
    }

    /// Apply one decided match.
    ///
    /// # Errors
    /// - [`CuriaError::InvalidMatch`]: same agent on both sides, or the
    ///   forfeiting agent did not play
    /// - [`CuriaError::MatchAlreadyRated`]: this `match_id` was applied before
    pub fn apply_match(&self, result: &MatchResult, now: DateTime<Utc>) -> Result<RatingUpdate> {
        if result.agent_a == result.agent_b {
            return Err(CuriaError::InvalidMatch {
                reason: format!("agent {} cannot play itself", result.agent_a),
            });
        }
        let (score_a, score_b, winner) = scores(result)?;

        let mut ledger = self.lock()?;
        ledger.guard.check(result.match_id)?;

        let before_a = self.current(&ledger, result.agent_a, now);
        let before_b = self.current(&ledger, result.agent_b, now);
        let (after_a, after_b) = calculate_ratings(
            before_a.rating,
            before_b.rating,
            score_a,
            score_b,
            self.k_factor,
        )?;

        let forfeiting = match result.outcome {
            MatchOutcome::Forfeit { forfeiting } => Some(forfeiting),
            _ => None,
        };
        let updated = [(before_a.clone(), after_a), (before_b.clone(), after_b)].map(
            |(mut rating, after)| {
                rating.rating = after;
                rating.matches_played += 1;
                if winner == Some(rating.agent_id) {
                    rating.matches_won += 1;
                }
                if forfeiting == Some(rating.agent_id) {
                    rating.matches_forfeited += 1;
                }
                rating.last_updated = now;
                rating
            },
        );

        // Nothing below can fail, so both sides land together.
        ledger.guard.mark_rated(result.match_id)?;
        for rating in updated {
            ledger.ratings.insert(rating.agent_id, rating);
        }

        info!(
            match_id = %result.match_id,
            agent_a = %result.agent_a,
            agent_b = %result.agent_b,
            outcome = ?result.outcome,
            a_before = before_a.rating,
            a_after = after_a,
            b_before = before_b.rating,
            b_after = after_b,
            "Match rated"
        );
        Ok(RatingUpdate {
            match_id: result.match_id,
            agent_a_before: before_a.rating,
            agent_a_after: after_a,
            agent_b_before: before_b.rating,
            agent_b_after: after_b,
        })
    }

    /// Apply the outcome a pair decided. Golden and audit pairs are refused.
    pub fn apply_pair_outcome(
        &self,
        pair: &Pair,
        outcome: MatchOutcome,
        now: DateTime<Utc>,
    ) -> Result<RatingUpdate> {
        if !pair.affects_ratings() {
            return Err(CuriaError::CalibrationPairExcluded(pair.id));
        }
        self.apply_match(
            &MatchResult {
                match_id: MatchId::for_pair(pair.id),
                agent_a: pair.agent_a,
                agent_b: pair.agent_b,
                outcome,
            },
            now,
        )
    }

    fn current(&self, ledger: &RatingLedger, agent: AgentId, now: DateTime<Utc>) -> AgentRating {
        ledger
            .ratings
            .get(&agent)
            .cloned()
            .unwrap_or_else(|| AgentRating::with_rating(agent, self.initial_rating, now))
    }

    /// Current standing, or `None` for an agent that never played.
    pub fn rating(&self, agent: AgentId) -> Result<Option<AgentRating>> {
        Ok(self.lock()?.ratings.get(&agent).cloned())
    }

    pub fn is_rated(&self, match_id: &MatchId) -> Result<bool> {
        Ok(self.lock()?.guard.is_rated(match_id))
    }

    /// All known agents, highest rating first. Ties break on agent id.
    pub fn leaderboard(&self) -> Result<Vec<AgentRating>> {
        let mut all: Vec<_> = self.lock()?.ratings.values().cloned().collect();
        all.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then_with(|| a.agent_id.cmp(&b.agent_id))
        });
        Ok(all)
    }
}
