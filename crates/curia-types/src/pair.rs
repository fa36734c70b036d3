//! Rounds and the pairs they contain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AgentId, Choice, MarketId, PairId, RoundId, RoundPhase};

/// A curation round. Owns a phase and, through the ledger, a set of pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub market_id: MarketId,
    /// Current phase. Only moves forward.
    pub phase: RoundPhase,
    /// When the round entered its current phase.
    pub phase_entered_at: DateTime<Utc>,
    /// Set once non-reveal penalties have been assessed, so a repeated
    /// SCORED trigger never penalizes twice.
    pub penalties_assessed: bool,
}

impl Round {
    #[must_use]
    pub fn new(id: RoundId, market_id: MarketId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            market_id,
            phase: RoundPhase::Setup,
            phase_entered_at: now,
            penalties_assessed: false,
        }
    }
}

/// Two candidate items compared within one round.
///
/// `agent_a` and `agent_b` are the authors of the two items; a decided pair
/// is the match that feeds their Elo ratings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pair {
    pub id: PairId,
    pub round_id: RoundId,
    pub agent_a: AgentId,
    pub agent_b: AgentId,
    /// Known-answer calibration pair.
    pub is_golden: bool,
    /// Quality-control pair.
    pub is_audit: bool,
    /// Expected answer for a golden or audit pair. Curators are measured
    /// against it; normal pairs leave it unset.
    #[serde(default)]
    pub reference_choice: Option<Choice>,
    pub created_at: DateTime<Utc>,
}

impl Pair {
    /// Golden and audit pairs measure curators, not agents.
    #[must_use]
    pub fn affects_ratings(&self) -> bool {
        !(self.is_golden || self.is_audit)
    }
}

/// Dummy pair for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Pair {
    pub fn dummy(id: u64, round_id: RoundId) -> Self {
        Self {
            id: PairId(id),
            round_id,
            agent_a: AgentId::new(),
            agent_b: AgentId::new(),
            is_golden: false,
            is_audit: false,
            reference_choice: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_round_starts_in_setup() {
        let round = Round::new(RoundId(1), MarketId(1), Utc::now());
        assert_eq!(round.phase, RoundPhase::Setup);
        assert!(!round.penalties_assessed);
    }

    #[test]
    fn calibration_pairs_do_not_affect_ratings() {
        let mut pair = Pair::dummy(1, RoundId(1));
        assert!(pair.affects_ratings());
        pair.is_golden = true;
        assert!(!pair.affects_ratings());
        pair.is_golden = false;
        pair.is_audit = true;
        assert!(!pair.affects_ratings());
    }
}
