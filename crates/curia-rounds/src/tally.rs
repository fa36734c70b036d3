//! Stake-weighted tally of a pair's revealed votes.
//!
//! This is where a decided pair becomes a match result for the rater.
//! Only revealed commitments count; penalized and pending ones do not.

use curia_types::{Choice, MatchId, MatchOutcome, MatchResult, Pair, PairId};
use serde::{Deserialize, Serialize};

use crate::store::CommitmentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PairTally {
    pub votes_a: u32,
    pub votes_b: u32,
    pub stake_a: u64,
    pub stake_b: u64,
}

impl PairTally {
    #[must_use]
    pub fn for_pair(store: &CommitmentStore, pair_id: PairId) -> Self {
        let mut tally = Self::default();
        for c in store.list_by_pair_revealed(pair_id) {
            match c.outcome {
                Some(Choice::A) => {
                    tally.votes_a += 1;
                    tally.stake_a = tally.stake_a.saturating_add(c.stake_amount);
                }
                Some(Choice::B) => {
                    tally.votes_b += 1;
                    tally.stake_b = tally.stake_b.saturating_add(c.stake_amount);
                }
                None => {}
            }
        }
        tally
    }

    #[must_use]
    pub fn total_votes(&self) -> u32 {
        self.votes_a + self.votes_b
    }

    /// Stake decides; equal stake is a draw. `None` with no revealed votes.
    #[must_use]
    pub fn outcome(&self) -> Option<MatchOutcome> {
        if self.total_votes() == 0 {
            return None;
        }
        Some(match self.stake_a.cmp(&self.stake_b) {
            std::cmp::Ordering::Greater => MatchOutcome::AgentAWins,
            std::cmp::Ordering::Less => MatchOutcome::AgentBWins,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
        })
    }

    /// The choice that carried the pair, or `None` on a draw or no votes.
    #[must_use]
    pub fn winning_choice(&self) -> Option<Choice> {
        match self.outcome()? {
            MatchOutcome::AgentAWins => Some(Choice::A),
            MatchOutcome::AgentBWins => Some(Choice::B),
            MatchOutcome::Draw | MatchOutcome::Forfeit { .. } => None,
        }
    }

    /// The match this pair decided, keyed by [`MatchId::for_pair`].
    #[must_use]
    pub fn match_result(&self, pair: &Pair) -> Option<MatchResult> {
        self.outcome().map(|outcome| MatchResult {
            match_id: MatchId::for_pair(pair.id),
            agent_a: pair.agent_a,
            agent_b: pair.agent_b,
            outcome,
        })
    }
}
