//! Round ledger: rounds, their pairs, and the commitment store.
//!
//! Everything that must change atomically (submit, reveal, phase advance)
//! lives in this one struct so a single lock covers it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use curia_envelope::SecuredCommitment;
use curia_types::{
    CommitmentId, CuriaError, MarketId, Pair, PairId, Result, Round, RoundId, RoundPhase,
    WalletAddress,
};
use tracing::info;

use crate::phase_machine::{PhaseTransitionReport, RoundPhaseMachine};
use crate::store::{CommitmentStore, NewCommitment};

#[derive(Debug, Default)]
pub struct RoundLedger {
    rounds: BTreeMap<RoundId, Round>,
    /// Ordered by id, i.e. creation order.
    pairs: BTreeMap<PairId, Pair>,
    store: CommitmentStore,
}

impl RoundLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a round announced by the scheduler. It starts in SETUP.
    pub fn open_round(
        &mut self,
        round_id: RoundId,
        market_id: MarketId,
        now: DateTime<Utc>,
    ) -> Result<&Round> {
        if self.rounds.contains_key(&round_id) {
            return Err(CuriaError::MalformedRequest {
                reason: format!("{round_id} already exists"),
            });
        }
        info!(round = %round_id, market = %market_id, "Round opened");
        Ok(self
            .rounds
            .entry(round_id)
            .or_insert_with(|| Round::new(round_id, market_id, now)))
    }

    /// Attach a pair to its round. Only possible before REVEAL.
    pub fn add_pair(&mut self, pair: Pair) -> Result<()> {
        if self.pairs.contains_key(&pair.id) {
            return Err(CuriaError::MalformedRequest {
                reason: format!("{} already exists", pair.id),
            });
        }
        let round = self.round(pair.round_id)?;
        if round.phase > RoundPhase::Commit {
            return Err(CuriaError::PhaseViolation {
                round: round.id,
                operation: "add_pair",
                required: RoundPhase::Commit,
                actual: round.phase,
            });
        }
        self.pairs.insert(pair.id, pair);
        Ok(())
    }

    pub fn round(&self, round_id: RoundId) -> Result<&Round> {
        self.rounds
            .get(&round_id)
            .ok_or_else(|| CuriaError::NotFound(round_id.to_string()))
    }

    pub fn pair(&self, pair_id: PairId) -> Result<&Pair> {
        self.pairs
            .get(&pair_id)
            .ok_or_else(|| CuriaError::NotFound(pair_id.to_string()))
    }

    /// The round owning a pair.
    pub fn round_of_pair(&self, pair_id: PairId) -> Result<&Round> {
        let pair = self.pair(pair_id)?;
        self.round(pair.round_id)
    }

    pub fn pairs(&self) -> impl Iterator<Item = &Pair> {
        self.pairs.values()
    }

    #[must_use]
    pub fn pairs_in_round(&self, round_id: RoundId) -> Vec<&Pair> {
        self.pairs
            .values()
            .filter(|p| p.round_id == round_id)
            .collect()
    }

    #[must_use]
    pub fn store(&self) -> &CommitmentStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut CommitmentStore {
        &mut self.store
    }

    /// Check that a curator may commit on a pair right now, without
    /// recording anything.
    pub fn check_commit(&self, pair_id: PairId, curator: &WalletAddress) -> Result<()> {
        RoundPhaseMachine::require_commit(self.round_of_pair(pair_id)?)?;
        if self.store.contains(pair_id, curator) {
            return Err(CuriaError::DuplicateCommitment {
                pair: pair_id,
                curator: curator.to_string(),
            });
        }
        Ok(())
    }

    /// Record an admitted commit. Requires the pair's round to be in COMMIT.
    pub fn submit(
        &mut self,
        pair_id: PairId,
        curator: WalletAddress,
        stake_amount: u64,
        secured: SecuredCommitment,
        now: DateTime<Utc>,
    ) -> Result<CommitmentId> {
        let round = self.round_of_pair(pair_id)?;
        RoundPhaseMachine::require_commit(round)?;
        let round_id = round.id;
        self.store.submit(
            NewCommitment {
                pair_id,
                round_id,
                curator,
                commitment_hash: secured.commitment_hash,
                stake_amount,
                encrypted_payload: secured.encrypted_payload,
                key_id: secured.key_id,
                signed: secured.signed,
            },
            now,
        )
    }

    /// Drive a round to `target`; see [`RoundPhaseMachine::advance`].
    pub fn advance_round(
        &mut self,
        round_id: RoundId,
        target: RoundPhase,
        now: DateTime<Utc>,
    ) -> Result<PhaseTransitionReport> {
        let round = self
            .rounds
            .get_mut(&round_id)
            .ok_or_else(|| CuriaError::NotFound(round_id.to_string()))?;
        RoundPhaseMachine::advance(round, &mut self.store, target, now)
    }

    /// Coverage signal for the scheduler.
    #[must_use]
    pub fn count_distinct_committed_pairs(&self, round_id: RoundId) -> usize {
        self.store.count_distinct_committed_pairs(round_id)
    }
}

#[cfg(test)]
mod tests {
    use curia_types::KeyId;

    use super::*;

    fn secured() -> SecuredCommitment {
        SecuredCommitment {
            commitment_hash: format!("0x{}", "cd".repeat(32)),
            encrypted_payload: "{}".into(),
            key_id: KeyId::new("v1"),
            signed: true,
        }
    }

    fn ledger_with_pair(phase: RoundPhase) -> RoundLedger {
        let mut ledger = RoundLedger::new();
        let now = Utc::now();
        ledger.open_round(RoundId(1), MarketId(1), now).unwrap();
        ledger.add_pair(Pair::dummy(1, RoundId(1))).unwrap();
        ledger.advance_round(RoundId(1), phase, now).unwrap();
        ledger
    }

    #[test]
    fn submit_requires_commit_phase() {
        for phase in [RoundPhase::Setup, RoundPhase::Reveal, RoundPhase::Closed] {
            let mut ledger = ledger_with_pair(phase);
            let err = ledger
                .submit(PairId(1), WalletAddress::new("w"), 1, secured(), Utc::now())
                .unwrap_err();
            assert!(matches!(err, CuriaError::PhaseViolation { .. }), "{phase}: {err:?}");
            assert!(ledger.store().is_empty());
        }

        let mut ledger = ledger_with_pair(RoundPhase::Commit);
        ledger
            .submit(PairId(1), WalletAddress::new("w"), 1, secured(), Utc::now())
            .unwrap();
        assert_eq!(ledger.count_distinct_committed_pairs(RoundId(1)), 1);
    }

    #[test]
    fn check_commit_reports_duplicates() {
        let mut ledger = ledger_with_pair(RoundPhase::Commit);
        let w = WalletAddress::new("w");
        ledger.check_commit(PairId(1), &w).unwrap();
        ledger
            .submit(PairId(1), w.clone(), 1, secured(), Utc::now())
            .unwrap();
        assert!(matches!(
            ledger.check_commit(PairId(1), &w),
            Err(CuriaError::DuplicateCommitment { .. })
        ));
    }

    #[test]
    fn unknown_pair_and_round() {
        let mut ledger = RoundLedger::new();
        assert!(matches!(ledger.pair(PairId(5)), Err(CuriaError::NotFound(_))));
        assert!(matches!(
            ledger.add_pair(Pair::dummy(1, RoundId(9))),
            Err(CuriaError::NotFound(_))
        ));
        assert!(
            ledger
                .advance_round(RoundId(9), RoundPhase::Commit, Utc::now())
                .is_err()
        );
    }

    #[test]
    fn pairs_cannot_join_after_commit() {
        let mut ledger = ledger_with_pair(RoundPhase::Reveal);
        assert!(matches!(
            ledger.add_pair(Pair::dummy(2, RoundId(1))),
            Err(CuriaError::PhaseViolation { .. })
        ));
    }

    #[test]
    fn duplicate_round_rejected() {
        let mut ledger = RoundLedger::new();
        ledger.open_round(RoundId(1), MarketId(1), Utc::now()).unwrap();
        assert!(
            ledger
                .open_round(RoundId(1), MarketId(2), Utc::now())
                .is_err()
        );
    }
}
