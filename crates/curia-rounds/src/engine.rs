//! Curation engine: the admission gate, reveal processor and round ledger
//! behind one lock.
//!
//! Every mutating call takes the ledger lock for its whole duration, so a
//! commit and a phase advance on the same round, or a reveal and the
//! SCORED penalty sweep, can never interleave. A commitment is therefore
//! never both revealed and penalized.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use curia_envelope::{CommitGate, CommitRequest, KeyRing, ReplayGuard, WalletDirectory};
use curia_types::{
    CommitSecurityConfig, Commitment, CommitmentId, CuratorObservation, CuriaError, MarketId,
    Pair, PairId, Result, Round, RoundId, RoundPhase, WalletAddress,
};
use tracing::debug;

use crate::ledger::RoundLedger;
use crate::phase_machine::PhaseTransitionReport;
use crate::quality::curator_observations;
use crate::reveal::{RevealProcessor, Revealed};
use crate::selector::PairSelector;
use crate::tally::PairTally;

pub struct CurationEngine {
    ledger: Mutex<RoundLedger>,
    gate: CommitGate,
    reveals: RevealProcessor,
}

impl std::fmt::Debug for CurationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurationEngine")
            .field("gate", &self.gate)
            .field("reveals", &self.reveals)
            .finish_non_exhaustive()
    }
}

impl CurationEngine {
    /// Build the engine from configuration. Fails if the key ring cannot be
    /// assembled or the replay window is unusable.
    pub fn new(
        config: &CommitSecurityConfig,
        directory: Arc<dyn WalletDirectory>,
    ) -> Result<Self> {
        let keys = Arc::new(KeyRing::from_config(config)?);
        let replay = Arc::new(ReplayGuard::new(config.replay_window_secs)?);
        Ok(Self::with_parts(config, directory, replay, keys))
    }

    /// Build the engine around an existing replay guard and key ring, e.g.
    /// ones shared with a sweeper task or an admin surface.
    pub fn with_parts(
        config: &CommitSecurityConfig,
        directory: Arc<dyn WalletDirectory>,
        replay: Arc<ReplayGuard>,
        keys: Arc<KeyRing>,
    ) -> Self {
        Self {
            ledger: Mutex::new(RoundLedger::new()),
            reveals: RevealProcessor::new(Arc::clone(&keys), config.allow_legacy_reveal_decode),
            gate: CommitGate::new(config, directory, replay, keys),
        }
    }

    #[must_use]
    pub fn replay_guard(&self) -> &Arc<ReplayGuard> {
        self.gate.replay_guard()
    }

    #[must_use]
    pub fn key_ring(&self) -> &Arc<KeyRing> {
        self.gate.key_ring()
    }

    fn lock(&self) -> Result<MutexGuard<'_, RoundLedger>> {
        self.ledger
            .lock()
            .map_err(|_| CuriaError::Internal("round ledger lock poisoned".into()))
    }

    pub fn open_round(
        &self,
        round_id: RoundId,
        market_id: MarketId,
        now: DateTime<Utc>,
    ) -> Result<Round> {
        self.lock()?.open_round(round_id, market_id, now).cloned()
    }

    pub fn add_pair(&self, pair: Pair) -> Result<()> {
        self.lock()?.add_pair(pair)
    }

    /// Admit and record a commit.
    ///
    /// Phase and duplicate checks run before the signature is verified, so
    /// a request rejected for those reasons does not burn its replay
    /// fingerprint.
    pub fn commit(
        &self,
        pair_id: PairId,
        request: &CommitRequest,
        now: DateTime<Utc>,
    ) -> Result<CommitmentId> {
        let mut ledger = self.lock()?;
        ledger.check_commit(pair_id, &request.wallet)?;
        let secured = self.gate.secure_commit(pair_id, request, now)?;
        ledger.submit(
            pair_id,
            request.wallet.clone(),
            request.stake_amount,
            secured,
            now,
        )
    }

    pub fn reveal(
        &self,
        commitment_id: CommitmentId,
        curator: &WalletAddress,
        disclosed: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Revealed> {
        let mut ledger = self.lock()?;
        self.reveals
            .reveal(&mut ledger, commitment_id, curator, disclosed, now)
    }

    pub fn advance_round(
        &self,
        round_id: RoundId,
        target: RoundPhase,
        now: DateTime<Utc>,
    ) -> Result<PhaseTransitionReport> {
        self.lock()?.advance_round(round_id, target, now)
    }

    pub fn next_pair_for(
        &self,
        curator: &WalletAddress,
        market_id: MarketId,
    ) -> Result<Option<Pair>> {
        let ledger = self.lock()?;
        let pair = PairSelector::next_pair_for(&ledger, curator, market_id).cloned();
        if let Some(pair) = &pair {
            debug!(curator = %curator.short(), pair = %pair.id, "Pair handed out");
        }
        Ok(pair)
    }

    pub fn commitment(&self, commitment_id: CommitmentId) -> Result<Commitment> {
        self.lock()?
            .store()
            .get(&commitment_id)
            .cloned()
            .ok_or_else(|| CuriaError::NotFound(commitment_id.to_string()))
    }

    pub fn tally(&self, pair_id: PairId) -> Result<PairTally> {
        let ledger = self.lock()?;
        ledger.pair(pair_id)?;
        Ok(PairTally::for_pair(ledger.store(), pair_id))
    }

    /// What a scored round says about each curator; see
    /// [`crate::quality::curator_observations`].
    pub fn curator_observations(&self, round_id: RoundId) -> Result<Vec<CuratorObservation>> {
        curator_observations(&*self.lock()?, round_id)
    }

    /// Run `f` against a consistent snapshot of the ledger.
    pub fn with_ledger<T>(&self, f: impl FnOnce(&RoundLedger) -> T) -> Result<T> {
        let ledger = self.lock()?;
        Ok(f(&ledger))
    }
}

#[cfg(test)]
mod tests {
    use curia_envelope::{HexWalletDirectory, RevealPayload};
    use curia_types::Choice;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    use super::*;

    fn engine() -> CurationEngine {
        let engine =
            CurationEngine::new(&CommitSecurityConfig::default(), Arc::new(HexWalletDirectory))
                .unwrap();
        let now = Utc::now();
        engine.open_round(RoundId(1), MarketId(1), now).unwrap();
        engine.add_pair(Pair::dummy(1, RoundId(1))).unwrap();
        engine
    }

    fn signed(payload: &RevealPayload, now: DateTime<Utc>) -> CommitRequest {
        let sk = SigningKey::generate(&mut OsRng);
        let wallet = WalletAddress::new(hex::encode(sk.verifying_key().as_bytes()));
        CommitRequest::sign(&sk, wallet, PairId(1), payload, 25, now.timestamp()).unwrap()
    }

    #[test]
    fn rejected_phase_does_not_consume_fingerprint() {
        let engine = engine();
        let now = Utc::now();
        let req = signed(&RevealPayload::random(Choice::A), now);

        let err = engine.commit(PairId(1), &req, now).unwrap_err();
        assert!(matches!(err, CuriaError::PhaseViolation { .. }));
        assert!(engine.replay_guard().is_empty().unwrap());

        engine
            .advance_round(RoundId(1), RoundPhase::Commit, now)
            .unwrap();
        engine.commit(PairId(1), &req, now).unwrap();
    }

    #[test]
    fn commit_reveal_and_tally() {
        let engine = engine();
        let now = Utc::now();
        engine
            .advance_round(RoundId(1), RoundPhase::Commit, now)
            .unwrap();
        let payload = RevealPayload::random(Choice::B);
        let req = signed(&payload, now);

        let id = engine.commit(PairId(1), &req, now).unwrap();
        assert!(engine.next_pair_for(&req.wallet, MarketId(1)).unwrap().is_none());

        engine
            .advance_round(RoundId(1), RoundPhase::Reveal, now)
            .unwrap();
        engine
            .reveal(id, &req.wallet, &payload.encode_v1(), now)
            .unwrap();

        let tally = engine.tally(PairId(1)).unwrap();
        assert_eq!(tally.votes_b, 1);
        assert_eq!(tally.stake_b, 25);
        assert!(engine.commitment(id).unwrap().revealed);
        assert!(matches!(
            engine.tally(PairId(2)),
            Err(CuriaError::NotFound(_))
        ));
    }
}
