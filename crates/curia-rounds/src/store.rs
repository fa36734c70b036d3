//! Commitment store.
//!
//! Holds every commitment by id, with a `(pair, curator)` index enforcing
//! one commitment per curator per pair. Listings come back in submission
//! order. Phase gating is the ledger's job; the store only guards its own
//! invariants.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use curia_types::{
    Commitment, CommitmentId, CuriaError, KeyId, PairId, Result, RoundId, WalletAddress,
};
use tracing::info;

/// Fields of a commitment that passed admission.
#[derive(Debug, Clone)]
pub struct NewCommitment {
    pub pair_id: PairId,
    pub round_id: RoundId,
    pub curator: WalletAddress,
    pub commitment_hash: String,
    pub stake_amount: u64,
    pub encrypted_payload: String,
    pub key_id: KeyId,
    pub signed: bool,
}

#[derive(Debug, Default)]
pub struct CommitmentStore {
    commitments: HashMap<CommitmentId, Commitment>,
    by_pair_curator: HashMap<(PairId, WalletAddress), CommitmentId>,
    /// Submission order.
    order: Vec<CommitmentId>,
}

impl CommitmentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new commitment.
    ///
    /// # Errors
    /// [`CuriaError::DuplicateCommitment`] if the curator already holds a
    /// commitment on this pair. Resubmission never overwrites.
    pub fn submit(&mut self, new: NewCommitment, now: DateTime<Utc>) -> Result<CommitmentId> {
        let key = (new.pair_id, new.curator.clone());
        if self.by_pair_curator.contains_key(&key) {
            return Err(CuriaError::DuplicateCommitment {
                pair: new.pair_id,
                curator: new.curator.to_string(),
            });
        }

        let commitment = Commitment {
            id: CommitmentId::new(),
            pair_id: new.pair_id,
            round_id: new.round_id,
            curator: new.curator,
            commitment_hash: new.commitment_hash,
            stake_amount: new.stake_amount,
            encrypted_payload: new.encrypted_payload,
            key_id: new.key_id,
            signed: new.signed,
            committed_at: now,
            revealed: false,
            revealed_at: None,
            outcome: None,
            non_reveal_penalized: false,
            penalized_at: None,
            suspect: false,
            mismatch_count: 0,
        };
        let id = commitment.id;
        info!(
            commitment = %id,
            pair = %commitment.pair_id,
            round = %commitment.round_id,
            curator = %commitment.curator.short(),
            stake = commitment.stake_amount,
            "Commitment recorded"
        );
        self.by_pair_curator.insert(key, id);
        self.commitments.insert(id, commitment);
        self.order.push(id);
        Ok(id)
    }

    #[must_use]
    pub fn get(&self, id: &CommitmentId) -> Option<&Commitment> {
        self.commitments.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &CommitmentId) -> Option<&mut Commitment> {
        self.commitments.get_mut(id)
    }

    /// The curator's commitment on a pair, if any.
    #[must_use]
    pub fn find(&self, pair_id: PairId, curator: &WalletAddress) -> Option<&Commitment> {
        self.by_pair_curator
            .get(&(pair_id, curator.clone()))
            .and_then(|id| self.commitments.get(id))
    }

    #[must_use]
    pub fn contains(&self, pair_id: PairId, curator: &WalletAddress) -> bool {
        self.by_pair_curator
            .contains_key(&(pair_id, curator.clone()))
    }

    fn iter(&self) -> impl Iterator<Item = &Commitment> {
        self.order.iter().filter_map(|id| self.commitments.get(id))
    }

    #[must_use]
    pub fn list_by_pair(&self, pair_id: PairId) -> Vec<&Commitment> {
        self.iter().filter(|c| c.pair_id == pair_id).collect()
    }

    /// Revealed commitments on a pair, i.e. the votes that count.
    #[must_use]
    pub fn list_by_pair_revealed(&self, pair_id: PairId) -> Vec<&Commitment> {
        self.iter()
            .filter(|c| c.pair_id == pair_id && c.revealed)
            .collect()
    }

    #[must_use]
    pub fn list_by_curator(&self, curator: &WalletAddress) -> Vec<&Commitment> {
        self.iter().filter(|c| &c.curator == curator).collect()
    }

    /// Every commitment with `revealed == false`, penalized or not.
    #[must_use]
    pub fn list_unrevealed(&self) -> Vec<&Commitment> {
        self.iter().filter(|c| !c.revealed).collect()
    }

    #[must_use]
    pub fn list_penalized(&self) -> Vec<&Commitment> {
        self.iter().filter(|c| c.non_reveal_penalized).collect()
    }

    /// Commitments with at least one failed reveal attempt.
    #[must_use]
    pub fn list_suspect(&self) -> Vec<&Commitment> {
        self.iter().filter(|c| c.suspect).collect()
    }

    /// Number of distinct pairs in a round holding at least one commitment.
    #[must_use]
    pub fn count_distinct_committed_pairs(&self, round_id: RoundId) -> usize {
        self.commitments
            .values()
            .filter(|c| c.round_id == round_id)
            .map(|c| c.pair_id)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Penalize every unrevealed, unpenalized commitment of a round.
    /// Returns how many were newly penalized.
    pub(crate) fn penalize_unrevealed(&mut self, round_id: RoundId, now: DateTime<Utc>) -> usize {
        self.commitments
            .values_mut()
            .filter(|c| c.round_id == round_id)
            .map(|c| c.penalize_non_reveal(now))
            .filter(|newly| *newly)
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commitments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commitments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use curia_types::Choice;

    use super::*;

    fn new(pair: u64, round: u64, curator: &str) -> NewCommitment {
        NewCommitment {
            pair_id: PairId(pair),
            round_id: RoundId(round),
            curator: WalletAddress::new(curator),
            commitment_hash: format!("0x{}", "ab".repeat(32)),
            stake_amount: 10,
            encrypted_payload: "{}".into(),
            key_id: KeyId::new("v1"),
            signed: true,
        }
    }

    #[test]
    fn submit_and_get() {
        let mut store = CommitmentStore::new();
        let id = store.submit(new(1, 1, "alice"), Utc::now()).unwrap();
        let c = store.get(&id).unwrap();
        assert_eq!(c.pair_id, PairId(1));
        assert!(c.is_pending());
        assert!(store.contains(PairId(1), &WalletAddress::new("alice")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_rejected_without_overwrite() {
        let mut store = CommitmentStore::new();
        let id = store.submit(new(1, 1, "alice"), Utc::now()).unwrap();
        let mut again = new(1, 1, "alice");
        again.stake_amount = 999;
        let err = store.submit(again, Utc::now()).unwrap_err();
        assert!(matches!(err, CuriaError::DuplicateCommitment { .. }));
        assert_eq!(store.get(&id).unwrap().stake_amount, 10);
        assert_eq!(store.len(), 1);

        // Another curator on the same pair is fine.
        store.submit(new(1, 1, "bob"), Utc::now()).unwrap();
    }

    #[test]
    fn projections() {
        let mut store = CommitmentStore::new();
        let a1 = store.submit(new(1, 1, "alice"), Utc::now()).unwrap();
        let b1 = store.submit(new(1, 1, "bob"), Utc::now()).unwrap();
        let a2 = store.submit(new(2, 1, "alice"), Utc::now()).unwrap();
        store.submit(new(3, 2, "carol"), Utc::now()).unwrap();

        let ids = |v: Vec<&Commitment>| v.into_iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids(store.list_by_pair(PairId(1))), vec![a1, b1]);
        assert_eq!(ids(store.list_by_curator(&WalletAddress::new("alice"))), vec![a1, a2]);
        assert_eq!(store.count_distinct_committed_pairs(RoundId(1)), 2);
        assert_eq!(store.count_distinct_committed_pairs(RoundId(2)), 1);

        store.get_mut(&a1).unwrap().mark_revealed(Choice::A, Utc::now()).unwrap();
        store.get_mut(&b1).unwrap().flag_suspect();
        assert_eq!(ids(store.list_by_pair_revealed(PairId(1))), vec![a1]);
        assert_eq!(store.list_unrevealed().len(), 3);
        assert_eq!(ids(store.list_suspect()), vec![b1]);
    }

    #[test]
    fn penalize_only_unrevealed_in_round_once() {
        let mut store = CommitmentStore::new();
        let revealed = store.submit(new(1, 1, "alice"), Utc::now()).unwrap();
        store.submit(new(1, 1, "bob"), Utc::now()).unwrap();
        store.submit(new(2, 2, "bob"), Utc::now()).unwrap();
        store
            .get_mut(&revealed)
            .unwrap()
            .mark_revealed(Choice::B, Utc::now())
            .unwrap();

        assert_eq!(store.penalize_unrevealed(RoundId(1), Utc::now()), 1);
        assert_eq!(store.penalize_unrevealed(RoundId(1), Utc::now()), 0);
        assert_eq!(store.list_penalized().len(), 1);
        assert!(!store.get(&revealed).unwrap().non_reveal_penalized);
    }
}
