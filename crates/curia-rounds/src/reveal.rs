//! Reveal processing.
//!
//! Binding is decrypt-then-compare: the stored envelope is opened under the
//! key id recorded on the commitment, decoded, and compared with what the
//! curator discloses. The disclosed payload is then re-hashed against the
//! stored commitment hash. Any mismatch flags the commitment suspect and is
//! returned as [`CuriaError::RevealMismatch`]; nothing is dropped. Once a
//! commitment is revealed, a repeat with the same payload is a no-op and a
//! different payload is refused with [`CuriaError::AlreadyRevealed`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use curia_envelope::codec::{self, PayloadFormat, RevealPayload};
use curia_envelope::storage::open_from_storage;
use curia_envelope::KeyRing;
use curia_types::{Choice, CommitmentId, CuriaError, Result, WalletAddress};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ledger::RoundLedger;
use crate::phase_machine::RoundPhaseMachine;

/// Result of an accepted reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revealed {
    pub commitment_id: CommitmentId,
    pub outcome: Choice,
    /// The commitment was already revealed with this payload; nothing changed.
    pub already_revealed: bool,
}

#[derive(Debug, Clone)]
pub struct RevealProcessor {
    keys: Arc<KeyRing>,
    allow_legacy_decode: bool,
}

impl RevealProcessor {
    #[must_use]
    pub fn new(keys: Arc<KeyRing>, allow_legacy_decode: bool) -> Self {
        Self {
            keys,
            allow_legacy_decode,
        }
    }

    /// Reveal `commitment_id` with the curator's disclosed payload bytes
    /// (v1, or the legacy text form when legacy decode is enabled).
    ///
    /// # Errors
    /// - [`CuriaError::NotFound`]: no such commitment for this curator
    /// - [`CuriaError::PhaseViolation`]: round is not in REVEAL
    /// - [`CuriaError::MalformedRequest`]: disclosed bytes do not decode
    /// - [`CuriaError::RevealMismatch`]: disclosed payload does not bind
    /// - [`CuriaError::AlreadyRevealed`]: revealed before, with another payload
    /// - [`CuriaError::UnknownKeyId`]: stored key id is not in the ring
    pub fn reveal(
        &self,
        ledger: &mut RoundLedger,
        commitment_id: CommitmentId,
        curator: &WalletAddress,
        disclosed: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Revealed> {
        let commitment = ledger
            .store()
            .get(&commitment_id)
            .filter(|c| &c.curator == curator)
            .ok_or_else(|| CuriaError::NotFound(commitment_id.to_string()))?;
        RoundPhaseMachine::require_reveal(ledger.round(commitment.round_id)?)?;

        let (disclosed, format) = RevealPayload::decode(disclosed, self.allow_legacy_decode)?;
        if format == PayloadFormat::Legacy {
            info!(commitment = %commitment_id, "Reveal decoded with legacy payload format");
        }

        let stored_bytes =
            open_from_storage(&self.keys, &commitment.key_id, &commitment.encrypted_payload)?;
        let (stored, _) = RevealPayload::decode(&stored_bytes, self.allow_legacy_decode)?;

        let rehashed = codec::compute_commitment_hash(
            &commitment.curator,
            commitment.pair_id,
            disclosed.choice,
            commitment.stake_amount,
            &disclosed.nonce,
        );
        let mismatch = if stored != disclosed {
            Some("disclosed payload differs from committed payload")
        } else if rehashed != commitment.commitment_hash {
            Some("disclosed payload does not hash to the commitment")
        } else {
            None
        };

        // Settled reveals are never re-judged or flagged.
        if commitment.revealed {
            if mismatch.is_some() {
                return Err(CuriaError::AlreadyRevealed(commitment_id));
            }
            return Ok(Revealed {
                commitment_id,
                outcome: commitment.outcome.unwrap_or(disclosed.choice),
                already_revealed: true,
            });
        }

        let commitment = ledger
            .store_mut()
            .get_mut(&commitment_id)
            .ok_or_else(|| CuriaError::NotFound(commitment_id.to_string()))?;

        if let Some(reason) = mismatch {
            commitment.flag_suspect();
            warn!(
                commitment = %commitment_id,
                curator = %commitment.curator.short(),
                attempts = commitment.mismatch_count,
                reason,
                "Reveal mismatch, commitment flagged suspect"
            );
            return Err(CuriaError::RevealMismatch {
                commitment: commitment_id,
                reason: reason.to_string(),
            });
        }

        commitment.mark_revealed(disclosed.choice, now)?;
        info!(
            commitment = %commitment_id,
            pair = %commitment.pair_id,
            "Commitment revealed"
        );
        Ok(Revealed {
            commitment_id,
            outcome: disclosed.choice,
            already_revealed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use curia_envelope::storage::seal_for_storage;
    use curia_envelope::{SecuredCommitment, StorageKey};
    use curia_types::{KeyId, MarketId, Pair, PairId, RoundId, RoundPhase};

    use super::*;

    struct Fixture {
        ledger: RoundLedger,
        processor: RevealProcessor,
        id: CommitmentId,
        curator: WalletAddress,
        payload: RevealPayload,
    }

    fn fixture() -> Fixture {
        let now = Utc::now();
        let keys = Arc::new(KeyRing::new(KeyId::new("v1"), StorageKey::generate()));
        let curator = WalletAddress::new("curator-1");
        let payload = RevealPayload::random(Choice::B);

        let mut ledger = RoundLedger::new();
        ledger.open_round(RoundId(1), MarketId(1), now).unwrap();
        ledger.add_pair(Pair::dummy(1, RoundId(1))).unwrap();
        ledger
            .advance_round(RoundId(1), RoundPhase::Commit, now)
            .unwrap();

        let (key_id, encrypted_payload) = seal_for_storage(&keys, &payload.encode_v1()).unwrap();
        let secured = SecuredCommitment {
            commitment_hash: codec::compute_commitment_hash(
                &curator,
                PairId(1),
                payload.choice,
                50,
                &payload.nonce,
            ),
            encrypted_payload,
            key_id,
            signed: true,
        };
        let id = ledger
            .submit(PairId(1), curator.clone(), 50, secured, now)
            .unwrap();
        Fixture {
            ledger,
            processor: RevealProcessor::new(keys, true),
            id,
            curator,
            payload,
        }
    }

    fn to_reveal(f: &mut Fixture) {
        f.ledger
            .advance_round(RoundId(1), RoundPhase::Reveal, Utc::now())
            .unwrap();
    }

    #[test]
    fn reveal_before_window_is_phase_violation() {
        let mut f = fixture();
        let err = f
            .processor
            .reveal(&mut f.ledger, f.id, &f.curator, &f.payload.encode_v1(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CuriaError::PhaseViolation { .. }));
        assert!(!f.ledger.store().get(&f.id).unwrap().revealed);
    }

    #[test]
    fn matching_reveal_succeeds_and_is_idempotent() {
        let mut f = fixture();
        to_reveal(&mut f);
        let bytes = f.payload.encode_v1();

        let first = f
            .processor
            .reveal(&mut f.ledger, f.id, &f.curator, &bytes, Utc::now())
            .unwrap();
        assert_eq!(first.outcome, Choice::B);
        assert!(!first.already_revealed);

        let second = f
            .processor
            .reveal(&mut f.ledger, f.id, &f.curator, &bytes, Utc::now())
            .unwrap();
        assert!(second.already_revealed);
        assert_eq!(second.outcome, Choice::B);

        let c = f.ledger.store().get(&f.id).unwrap();
        assert!(c.revealed);
        assert_eq!(c.outcome, Some(Choice::B));
    }

    #[test]
    fn legacy_disclosure_accepted_when_enabled() {
        let mut f = fixture();
        to_reveal(&mut f);
        let legacy = f.payload.encode_legacy();
        let out = f
            .processor
            .reveal(&mut f.ledger, f.id, &f.curator, &legacy, Utc::now())
            .unwrap();
        assert_eq!(out.outcome, Choice::B);

        let mut strict = fixture();
        strict.processor = RevealProcessor::new(Arc::clone(&strict.processor.keys), false);
        to_reveal(&mut strict);
        assert!(matches!(
            strict.processor.reveal(
                &mut strict.ledger,
                strict.id,
                &strict.curator,
                &legacy,
                Utc::now()
            ),
            Err(CuriaError::MalformedRequest { .. })
        ));
    }

    #[test]
    fn flipped_choice_is_mismatch_and_flags_suspect() {
        let mut f = fixture();
        to_reveal(&mut f);
        let lie = RevealPayload::new(Choice::A, f.payload.nonce);

        let err = f
            .processor
            .reveal(&mut f.ledger, f.id, &f.curator, &lie.encode_v1(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CuriaError::RevealMismatch { .. }));
        let c = f.ledger.store().get(&f.id).unwrap();
        assert!(c.suspect);
        assert!(!c.revealed);

        // The honest reveal still goes through afterwards.
        f.processor
            .reveal(&mut f.ledger, f.id, &f.curator, &f.payload.encode_v1(), Utc::now())
            .unwrap();
    }

    #[test]
    fn conflicting_repeat_after_reveal_is_refused_without_flagging() {
        let mut f = fixture();
        to_reveal(&mut f);
        f.processor
            .reveal(&mut f.ledger, f.id, &f.curator, &f.payload.encode_v1(), Utc::now())
            .unwrap();

        let other = RevealPayload::new(Choice::A, f.payload.nonce);
        let err = f
            .processor
            .reveal(&mut f.ledger, f.id, &f.curator, &other.encode_v1(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CuriaError::AlreadyRevealed(id) if id == f.id), "got {err:?}");

        let c = f.ledger.store().get(&f.id).unwrap();
        assert!(!c.suspect);
        assert_eq!(c.mismatch_count, 0);
        assert_eq!(c.outcome, Some(Choice::B));
    }

    #[test]
    fn other_curator_cannot_reveal() {
        let mut f = fixture();
        to_reveal(&mut f);
        let err = f
            .processor
            .reveal(
                &mut f.ledger,
                f.id,
                &WalletAddress::new("intruder"),
                &f.payload.encode_v1(),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, CuriaError::NotFound(_)));
        assert!(!f.ledger.store().get(&f.id).unwrap().suspect);
    }

    #[test]
    fn missing_key_is_unknown_key_id() {
        let mut f = fixture();
        to_reveal(&mut f);
        f.processor = RevealProcessor::new(
            Arc::new(KeyRing::new(KeyId::new("other"), StorageKey::generate())),
            true,
        );
        let err = f
            .processor
            .reveal(&mut f.ledger, f.id, &f.curator, &f.payload.encode_v1(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CuriaError::UnknownKeyId(_)));
        assert!(!err.is_retryable());
    }
}
