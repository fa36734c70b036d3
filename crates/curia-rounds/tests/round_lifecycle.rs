//! End-to-end round lifecycle through the curation engine.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{TimeDelta, Utc};
use curia_envelope::{CommitRequest, HexWalletDirectory, RevealPayload};
use curia_rounds::CurationEngine;
use curia_types::{
    Choice, CommitSecurityConfig, CuriaError, MarketId, MatchOutcome, Pair, PairId, RoundId,
    RoundPhase, WalletAddress,
};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

struct Curator {
    key: SigningKey,
    wallet: WalletAddress,
}

impl Curator {
    fn new() -> Self {
        let key = SigningKey::generate(&mut OsRng);
        let wallet = WalletAddress::new(hex::encode(key.verifying_key().as_bytes()));
        Self { key, wallet }
    }

    fn commit_request(
        &self,
        pair: u64,
        payload: &RevealPayload,
        stake: u64,
        at: i64,
    ) -> CommitRequest {
        CommitRequest::sign(&self.key, self.wallet.clone(), PairId(pair), payload, stake, at)
            .unwrap()
    }
}

fn engine_with_round(pairs: u64) -> CurationEngine {
    let engine =
        CurationEngine::new(&CommitSecurityConfig::default(), Arc::new(HexWalletDirectory))
            .unwrap();
    let now = Utc::now();
    engine.open_round(RoundId(1), MarketId(7), now).unwrap();
    for id in 1..=pairs {
        engine.add_pair(Pair::dummy(id, RoundId(1))).unwrap();
    }
    engine
        .advance_round(RoundId(1), RoundPhase::Commit, now)
        .unwrap();
    engine
}

#[test]
fn full_round_reveal_success() {
    let engine = engine_with_round(1);
    let now = Utc::now();
    let curator = Curator::new();

    let pair = engine
        .next_pair_for(&curator.wallet, MarketId(7))
        .unwrap()
        .unwrap();
    let payload = RevealPayload::random(Choice::A);
    let id = engine
        .commit(pair.id, &curator.commit_request(1, &payload, 40, now.timestamp()), now)
        .unwrap();

    let stored = engine.commitment(id).unwrap();
    assert!(stored.signed);
    assert!(stored.is_pending());
    assert_eq!(stored.key_id.as_str(), "v1");

    engine
        .advance_round(RoundId(1), RoundPhase::Reveal, now)
        .unwrap();
    let revealed = engine
        .reveal(id, &curator.wallet, &payload.encode_v1(), now)
        .unwrap();
    assert_eq!(revealed.outcome, Choice::A);

    let report = engine
        .advance_round(RoundId(1), RoundPhase::Scored, now)
        .unwrap();
    assert_eq!(report.penalties_applied, 0);

    let tally = engine.tally(PairId(1)).unwrap();
    assert_eq!(tally.outcome(), Some(MatchOutcome::AgentAWins));
}

#[test]
fn never_revealed_is_penalized_at_scored() {
    let engine = engine_with_round(1);
    let now = Utc::now();
    let honest = Curator::new();
    let silent = Curator::new();

    let honest_payload = RevealPayload::random(Choice::B);
    let honest_id = engine
        .commit(
            PairId(1),
            &honest.commit_request(1, &honest_payload, 10, now.timestamp()),
            now,
        )
        .unwrap();
    let silent_id = engine
        .commit(
            PairId(1),
            &silent.commit_request(1, &RevealPayload::random(Choice::A), 99, now.timestamp()),
            now,
        )
        .unwrap();

    engine
        .advance_round(RoundId(1), RoundPhase::Reveal, now)
        .unwrap();
    engine
        .reveal(honest_id, &honest.wallet, &honest_payload.encode_v1(), now)
        .unwrap();
    let report = engine
        .advance_round(RoundId(1), RoundPhase::Scored, now)
        .unwrap();
    assert_eq!(report.penalties_applied, 1);

    let silent_c = engine.commitment(silent_id).unwrap();
    assert!(silent_c.non_reveal_penalized);
    assert!(!silent_c.revealed);
    assert!(!engine.commitment(honest_id).unwrap().non_reveal_penalized);

    // The penalized stake does not count toward the tally.
    let tally = engine.tally(PairId(1)).unwrap();
    assert_eq!(tally.outcome(), Some(MatchOutcome::AgentBWins));

    // Too late to reveal now.
    let err = engine
        .reveal(silent_id, &silent.wallet, &[0u8; 34], now)
        .unwrap_err();
    assert!(matches!(err, CuriaError::PhaseViolation { .. }));
}

#[test]
fn replayed_commit_rejected_inside_window_and_expired_after() {
    let engine = engine_with_round(2);
    let t0 = Utc::now();
    let curator = Curator::new();
    let req = curator.commit_request(1, &RevealPayload::random(Choice::A), 5, t0.timestamp());

    engine.commit(PairId(1), &req, t0).unwrap();
    assert_eq!(engine.replay_guard().len().unwrap(), 1);

    let err = engine
        .commit(PairId(1), &req, t0 + TimeDelta::seconds(5))
        .unwrap_err();
    assert!(matches!(err, CuriaError::DuplicateCommitment { .. }), "got {err:?}");

    // The same signed body against another pair: the message binds the
    // pair id, so the signature no longer verifies.
    let err = engine
        .commit(PairId(2), &req, t0 + TimeDelta::seconds(5))
        .unwrap_err();
    assert!(matches!(err, CuriaError::InvalidSignature { .. }), "got {err:?}");

    let window = i64::try_from(CommitSecurityConfig::default().replay_window_secs).unwrap();
    let later = t0 + TimeDelta::seconds(window + 1);
    engine.replay_guard().sweep_expired(later).unwrap();
    let err = engine.commit(PairId(2), &req, later).unwrap_err();
    assert!(matches!(err, CuriaError::Expired { .. }), "got {err:?}");
}

#[test]
fn concurrent_duplicate_commits_admit_exactly_one() {
    let engine = Arc::new(engine_with_round(1));
    let now = Utc::now();
    let curator = Arc::new(Curator::new());
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let curator = Arc::clone(&curator);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                // Distinct signed requests, so only the (pair, curator)
                // uniqueness rule can stop the losers.
                let req = curator.commit_request(
                    1,
                    &RevealPayload::random(Choice::A),
                    1 + i,
                    now.timestamp(),
                );
                barrier.wait();
                engine.commit(PairId(1), &req, now)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 1);
    for err in results.into_iter().filter_map(Result::err) {
        assert!(matches!(err, CuriaError::DuplicateCommitment { .. }), "got {err:?}");
    }
    assert_eq!(
        engine
            .with_ledger(|l| l.count_distinct_committed_pairs(RoundId(1)))
            .unwrap(),
        1
    );
}

#[test]
fn wallet_aliases_count_as_one_curator() {
    let engine = engine_with_round(1);
    let now = Utc::now();
    let curator = Curator::new();
    engine
        .commit(
            PairId(1),
            &curator.commit_request(1, &RevealPayload::random(Choice::A), 10, now.timestamp()),
            now,
        )
        .unwrap();

    // Same key, address typed as 0x-prefixed uppercase.
    let alias = format!("0x{}", curator.wallet.as_str().to_uppercase());
    let signed = CommitRequest::sign(
        &curator.key,
        WalletAddress::new(&alias),
        PairId(1),
        &RevealPayload::random(Choice::B),
        20,
        now.timestamp(),
    )
    .unwrap();
    let err = engine.commit(PairId(1), &signed, now).unwrap_err();
    assert!(matches!(err, CuriaError::DuplicateCommitment { .. }), "got {err:?}");

    // Same thing arriving over the wire with the alias in the JSON body.
    let mut wire = serde_json::to_value(curator.commit_request(
        1,
        &RevealPayload::random(Choice::B),
        30,
        now.timestamp(),
    ))
    .unwrap();
    wire["wallet"] = serde_json::Value::String(alias);
    let decoded: CommitRequest = serde_json::from_value(wire).unwrap();
    assert_eq!(decoded.wallet, curator.wallet);
    let err = engine.commit(PairId(1), &decoded, now).unwrap_err();
    assert!(matches!(err, CuriaError::DuplicateCommitment { .. }), "got {err:?}");

    let stored = engine
        .with_ledger(|l| l.store().list_by_pair(PairId(1)).len())
        .unwrap();
    assert_eq!(stored, 1);
}

#[test]
fn reveal_racing_scored_is_never_both_revealed_and_penalized() {
    for _ in 0..16 {
        let engine = Arc::new(engine_with_round(1));
        let now = Utc::now();
        let curator = Curator::new();
        let payload = RevealPayload::random(Choice::B);
        let id = engine
            .commit(
                PairId(1),
                &curator.commit_request(1, &payload, 3, now.timestamp()),
                now,
            )
            .unwrap();
        engine
            .advance_round(RoundId(1), RoundPhase::Reveal, now)
            .unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let revealer = {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            let wallet = curator.wallet.clone();
            let bytes = payload.encode_v1();
            thread::spawn(move || {
                barrier.wait();
                engine.reveal(id, &wallet, &bytes, now)
            })
        };
        let scorer = {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.advance_round(RoundId(1), RoundPhase::Scored, now)
            })
        };

        let reveal_result = revealer.join().unwrap();
        scorer.join().unwrap().unwrap();

        let c = engine.commitment(id).unwrap();
        assert!(!(c.revealed && c.non_reveal_penalized));
        assert_eq!(reveal_result.is_ok(), c.revealed);
        assert!(c.revealed || c.non_reveal_penalized);
    }
}

#[test]
fn calibration_pairs_are_served_but_marked() {
    let engine =
        CurationEngine::new(&CommitSecurityConfig::default(), Arc::new(HexWalletDirectory))
            .unwrap();
    let now = Utc::now();
    engine.open_round(RoundId(3), MarketId(1), now).unwrap();
    let mut golden = Pair::dummy(30, RoundId(3));
    golden.is_golden = true;
    engine.add_pair(golden).unwrap();
    engine
        .advance_round(RoundId(3), RoundPhase::Commit, now)
        .unwrap();

    let served = engine
        .next_pair_for(&Curator::new().wallet, MarketId(1))
        .unwrap()
        .unwrap();
    assert_eq!(served.id, PairId(30));
    assert!(!served.affects_ratings());
}
