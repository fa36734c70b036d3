//! Curator standing.
//!
//! Observations from scored rounds accumulate per wallet into golden, audit
//! and consensus hit rates plus a count of fraud flags. Two scores come out:
//!
//! - the **curator score** is earned; an unobserved rate contributes nothing.
//!   It sets voting power.
//! - the **blended score** gates rewards and suspension; an unobserved rate
//!   is neutral, so a new curator is not slashed before any evidence exists.
//!
//! Each commitment is counted once no matter how often its round is fed in.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use curia_types::constants::{
    BLENDED_SCORE_WEIGHTS, CURATOR_SCORE_WEIGHTS, FRAUD_PENALTY_PER_FLAG, FULL_REWARD_THRESHOLD,
    MAX_COUNTED_FRAUD_FLAGS, MAX_VOTING_POWER, MIN_VOTING_POWER, REDUCED_REWARD_THRESHOLD,
    REWARD_MULTIPLIERS,
};
use curia_types::{
    CommitmentId, CuratorObservation, CuratorStanding, CuriaError, ObservationKind, Result,
    WalletAddress,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
struct HitRate {
    total: u32,
    hits: u32,
}

impl HitRate {
    fn record(&mut self, hit: bool) {
        self.total = self.total.saturating_add(1);
        if hit {
            self.hits = self.hits.saturating_add(1);
        }
    }

    fn rate(self) -> Option<f64> {
        (self.total > 0).then(|| f64::from(self.hits) / f64::from(self.total))
    }
}

#[derive(Debug, Clone)]
struct CuratorRecord {
    golden: HitRate,
    audit: HitRate,
    consensus: HitRate,
    fraud_flags: u32,
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CuratorLedger {
    records: HashMap<WalletAddress, CuratorRecord>,
    counted: HashSet<CommitmentId>,
}

#[derive(Debug, Default)]
pub struct CuratorScorer {
    ledger: Mutex<CuratorLedger>,
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn fraud_penalty(flags: u32) -> f64 {
    f64::from(flags.min(MAX_COUNTED_FRAUD_FLAGS)) * FRAUD_PENALTY_PER_FLAG
}

/// `0.40·calibration + 0.25·alignment + 0.20·audit − 0.15·fraud`, clamped to
/// `[0, 1]` and rounded to four places. Missing rates count as zero.
#[must_use]
pub fn curator_score(
    calibration: Option<f64>,
    alignment: Option<f64>,
    audit_pass: Option<f64>,
    fraud_flags: u32,
) -> f64 {
    let [w_cal, w_align, w_audit, w_fraud] = CURATOR_SCORE_WEIGHTS;
    let raw = w_cal * calibration.unwrap_or(0.0) + w_align * alignment.unwrap_or(0.0)
        + w_audit * audit_pass.unwrap_or(0.0)
        - w_fraud * fraud_penalty(fraud_flags);
    round4(raw.clamp(0.0, 1.0))
}

/// Weighted blend of golden, audit, consensus and behavioral scores.
#[must_use]
pub fn blended_score(golden: f64, audit: f64, consensus: f64, behavioral: f64) -> f64 {
    let [w_golden, w_audit, w_consensus, w_behavioral] = BLENDED_SCORE_WEIGHTS;
    let raw = w_golden * golden
        + w_audit * audit
        + w_consensus * consensus
        + w_behavioral * behavioral;
    round4(raw.clamp(0.0, 1.0))
}

/// Full rewards at 0.60 and above, half from 0.40, slashed below.
#[must_use]
pub fn reward_multiplier(blended: f64) -> f64 {
    let [full, reduced, slashed] = REWARD_MULTIPLIERS;
    if blended >= FULL_REWARD_THRESHOLD {
        full
    } else if blended >= REDUCED_REWARD_THRESHOLD {
        reduced
    } else {
        slashed
    }
}

#[must_use]
pub fn should_suspend(blended: f64) -> bool {
    blended < REDUCED_REWARD_THRESHOLD
}

/// Twice the curator score, held within one to two votes.
#[must_use]
pub fn voting_power(curator_score: f64) -> f64 {
    (curator_score * 2.0).clamp(MIN_VOTING_POWER, MAX_VOTING_POWER)
}

impl CuratorRecord {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            golden: HitRate::default(),
            audit: HitRate::default(),
            consensus: HitRate::default(),
            fraud_flags: 0,
            last_updated: now,
        }
    }

    fn standing(&self, wallet: &WalletAddress) -> CuratorStanding {
        let calibration_rate = self.golden.rate();
        let audit_pass_rate = self.audit.rate();
        let consensus_rate = self.consensus.rate();

        let score = curator_score(
            calibration_rate,
            consensus_rate,
            audit_pass_rate,
            self.fraud_flags,
        );
        let blended = blended_score(
            calibration_rate.unwrap_or(1.0),
            audit_pass_rate.unwrap_or(1.0),
            consensus_rate.unwrap_or(1.0),
            1.0 - fraud_penalty(self.fraud_flags),
        );
        CuratorStanding {
            wallet: wallet.clone(),
            calibration_rate,
            audit_pass_rate,
            consensus_rate,
            fraud_flags: self.fraud_flags,
            curator_score: score,
            blended_score: blended,
            reward_multiplier: reward_multiplier(blended),
            suspended: should_suspend(blended),
            voting_power: voting_power(score),
            last_updated: self.last_updated,
        }
    }
}

impl CuratorScorer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, CuratorLedger>> {
        self.ledger
            .lock()
            .map_err(|_| CuriaError::Internal("curator ledger lock poisoned".into()))
    }

    /// Fold observations into curator records. Returns how many were new;
    /// commitments seen before are skipped.
    pub fn record(&self, observations: &[CuratorObservation], now: DateTime<Utc>) -> Result<usize> {
        let mut ledger = self.lock()?;
        let mut counted = 0;
        let mut touched = HashSet::new();
        for obs in observations {
            if !ledger.counted.insert(obs.commitment_id) {
                continue;
            }
            let record = ledger
                .records
                .entry(obs.curator.clone())
                .or_insert_with(|| CuratorRecord::new(now));
            if let Some(hit) = obs.correct {
                match obs.kind {
                    ObservationKind::Golden => record.golden.record(hit),
                    ObservationKind::Audit => record.audit.record(hit),
                    ObservationKind::Consensus => record.consensus.record(hit),
                }
            }
            if obs.suspect {
                record.fraud_flags = record.fraud_flags.saturating_add(1);
            }
            record.last_updated = now;
            touched.insert(&obs.curator);
            counted += 1;
        }

        for wallet in touched {
            if let Some(standing) = ledger.records.get(wallet).map(|r| r.standing(wallet)) {
                if standing.suspended {
                    warn!(
                        curator = %wallet.short(),
                        blended = standing.blended_score,
                        "Curator below suspension threshold"
                    );
                }
            }
        }
        info!(observations = observations.len(), counted, "Curator observations recorded");
        Ok(counted)
    }

    /// Standing of one curator, or `None` if never observed.
    pub fn standing(&self, wallet: &WalletAddress) -> Result<Option<CuratorStanding>> {
        Ok(self
            .lock()?
            .records
            .get(wallet)
            .map(|record| record.standing(wallet)))
    }

    /// Every observed curator, best blended score first. Ties break on wallet.
    pub fn standings(&self) -> Result<Vec<CuratorStanding>> {
        let ledger = self.lock()?;
        let mut all: Vec<_> = ledger
            .records
            .iter()
            .map(|(wallet, record)| record.standing(wallet))
            .collect();
        all.sort_by(|a, b| {
            b.blended_score
                .total_cmp(&a.blended_score)
                .then_with(|| a.wallet.cmp(&b.wallet))
        });
        Ok(all)
    }
}
