//! Curator quality: per-commitment observations and the standing derived
//! from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CommitmentId, WalletAddress};

/// What a commitment was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationKind {
    /// Golden pair with a known answer.
    Golden,
    /// Audit pair with a reference answer.
    Audit,
    /// Normal pair, judged against its stake-weighted outcome.
    Consensus,
}

/// One scored commitment's contribution to its curator's standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratorObservation {
    pub commitment_id: CommitmentId,
    pub curator: WalletAddress,
    pub kind: ObservationKind,
    /// `None` when there was nothing to judge against (no reference answer,
    /// or a drawn pair). A commitment that was never revealed is `Some(false)`.
    pub correct: Option<bool>,
    /// The commitment was flagged for a reveal mismatch.
    pub suspect: bool,
}

/// A curator's derived standing. Rates are `None` until observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratorStanding {
    pub wallet: WalletAddress,
    pub calibration_rate: Option<f64>,
    pub audit_pass_rate: Option<f64>,
    pub consensus_rate: Option<f64>,
    pub fraud_flags: u32,
    /// Earned quality score in `[0, 1]`; drives voting power.
    pub curator_score: f64,
    /// Blended quality in `[0, 1]`; drives rewards and suspension.
    pub blended_score: f64,
    pub reward_multiplier: f64,
    pub suspended: bool,
    pub voting_power: f64,
    pub last_updated: DateTime<Utc>,
}
