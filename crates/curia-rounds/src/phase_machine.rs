//! # Round Phase Machine
//!
//! ```text
//!   SETUP ──▶ COMMIT ──▶ REVEAL ──▶ SCORED ──▶ CLOSED
//! ```
//!
//! Transitions are forward-only and triggered from outside (scheduler or
//! operator). Jumps are allowed: every skipped phase's entry hook runs in
//! order, so `COMMIT → SCORED` still penalizes non-revealers. Re-entering
//! the current phase re-runs its hook, which is idempotent.
//!
//! `SCORED` entry is the only place non-reveal penalties are assessed.

use chrono::{DateTime, Utc};
use curia_types::{CuriaError, Result, Round, RoundId, RoundPhase};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::store::CommitmentStore;

/// Outcome of one `advance` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransitionReport {
    pub round_id: RoundId,
    pub from: RoundPhase,
    pub to: RoundPhase,
    /// Phases whose entry hooks ran, in order.
    pub entered: Vec<RoundPhase>,
    /// Commitments newly flagged `non_reveal_penalized`.
    pub penalties_applied: usize,
}

/// Predicates, guards and the transition driver for round phases.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundPhaseMachine;

impl RoundPhaseMachine {
    #[must_use]
    pub fn can_accept_commit(round: &Round) -> bool {
        round.phase == RoundPhase::Commit
    }

    #[must_use]
    pub fn can_accept_reveal(round: &Round) -> bool {
        round.phase == RoundPhase::Reveal
    }

    /// # Errors
    /// [`CuriaError::PhaseViolation`] outside `COMMIT`.
    pub fn require_commit(round: &Round) -> Result<()> {
        Self::require(round, RoundPhase::Commit, "commit")
    }

    /// # Errors
    /// [`CuriaError::PhaseViolation`] outside `REVEAL`.
    pub fn require_reveal(round: &Round) -> Result<()> {
        Self::require(round, RoundPhase::Reveal, "reveal")
    }

    /// Curators are scored once the reveal window has closed.
    ///
    /// # Errors
    /// [`CuriaError::PhaseViolation`] before `SCORED`.
    pub fn require_scored(round: &Round) -> Result<()> {
        if round.phase >= RoundPhase::Scored {
            return Ok(());
        }
        Self::require(round, RoundPhase::Scored, "score curators")
    }

    fn require(round: &Round, required: RoundPhase, operation: &'static str) -> Result<()> {
        if round.phase == required {
            return Ok(());
        }
        Err(CuriaError::PhaseViolation {
            round: round.id,
            operation,
            required,
            actual: round.phase,
        })
    }

    /// Move `round` to `target`, running each entered phase's hook.
    ///
    /// # Errors
    /// [`CuriaError::InvalidPhaseTransition`] if `target` is behind the
    /// current phase. Nothing is mutated in that case.
    pub fn advance(
        round: &mut Round,
        store: &mut CommitmentStore,
        target: RoundPhase,
        now: DateTime<Utc>,
    ) -> Result<PhaseTransitionReport> {
        let from = round.phase;
        if !from.can_advance_to(target) {
            return Err(CuriaError::InvalidPhaseTransition {
                round: round.id,
                from,
                to: target,
            });
        }

        let mut report = PhaseTransitionReport {
            round_id: round.id,
            from,
            to: target,
            entered: Vec::new(),
            penalties_applied: 0,
        };

        if from == target {
            report.penalties_applied = Self::on_enter(round, store, target, now);
            report.entered.push(target);
            debug!(round = %round.id, phase = %target, "Phase re-entered");
            return Ok(report);
        }

        let mut phase = from;
        while let Some(next) = phase.next() {
            if next > target {
                break;
            }
            round.phase = next;
            round.phase_entered_at = now;
            report.penalties_applied += Self::on_enter(round, store, next, now);
            report.entered.push(next);
            phase = next;
        }

        info!(
            round = %round.id,
            from = %from,
            to = %target,
            penalties = report.penalties_applied,
            "Round phase advanced"
        );
        Ok(report)
    }

    fn on_enter(
        round: &mut Round,
        store: &mut CommitmentStore,
        phase: RoundPhase,
        now: DateTime<Utc>,
    ) -> usize {
        match phase {
            RoundPhase::Scored => Self::on_enter_scored(round, store, now),
            // Entering REVEAL mutates nothing; it only opens the reveal guard.
            RoundPhase::Setup | RoundPhase::Commit | RoundPhase::Reveal | RoundPhase::Closed => 0,
        }
    }

    /// Penalize every commitment of the round still unrevealed. Runs its
    /// sweep once per round; later calls return 0.
    fn on_enter_scored(round: &mut Round, store: &mut CommitmentStore, now: DateTime<Utc>) -> usize {
        if round.penalties_assessed {
            return 0;
        }
        let penalized = store.penalize_unrevealed(round.id, now);
        round.penalties_assessed = true;
        if penalized > 0 {
            info!(round = %round.id, penalized, "Non-reveal penalties assessed");
        }
        penalized
    }
}
