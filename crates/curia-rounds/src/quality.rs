//! Curator observations from a scored round.
//!
//! Golden and audit commitments are judged against the pair's reference
//! answer; a commitment that was never revealed counts as a miss. Normal
//! commitments are judged against the stake-weighted outcome and only when
//! revealed, since non-revealers already carry their own penalty.

use curia_types::{Choice, Commitment, CuratorObservation, ObservationKind, Pair, Result, RoundId};
use tracing::debug;

use crate::ledger::RoundLedger;
use crate::phase_machine::RoundPhaseMachine;
use crate::tally::PairTally;

/// Every commitment in `round_id`, with what it says about its curator.
/// Ordered by pair id, then commit order.
///
/// # Errors
/// - [`curia_types::CuriaError::NotFound`]: unknown round
/// - [`curia_types::CuriaError::PhaseViolation`]: round not yet SCORED
pub fn curator_observations(
    ledger: &RoundLedger,
    round_id: RoundId,
) -> Result<Vec<CuratorObservation>> {
    RoundPhaseMachine::require_scored(ledger.round(round_id)?)?;

    let mut pairs = ledger.pairs_in_round(round_id);
    pairs.sort_by_key(|p| p.id);

    let mut observations = Vec::new();
    for pair in pairs {
        let kind = kind_of(pair);
        let reference = match kind {
            ObservationKind::Golden | ObservationKind::Audit => pair.reference_choice,
            ObservationKind::Consensus => {
                PairTally::for_pair(ledger.store(), pair.id).winning_choice()
            }
        };
        if reference.is_none() {
            debug!(pair = %pair.id, ?kind, "No reference answer, curators not judged");
        }
        let mut commitments = ledger.store().list_by_pair(pair.id);
        commitments.sort_by_key(|c| c.id);
        observations.extend(
            commitments
                .into_iter()
                .map(|c| observe(c, kind, reference)),
        );
    }
    Ok(observations)
}

fn kind_of(pair: &Pair) -> ObservationKind {
    if pair.is_golden {
        ObservationKind::Golden
    } else if pair.is_audit {
        ObservationKind::Audit
    } else {
        ObservationKind::Consensus
    }
}

fn observe(c: &Commitment, kind: ObservationKind, reference: Option<Choice>) -> CuratorObservation {
    let correct = reference.and_then(|expected| match (kind, c.outcome) {
        (_, Some(choice)) => Some(choice == expected),
        (ObservationKind::Consensus, None) => None,
        (_, None) => Some(false),
    });
    CuratorObservation {
        commitment_id: c.id,
        curator: c.curator.clone(),
        kind,
        correct,
        suspect: c.suspect,
    }
}
