//! Next-pair selection for the curation UI.

use curia_types::constants::ELIGIBLE_CURATION_PHASES;
use curia_types::{MarketId, Pair, RoundPhase, WalletAddress};

use crate::ledger::RoundLedger;

/// Phases in which pairs are handed out to curators.
#[must_use]
pub fn is_eligible_curation_phase(phase: RoundPhase) -> bool {
    ELIGIBLE_CURATION_PHASES.contains(&phase)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PairSelector;

impl PairSelector {
    /// First pair, in creation order, that `curator` can still judge in
    /// `market`.
    ///
    /// Deterministic: two calls before a commit lands return the same pair.
    #[must_use]
    pub fn next_pair_for<'a>(
        ledger: &'a RoundLedger,
        curator: &WalletAddress,
        market_id: MarketId,
    ) -> Option<&'a Pair> {
        ledger.pairs().find(|pair| {
            let Ok(round) = ledger.round(pair.round_id) else {
                return false;
            };
            round.market_id == market_id
                && is_eligible_curation_phase(round.phase)
                && !ledger
                    .store()
                    .find(pair.id, curator)
                    .is_some_and(|c| !c.non_reveal_penalized)
        })
    }
}
