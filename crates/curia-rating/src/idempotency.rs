//! Match idempotency guard: each `MatchId` moves ratings at most once.
//!
//! Re-applying a match returns [`CuriaError::MatchAlreadyRated`]. The guard
//! keeps a bounded insertion-ordered cache so memory stays predictable in
//! long-running nodes.

use std::collections::{HashSet, VecDeque};

use curia_types::{CuriaError, MatchId, Result};

#[derive(Debug)]
pub struct MatchIdempotencyGuard {
    rated: HashSet<MatchId>,
    /// Front = oldest.
    order: VecDeque<MatchId>,
    max_size: usize,
}

impl MatchIdempotencyGuard {
    /// # Errors
    /// [`CuriaError::Configuration`] if `max_size` is zero.
    pub fn new(max_size: usize) -> Result<Self> {
        if max_size == 0 {
            return Err(CuriaError::Configuration(
                "idempotency cache size must be > 0".into(),
            ));
        }
        Ok(Self {
            rated: HashSet::with_capacity(max_size.min(4096)),
            order: VecDeque::with_capacity(max_size.min(4096)),
            max_size,
        })
    }

    /// Fail if `match_id` was already rated.
    pub fn check(&self, match_id: MatchId) -> Result<()> {
        if self.rated.contains(&match_id) {
            return Err(CuriaError::MatchAlreadyRated(match_id));
        }
        Ok(())
    }

    /// Record `match_id`, evicting the oldest entry at capacity.
    pub fn mark_rated(&mut self, match_id: MatchId) -> Result<()> {
        self.check(match_id)?;
        if self.rated.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.rated.remove(&oldest);
            }
        }
        self.rated.insert(match_id);
        self.order.push_back(match_id);
        Ok(())
    }

    pub fn is_rated(&self, match_id: &MatchId) -> bool {
        self.rated.contains(match_id)
    }

    pub fn len(&self) -> usize {
        self.rated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rated.is_empty()
    }
}
