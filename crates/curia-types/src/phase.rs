//! Round lifecycle phases.
//!
//! Every round moves forward through five phases:
//! **SETUP → COMMIT → REVEAL → SCORED → CLOSED**
//!
//! During COMMIT, curators submit hidden votes on the round's pairs.
//! During REVEAL, curators disclose the votes they committed.
//! Entering SCORED penalizes every commitment that was never revealed.
//! CLOSED is terminal.
//!
//! Phases cross the wire as upper-case strings. Decoding is exhaustive and
//! unknown strings fail with [`CuriaError::UnknownPhase`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::CuriaError;

/// The five forward-only phases of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoundPhase {
    /// Pairs are being assembled; nothing is accepted yet.
    Setup,
    /// Accepting commitments.
    Commit,
    /// Accepting reveals of earlier commitments.
    Reveal,
    /// Reveal window closed; non-revealers have been penalized.
    Scored,
    /// Terminal.
    Closed,
}

impl RoundPhase {
    /// Every phase, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Setup,
        Self::Commit,
        Self::Reveal,
        Self::Scored,
        Self::Closed,
    ];

    /// The wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "SETUP",
            Self::Commit => "COMMIT",
            Self::Reveal => "REVEAL",
            Self::Scored => "SCORED",
            Self::Closed => "CLOSED",
        }
    }

    /// The following phase, or `None` from CLOSED.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Setup => Some(Self::Commit),
            Self::Commit => Some(Self::Reveal),
            Self::Reveal => Some(Self::Scored),
            Self::Scored => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    /// Whether no further transition exists.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }

    /// Transitions never go backwards. Staying in place is allowed so that
    /// a repeated trigger from the scheduler is harmless.
    #[must_use]
    pub fn can_advance_to(self, target: Self) -> bool {
        target >= self
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundPhase {
    type Err = CuriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SETUP" => Ok(Self::Setup),
            "COMMIT" => Ok(Self::Commit),
            "REVEAL" => Ok(Self::Reveal),
            "SCORED" => Ok(Self::Scored),
            "CLOSED" => Ok(Self::Closed),
            _ => Err(CuriaError::UnknownPhase(s.to_string())),
        }
    }
}

impl TryFrom<String> for RoundPhase {
    type Error = CuriaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoundPhase> for String {
    fn from(phase: RoundPhase) -> Self {
        phase.as_str().to_string()
    }
}
