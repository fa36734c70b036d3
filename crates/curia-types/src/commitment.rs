//! # Commitment: one curator's hidden vote on one pair
//!
//! ## Lifecycle
//!
//! ```text
//!   ┌───────────┐  reveal (REVEAL phase)   ┌──────────┐
//!   │ COMMITTED ├─────────────────────────▶│ REVEALED │
//!   └─────┬─────┘                          └──────────┘
//!         │ round enters SCORED
//!         ▼
//!   ┌───────────┐
//!   │ PENALIZED │
//!   └───────────┘
//! ```
//!
//! Both exits are terminal and mutually exclusive: a commitment is never
//! both `revealed` and `non_reveal_penalized`. `revealed` never goes back
//! to `false`.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CommitmentId, CuriaError, KeyId, PairId, Result, RoundId, WalletAddress};

/// Which of the pair's two items the curator judged better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Choice {
    A,
    B,
}

impl Choice {
    /// Byte used in hash preimages and reveal payloads.
    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            Self::A => b'A',
            Self::B => b'B',
        }
    }

    /// Decode a payload byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            b'A' => Ok(Self::A),
            b'B' => Ok(Self::B),
            other => Err(CuriaError::UnknownChoice(format!("0x{other:02x}"))),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Choice {
    type Err = CuriaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            other => Err(CuriaError::UnknownChoice(other.to_string())),
        }
    }
}

impl TryFrom<String> for Choice {
    type Error = CuriaError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Choice> for String {
    fn from(choice: Choice) -> Self {
        choice.as_str().to_string()
    }
}

/// A curator's hidden vote.
///
/// The choice itself lives only inside `encrypted_payload` until a
/// legitimate reveal copies it into `outcome`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commitment {
    pub id: CommitmentId,
    pub pair_id: PairId,
    pub round_id: RoundId,
    pub curator: WalletAddress,
    /// Normalized `0x`-prefixed SHA-256 commitment digest.
    pub commitment_hash: String,
    pub stake_amount: u64,
    /// Storage envelope (JSON) holding the encrypted reveal payload.
    pub encrypted_payload: String,
    /// Key ring id the payload was encrypted under.
    pub key_id: KeyId,
    /// Whether the request carried a verified signature envelope.
    pub signed: bool,
    pub committed_at: DateTime<Utc>,
    pub revealed: bool,
    pub revealed_at: Option<DateTime<Utc>>,
    /// Decoded choice, present once revealed.
    pub outcome: Option<Choice>,
    pub non_reveal_penalized: bool,
    pub penalized_at: Option<DateTime<Utc>>,
    /// Set when a reveal attempt did not bind to the stored payload.
    pub suspect: bool,
    pub mismatch_count: u32,
}

impl Commitment {
    /// Neither revealed nor penalized.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.revealed && !self.non_reveal_penalized
    }

    /// Record a successful reveal.
    ///
    /// # Errors
    /// Returns `Internal` if the commitment was already penalized; the phase
    /// guard should have rejected the reveal before reaching this point.
    pub fn mark_revealed(&mut self, outcome: Choice, now: DateTime<Utc>) -> Result<()> {
        if self.non_reveal_penalized {
            return Err(CuriaError::Internal(format!(
                "commitment {} is penalized and cannot be revealed",
                self.id
            )));
        }
        if self.revealed {
            return Ok(());
        }
        self.revealed = true;
        self.revealed_at = Some(now);
        self.outcome = Some(outcome);
        Ok(())
    }

    /// Apply the non-reveal penalty. Returns `true` only when the flag was
    /// newly set; revealed or already-penalized commitments are untouched.
    pub fn penalize_non_reveal(&mut self, now: DateTime<Utc>) -> bool {
        if self.revealed || self.non_reveal_penalized {
            return false;
        }
        self.non_reveal_penalized = true;
        self.penalized_at = Some(now);
        true
    }

    /// Flag a reveal attempt that did not bind.
    pub fn flag_suspect(&mut self) {
        self.suspect = true;
        self.mismatch_count = self.mismatch_count.saturating_add(1);
    }
}

/// Dummy commitment for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Commitment {
    pub fn dummy(pair_id: PairId, round_id: RoundId, curator: &str) -> Self {
        Self {
            id: CommitmentId::new(),
            pair_id,
            round_id,
            curator: WalletAddress::new(curator),
            commitment_hash: format!("0x{}", hex::encode(rand::random::<[u8; 32]>())),
            stake_amount: 1_000,
            encrypted_payload: String::new(),
            key_id: KeyId::new("v1"),
            signed: true,
            committed_at: Utc::now(),
            revealed: false,
            revealed_at: None,
            outcome: None,
            non_reveal_penalized: false,
            penalized_at: None,
            suspect: false,
            mismatch_count: 0,
        }
    }
}
