//! Identifiers used throughout Curia.
//!
//! Rounds, pairs and markets are numbered by the external scheduler in
//! creation order, so they use plain `u64` sequences. Entities minted by
//! this core (commitments, matches) use UUIDv7 for time-ordered sorting.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Scheduler-assigned sequences
// ---------------------------------------------------------------------------

/// Identifier of a curation market (a topic feed that owns rounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MarketId(pub u64);

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "market:{}", self.0)
    }
}

/// Identifier of a curation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RoundId(pub u64);

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round:{}", self.0)
    }
}

/// Identifier of a pair. Ordering follows pair creation order, which is
/// what the pair selector relies on for deterministic results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PairId(pub u64);

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pair:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CommitmentId
// ---------------------------------------------------------------------------

/// Unique identifier for a commitment. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CommitmentId(pub Uuid);

impl CommitmentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CommitmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommitmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmt:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AgentId / MatchId
// ---------------------------------------------------------------------------

/// Identifier of a rated agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a finalized match between two agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MatchId(pub Uuid);

impl MatchId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Deterministic `MatchId` for the match decided by a pair.
    ///
    /// Replaying the same pair outcome always yields the same id, so the
    /// rater's idempotency guard catches double application.
    #[must_use]
    pub fn for_pair(pair_id: PairId) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"curia:match_id:v1:");
        hasher.update(pair_id.0.to_be_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash[..16]);
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "match:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// WalletAddress
// ---------------------------------------------------------------------------

/// A curator's wallet identifier in canonical form.
///
/// Hex addresses are stored as lowercase digits without a `0x` prefix, so
/// `0xAB12`, `AB12` and `ab12` name the same curator. Anything that is not
/// hex is only trimmed. Resolving an address to a public key is the job of a
/// wallet directory in the envelope crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    #[must_use]
    pub fn new(value: impl AsRef<str>) -> Self {
        let trimmed = value.as_ref().trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            Self(digits.to_ascii_lowercase())
        } else {
            Self(trimmed.to_string())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First eight characters, for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map_or(self.0.len(), |(idx, _)| idx);
        &self.0[..end]
    }
}

impl From<String> for WalletAddress {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// KeyId
// ---------------------------------------------------------------------------

/// Identifier of a storage encryption key in the key ring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct KeyId(String);

impl KeyId {
    #[must_use]
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_id_uniqueness_and_ordering() {
        let a = CommitmentId::new();
        let b = CommitmentId::new();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn match_id_for_pair_is_deterministic() {
        let a = MatchId::for_pair(PairId(7));
        let b = MatchId::for_pair(PairId(7));
        assert_eq!(a, b);
        assert_ne!(a, MatchId::for_pair(PairId(8)));
    }

    #[test]
    fn wallet_is_trimmed() {
        let w = WalletAddress::new("  abc  ");
        assert_eq!(w.as_str(), "abc");
        assert!(!w.is_empty());
        assert!(WalletAddress::new("   ").is_empty());
    }

    #[test]
    fn hex_wallet_aliases_canonicalize() {
        let canonical = WalletAddress::new("ab12cd");
        for alias in ["AB12CD", "0xab12cd", "0XAB12cd", " 0xAb12Cd "] {
            assert_eq!(WalletAddress::new(alias), canonical, "alias {alias}");
        }
        assert_eq!(canonical.as_str(), "ab12cd");
        // Not hex: left as typed.
        assert_eq!(WalletAddress::new("Curator-1").as_str(), "Curator-1");
        assert_eq!(WalletAddress::new("0x").as_str(), "0x");
    }

    #[test]
    fn deserialized_wallet_is_canonical() {
        let w: WalletAddress = serde_json::from_str("\"0xAB12CD\"").unwrap();
        assert_eq!(w, WalletAddress::new("ab12cd"));
        assert_eq!(serde_json::to_string(&w).unwrap(), "\"ab12cd\"");
    }

    #[test]
    fn wallet_short_prefix() {
        let w = WalletAddress::new("0123456789abcdef");
        assert_eq!(w.short(), "01234567");
        assert_eq!(WalletAddress::new("abc").short(), "abc");
    }

    #[test]
    fn display_prefixes() {
        assert_eq!(PairId(3).to_string(), "pair:3");
        assert_eq!(RoundId(4).to_string(), "round:4");
        assert_eq!(MarketId(5).to_string(), "market:5");
        assert_eq!(KeyId::new(" v1 ").to_string(), "v1");
    }

    #[test]
    fn serde_roundtrips() {
        let id = CommitmentId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: CommitmentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
