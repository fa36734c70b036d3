//! Commitment codec: hash preimage, canonical auth message, reveal payload.
//!
//! Everything here is a pure function so clients and the server derive
//! byte-identical values.

use curia_types::constants::{
    AUTH_MESSAGE_PREFIX, COMMITMENT_HASH_DOMAIN, REQUEST_NONCE_BYTES, REVEAL_NONCE_BYTES,
};
use curia_types::{Choice, CuriaError, PairId, Result, WalletAddress};
use sha2::{Digest, Sha256};

/// Version byte leading a canonical reveal payload.
pub const REVEAL_PAYLOAD_V1: u8 = 0x01;

/// Length of a canonical v1 reveal payload.
pub const REVEAL_PAYLOAD_V1_LEN: usize = 2 + REVEAL_NONCE_BYTES;

// ---------------------------------------------------------------------------
// Commitment hash
// ---------------------------------------------------------------------------

/// Normalize a client-supplied commitment hash to `0x` + 64 lowercase hex.
///
/// Accepts an optional `0x`/`0X` prefix and any letter case.
pub fn normalize_commitment_hash(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.len() != 64 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CuriaError::MalformedRequest {
            reason: "commitment hash must be 64 hex digits".into(),
        });
    }
    Ok(format!("0x{}", digits.to_ascii_lowercase()))
}

/// Digest binding a vote to its curator, pair, stake and secret nonce.
///
/// Preimage: `domain ‖ len(wallet) ‖ wallet ‖ pair_id ‖ choice ‖ stake ‖ nonce`,
/// integers big-endian.
#[must_use]
pub fn compute_commitment_hash(
    wallet: &WalletAddress,
    pair_id: PairId,
    choice: Choice,
    stake_amount: u64,
    nonce: &[u8; REVEAL_NONCE_BYTES],
) -> String {
    let wallet = wallet.as_str().as_bytes();
    let mut hasher = Sha256::new();
    hasher.update(COMMITMENT_HASH_DOMAIN);
    hasher.update((wallet.len() as u64).to_be_bytes());
    hasher.update(wallet);
    hasher.update(pair_id.0.to_be_bytes());
    hasher.update([choice.as_byte()]);
    hasher.update(stake_amount.to_be_bytes());
    hasher.update(nonce);
    format!("0x{}", hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Auth message
// ---------------------------------------------------------------------------

/// Normalize a request nonce to 32 lowercase hex characters.
pub fn normalize_request_nonce(raw: &str) -> Result<String> {
    let nonce = raw.trim().to_ascii_lowercase();
    if nonce.is_empty() {
        return Err(CuriaError::MalformedRequest {
            reason: "request nonce is required".into(),
        });
    }
    if !nonce.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CuriaError::MalformedRequest {
            reason: "request nonce must be hex".into(),
        });
    }
    if nonce.len() != REQUEST_NONCE_BYTES * 2 {
        return Err(CuriaError::MalformedRequest {
            reason: format!("request nonce must be {} hex chars", REQUEST_NONCE_BYTES * 2),
        });
    }
    Ok(nonce)
}

/// Canonical message the wallet signs. Inputs must already be normalized.
#[must_use]
pub fn build_auth_message(
    wallet: &WalletAddress,
    pair_id: PairId,
    normalized_hash: &str,
    stake_amount: u64,
    signed_at: i64,
    normalized_nonce: &str,
) -> String {
    format!(
        "{AUTH_MESSAGE_PREFIX}|wallet={wallet}|pairId={}|hash={normalized_hash}|stake={stake_amount}|signedAt={signed_at}|nonce={normalized_nonce}",
        pair_id.0
    )
}

/// Client-side helper: normalize, then build the message to sign.
pub fn build_auth_message_for_signing(
    wallet: &WalletAddress,
    pair_id: PairId,
    commitment_hash: &str,
    stake_amount: u64,
    signed_at: i64,
    request_nonce: &str,
) -> Result<String> {
    let hash = normalize_commitment_hash(commitment_hash)?;
    let nonce = normalize_request_nonce(request_nonce)?;
    Ok(build_auth_message(
        wallet,
        pair_id,
        &hash,
        stake_amount,
        signed_at,
        &nonce,
    ))
}

/// Fresh request nonce for a client.
#[must_use]
pub fn generate_request_nonce() -> String {
    hex::encode(rand::random::<[u8; REQUEST_NONCE_BYTES]>())
}

// ---------------------------------------------------------------------------
// Reveal payload
// ---------------------------------------------------------------------------

/// Which wire encoding a reveal payload was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// `0x01 ‖ choice ‖ 32-byte nonce`.
    V1,
    /// `"<A|B>:<64 hex nonce>"`, accepted only in legacy-decode mode.
    Legacy,
}

/// The secret half of a commitment: the choice and its blinding nonce.
#[derive(Clone, PartialEq, Eq)]
pub struct RevealPayload {
    pub choice: Choice,
    pub nonce: [u8; REVEAL_NONCE_BYTES],
}

impl std::fmt::Debug for RevealPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealPayload")
            .field("choice", &self.choice)
            .field("nonce", &"<redacted>")
            .finish()
    }
}

impl RevealPayload {
    #[must_use]
    pub fn new(choice: Choice, nonce: [u8; REVEAL_NONCE_BYTES]) -> Self {
        Self { choice, nonce }
    }

    /// Random nonce for a fresh vote.
    #[must_use]
    pub fn random(choice: Choice) -> Self {
        Self::new(choice, rand::random())
    }

    #[must_use]
    pub fn encode_v1(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(REVEAL_PAYLOAD_V1_LEN);
        out.push(REVEAL_PAYLOAD_V1);
        out.push(self.choice.as_byte());
        out.extend_from_slice(&self.nonce);
        out
    }

    #[must_use]
    pub fn encode_legacy(&self) -> Vec<u8> {
        format!("{}:{}", self.choice, hex::encode(self.nonce)).into_bytes()
    }

    /// Decode either encoding; the legacy text form only when allowed.
    pub fn decode(bytes: &[u8], allow_legacy: bool) -> Result<(Self, PayloadFormat)> {
        if bytes.first() == Some(&REVEAL_PAYLOAD_V1) {
            return Self::decode_v1(bytes).map(|p| (p, PayloadFormat::V1));
        }
        if !allow_legacy {
            return Err(CuriaError::MalformedRequest {
                reason: "reveal payload is not v1 and legacy decode is disabled".into(),
            });
        }
        Self::decode_legacy(bytes).map(|p| (p, PayloadFormat::Legacy))
    }

    fn decode_v1(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != REVEAL_PAYLOAD_V1_LEN {
            return Err(CuriaError::MalformedRequest {
                reason: format!(
                    "v1 reveal payload must be {REVEAL_PAYLOAD_V1_LEN} bytes, got {}",
                    bytes.len()
                ),
            });
        }
        let choice = Choice::from_byte(bytes[1])?;
        let mut nonce = [0u8; REVEAL_NONCE_BYTES];
        nonce.copy_from_slice(&bytes[2..]);
        Ok(Self { choice, nonce })
    }

    fn decode_legacy(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| CuriaError::MalformedRequest {
            reason: "legacy reveal payload is not utf-8".into(),
        })?;
        let (choice, nonce_hex) =
            text.trim()
                .split_once(':')
                .ok_or_else(|| CuriaError::MalformedRequest {
                    reason: "legacy reveal payload must be <choice>:<nonce>".into(),
                })?;
        let choice: Choice = choice.parse()?;
        let raw = hex::decode(nonce_hex).map_err(|e| CuriaError::MalformedRequest {
            reason: format!("legacy reveal nonce is not hex: {e}"),
        })?;
        let nonce: [u8; REVEAL_NONCE_BYTES] =
            raw.try_into()
                .map_err(|raw: Vec<u8>| CuriaError::MalformedRequest {
                    reason: format!(
                        "legacy reveal nonce must be {REVEAL_NONCE_BYTES} bytes, got {}",
                        raw.len()
                    ),
                })?;
        Ok(Self { choice, nonce })
    }
}
