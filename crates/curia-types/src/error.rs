//! Error types for the Curia commit-reveal core.
//!
//! All errors use the `CR_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Signature / request errors
//! - 2xx: Replay errors
//! - 3xx: Phase errors
//! - 4xx: Commitment / reveal errors
//! - 5xx: Key management and cipher errors
//! - 6xx: Rating errors
//! - 9xx: General / internal errors
//!
//! Every rejection is explicit: callers must be able to tell "not accepted"
//! apart from "accepted".

use thiserror::Error;

use crate::{CommitmentId, KeyId, MatchId, PairId, RoundId, RoundPhase};

/// Central error enum for all Curia operations.
#[derive(Debug, Error)]
pub enum CuriaError {
    // =================================================================
    // Signature / Request Errors (1xx)
    // =================================================================
    /// The signature is missing or does not verify under the wallet's key.
    #[error("CR_ERR_100: Invalid signature: {reason}")]
    InvalidSignature { reason: String },

    /// The signed timestamp is older than the configured maximum age.
    #[error("CR_ERR_101: Signature expired: signed {age_secs}s ago (max {max_age_secs}s)")]
    Expired { age_secs: i64, max_age_secs: u64 },

    /// The signed timestamp is further in the future than the skew tolerance.
    #[error("CR_ERR_102: Signature timestamp {ahead_secs}s in the future (max skew {max_skew_secs}s)")]
    TooFarInFuture { ahead_secs: i64, max_skew_secs: u64 },

    /// The request is structurally invalid.
    #[error("CR_ERR_103: Malformed request: {reason}")]
    MalformedRequest { reason: String },

    /// The client-encrypted reveal failed authentication or does not
    /// match the claimed commitment hash.
    #[error("CR_ERR_104: Commit envelope rejected: {reason}")]
    EnvelopeRejected { reason: String },

    // =================================================================
    // Replay Errors (2xx)
    // =================================================================
    /// A request with the same fingerprint was already accepted.
    #[error("CR_ERR_200: Duplicate request: fingerprint {fingerprint_hex} already admitted")]
    DuplicateRequest { fingerprint_hex: String },

    // =================================================================
    // Phase Errors (3xx)
    // =================================================================
    /// The operation is not legal in the round's current phase.
    #[error("CR_ERR_300: Phase violation on {round}: {operation} requires {required}, round is {actual}")]
    PhaseViolation {
        round: RoundId,
        operation: &'static str,
        required: RoundPhase,
        actual: RoundPhase,
    },

    /// A backwards phase transition was requested.
    #[error("CR_ERR_301: Invalid phase transition on {round}: {from} -> {to}")]
    InvalidPhaseTransition {
        round: RoundId,
        from: RoundPhase,
        to: RoundPhase,
    },

    /// A wire string did not name a phase.
    #[error("CR_ERR_302: Unknown round phase: {0:?}")]
    UnknownPhase(String),

    // =================================================================
    // Commitment / Reveal Errors (4xx)
    // =================================================================
    /// The curator already holds a commitment on this pair.
    #[error("CR_ERR_400: Duplicate commitment on {pair} by {curator}")]
    DuplicateCommitment { pair: PairId, curator: String },

    /// The disclosed payload does not bind to the stored commitment.
    #[error("CR_ERR_401: Reveal mismatch for {commitment}: {reason}")]
    RevealMismatch {
        commitment: CommitmentId,
        reason: String,
    },

    /// The referenced entity does not exist.
    #[error("CR_ERR_402: Not found: {0}")]
    NotFound(String),

    /// A wire string did not name a choice.
    #[error("CR_ERR_403: Unknown choice: {0:?}")]
    UnknownChoice(String),

    /// A revealed commitment was disclosed again with a different payload.
    #[error("CR_ERR_404: Commitment {0} is already revealed")]
    AlreadyRevealed(CommitmentId),

    // =================================================================
    // Key / Cipher Errors (5xx)
    // =================================================================
    /// Ciphertext references a key id that is not in the key ring.
    #[error("CR_ERR_500: Unknown storage key id: {0}")]
    UnknownKeyId(KeyId),

    /// Configured key material is unusable.
    #[error("CR_ERR_501: Invalid key material for {key_id}: {reason}")]
    InvalidKeyMaterial { key_id: KeyId, reason: String },

    /// Encryption or decryption failed.
    #[error("CR_ERR_502: Cipher failure: {0}")]
    Crypto(String),

    // =================================================================
    // Rating Errors (6xx)
    // =================================================================
    /// The match result is inconsistent (same agent twice, bad K, ...).
    #[error("CR_ERR_600: Invalid match: {reason}")]
    InvalidMatch { reason: String },

    /// This match has already been applied to the ratings.
    #[error("CR_ERR_601: Match already rated: {0}")]
    MatchAlreadyRated(MatchId),

    /// Golden and audit pairs never affect agent ratings.
    #[error("CR_ERR_602: Calibration pair {0} is excluded from ratings")]
    CalibrationPairExcluded(PairId),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("CR_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("CR_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("CR_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (config file).
    #[error("CR_ERR_903: I/O error: {0}")]
    Io(String),
}

impl CuriaError {
    /// Numeric code, as carried in the message prefix.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidSignature { .. } => 100,
            Self::Expired { .. } => 101,
            Self::TooFarInFuture { .. } => 102,
            Self::MalformedRequest { .. } => 103,
            Self::EnvelopeRejected { .. } => 104,
            Self::DuplicateRequest { .. } => 200,
            Self::PhaseViolation { .. } => 300,
            Self::InvalidPhaseTransition { .. } => 301,
            Self::UnknownPhase(_) => 302,
            Self::DuplicateCommitment { .. } => 400,
            Self::RevealMismatch { .. } => 401,
            Self::NotFound(_) => 402,
            Self::UnknownChoice(_) => 403,
            Self::AlreadyRevealed(_) => 404,
            Self::UnknownKeyId(_) => 500,
            Self::InvalidKeyMaterial { .. } => 501,
            Self::Crypto(_) => 502,
            Self::InvalidMatch { .. } => 600,
            Self::MatchAlreadyRated(_) => 601,
            Self::CalibrationPairExcluded(_) => 602,
            Self::Internal(_) => 900,
            Self::Serialization(_) => 901,
            Self::Configuration(_) => 902,
            Self::Io(_) => 903,
        }
    }

    /// Whether the caller can recover by re-signing, waiting for the right
    /// phase, or refetching state. Operational faults (unknown key ids,
    /// broken key material, bad configuration) are not retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::UnknownKeyId(_)
                | Self::InvalidKeyMaterial { .. }
                | Self::Configuration(_)
                | Self::Internal(_)
                | Self::Io(_)
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, CuriaError>;

impl From<std::io::Error> for CuriaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CuriaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
