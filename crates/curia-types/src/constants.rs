//! System-wide constants for the Curia commit-reveal core.

use crate::RoundPhase;

/// Default maximum age of a signed commit, in seconds.
pub const DEFAULT_MAX_SIGNATURE_AGE_SECS: u64 = 300;

/// Default tolerance for client clocks running ahead, in seconds.
pub const DEFAULT_MAX_FUTURE_SKEW_SECS: u64 = 60;

/// Default lifetime of a replay guard entry, in seconds.
pub const DEFAULT_REPLAY_WINDOW_SECS: u64 = 900;

/// Default interval between replay guard sweeps, in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Key id of the development storage key shipped in the default config.
pub const DEFAULT_STORAGE_KEY_ID: &str = "v1";

/// Base64 of a 32-byte development key. Production deployments override it.
pub const DEFAULT_STORAGE_KEY_BASE64: &str = "Y3VyaWEtZGV2LXN0b3JhZ2Uta2V5LXYxLTMyYnl0ZXM=";

/// Domain tag for the canonical signed commit message.
pub const AUTH_MESSAGE_PREFIX: &str = "curia-commit-v1";

/// Domain tag for commitment hash preimages.
pub const COMMITMENT_HASH_DOMAIN: &[u8] = b"curia-commit-v1";

/// Bytes of randomness in a client request nonce (32 hex chars).
pub const REQUEST_NONCE_BYTES: usize = 16;

/// Bytes of randomness in a reveal nonce.
pub const REVEAL_NONCE_BYTES: usize = 32;

/// AES-GCM IV length in bytes.
pub const GCM_IV_BYTES: usize = 12;

/// AES-256 key length in bytes.
pub const AES_KEY_BYTES: usize = 32;

/// Phases in which curators are handed pairs to judge.
pub const ELIGIBLE_CURATION_PHASES: &[RoundPhase] = &[RoundPhase::Commit];

/// Starting Elo rating for an agent with no history.
pub const DEFAULT_INITIAL_RATING: f64 = 1000.0;

/// Default Elo K-factor.
pub const DEFAULT_K_FACTOR: f64 = 32.0;

/// Number of match ids the rater remembers for idempotency.
pub const RATING_IDEMPOTENCY_CACHE_SIZE: usize = 100_000;

/// Curator score weights: calibration, consensus alignment, audit pass
/// rate, and the subtracted fraud penalty.
pub const CURATOR_SCORE_WEIGHTS: [f64; 4] = [0.40, 0.25, 0.20, 0.15];

/// Blended score weights: golden, audit, consensus, behavioral.
pub const BLENDED_SCORE_WEIGHTS: [f64; 4] = [0.40, 0.25, 0.20, 0.15];

/// Each fraud flag costs this much behavioral credit.
pub const FRAUD_PENALTY_PER_FLAG: f64 = 0.1;

/// Fraud flags beyond this count add no further penalty.
pub const MAX_COUNTED_FRAUD_FLAGS: u32 = 10;

/// Blended score at or above which rewards are paid in full.
pub const FULL_REWARD_THRESHOLD: f64 = 0.60;

/// Blended score at or above which rewards are halved; below it they are
/// slashed and the curator is suspended.
pub const REDUCED_REWARD_THRESHOLD: f64 = 0.40;

/// Reward multipliers for the full, reduced and slashed bands.
pub const REWARD_MULTIPLIERS: [f64; 3] = [1.0, 0.5, 0.1];

/// Voting power floor, as a multiple of one vote.
pub const MIN_VOTING_POWER: f64 = 1.0;

/// Voting power ceiling.
pub const MAX_VOTING_POWER: f64 = 2.0;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Curia";
