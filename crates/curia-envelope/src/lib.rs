//! # curia-envelope: Admission Plane
//!
//! Everything a commit passes through before it reaches the round ledger,
//! plus the at-rest encryption the reveal path later relies on.
//!
//! ## Modules
//!
//! - [`keyring`]: storage keys by id, one active, all decryptable
//! - [`storage`]: AES-256-GCM storage envelope (versioned JSON)
//! - [`codec`]: commitment hash, auth message, reveal payload encodings
//! - [`signature`]: ed25519 verification and timestamp windows
//! - [`replay`]: fingerprint replay guard with expiry
//! - [`sweeper`]: background task purging expired replay entries
//! - [`commit`]: [`CommitGate`], the full admission pipeline

pub mod codec;
pub mod commit;
pub mod keyring;
pub mod replay;
pub mod signature;
pub mod storage;
pub mod sweeper;

pub use codec::{PayloadFormat, RevealPayload};
pub use commit::{CommitGate, CommitRequest, SecuredCommitment};
pub use keyring::{KeyRing, StorageKey};
pub use replay::{ReplayFingerprint, ReplayGuard};
pub use signature::{
    HexWalletDirectory, SignatureVerifier, StaticWalletDirectory, Verification, WalletDirectory,
};
pub use sweeper::spawn_replay_sweeper;
