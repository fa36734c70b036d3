//! # Replay Guard
//!
//! Remembers the fingerprint of every accepted signed request until its
//! entry expires. A fingerprint seen again before expiry is a hard
//! rejection ([`CuriaError::DuplicateRequest`]).
//!
//! The fingerprint covers signer, signed message and timestamp, so two
//! identical votes on different pairs never collide.
//!
//! `admit` is an insert-if-absent under one lock: two concurrent admits of
//! the same fingerprint cannot both succeed. `sweep_expired` takes the same
//! lock, so it can run from a background task at any time.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeDelta, Utc};
use curia_types::{CuriaError, Result, WalletAddress};
use sha2::{Digest, Sha256};
use tracing::warn;

/// SHA-256 over `(signer, message, signed_at)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplayFingerprint([u8; 32]);

impl ReplayFingerprint {
    #[must_use]
    pub fn derive(wallet: &WalletAddress, message: &[u8], signed_at: i64) -> Self {
        let wallet = wallet.as_str().as_bytes();
        let mut hasher = Sha256::new();
        hasher.update(b"curia:replay:v1:");
        hasher.update((wallet.len() as u64).to_be_bytes());
        hasher.update(wallet);
        hasher.update((message.len() as u64).to_be_bytes());
        hasher.update(message);
        hasher.update(signed_at.to_be_bytes());
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Bounded-lifetime set of accepted request fingerprints.
#[derive(Debug)]
pub struct ReplayGuard {
    /// fingerprint → expires_at
    entries: Mutex<HashMap<ReplayFingerprint, DateTime<Utc>>>,
    window: TimeDelta,
}

impl ReplayGuard {
    /// Create a guard whose entries live `window_secs` after admission.
    pub fn new(window_secs: u64) -> Result<Self> {
        let window = i64::try_from(window_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| {
                CuriaError::Configuration(format!("replay window {window_secs}s is out of range"))
            })?;
        Ok(Self {
            entries: Mutex::new(HashMap::new()),
            window,
        })
    }

    /// Accept a fingerprint once per window.
    ///
    /// An entry is live while `expires_at >= now`. A live match rejects;
    /// an expired leftover that has not been swept yet is replaced.
    pub fn admit(&self, fingerprint: ReplayFingerprint, now: DateTime<Utc>) -> Result<()> {
        let mut entries = self.lock()?;
        if let Some(expires_at) = entries.get(&fingerprint) {
            if *expires_at >= now {
                let fingerprint_hex = fingerprint.to_hex();
                warn!(fingerprint = %fingerprint_hex, "Replay rejected");
                return Err(CuriaError::DuplicateRequest { fingerprint_hex });
            }
        }
        entries.insert(fingerprint, now + self.window);
        Ok(())
    }

    /// Drop every entry with `expires_at < now`. Returns how many went.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at >= now);
        Ok(before - entries.len())
    }

    /// Whether a live entry exists for `fingerprint`.
    pub fn contains(&self, fingerprint: &ReplayFingerprint, now: DateTime<Utc>) -> Result<bool> {
        Ok(self
            .lock()?
            .get(fingerprint)
            .is_some_and(|expires_at| *expires_at >= now))
    }

    /// Entries currently held, including expired ones not yet swept.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    #[must_use]
    pub fn window(&self) -> TimeDelta {
        self.window
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ReplayFingerprint, DateTime<Utc>>>> {
        self.entries
            .lock()
            .map_err(|_| CuriaError::Internal("replay guard lock poisoned".into()))
    }
}
