//! Signature verification and timestamp freshness.
//!
//! [`SignatureVerifier::verify`] is a pure function of its inputs, the
//! configured windows and the supplied `now`. It has no side effects; replay
//! protection lives in [`crate::replay`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use curia_types::{CommitSecurityConfig, CuriaError, Result, WalletAddress};
use ed25519_dalek::{Signature, VerifyingKey};
use tracing::debug;

/// Resolves a curator wallet to its ed25519 public key.
pub trait WalletDirectory: Send + Sync {
    fn verifying_key(&self, wallet: &WalletAddress) -> Result<VerifyingKey>;
}

/// Treats the wallet string itself as the hex-encoded public key.
#[derive(Debug, Default, Clone, Copy)]
pub struct HexWalletDirectory;

impl WalletDirectory for HexWalletDirectory {
    fn verifying_key(&self, wallet: &WalletAddress) -> Result<VerifyingKey> {
        let bytes = hex::decode(wallet.as_str()).map_err(|_| CuriaError::InvalidSignature {
            reason: "wallet public key is invalid".into(),
        })?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CuriaError::InvalidSignature {
                reason: "wallet public key must be 32 bytes".into(),
            })?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| CuriaError::InvalidSignature {
            reason: "wallet public key is not a valid curve point".into(),
        })
    }
}

/// Explicit wallet → key map, for deployments with an identity service
/// snapshot and for tests.
#[derive(Debug, Default, Clone)]
pub struct StaticWalletDirectory {
    keys: HashMap<WalletAddress, VerifyingKey>,
}

impl StaticWalletDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, wallet: WalletAddress, key: VerifyingKey) {
        self.keys.insert(wallet, key);
    }
}

impl WalletDirectory for StaticWalletDirectory {
    fn verifying_key(&self, wallet: &WalletAddress) -> Result<VerifyingKey> {
        self.keys
            .get(wallet)
            .copied()
            .ok_or_else(|| CuriaError::InvalidSignature {
                reason: format!("no public key registered for wallet {}", wallet.short()),
            })
    }
}

/// What the verifier concluded about an accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Signature checked and timestamp inside the window.
    Verified,
    /// No signature, passed only because legacy unsigned commits are enabled.
    LegacyUnsigned,
}

/// Checks a curator's signature and the freshness of its signed timestamp.
#[derive(Clone)]
pub struct SignatureVerifier {
    directory: Arc<dyn WalletDirectory>,
    max_signature_age_secs: u64,
    max_future_skew_secs: u64,
    allow_legacy_unsigned: bool,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("max_signature_age_secs", &self.max_signature_age_secs)
            .field("max_future_skew_secs", &self.max_future_skew_secs)
            .field("allow_legacy_unsigned", &self.allow_legacy_unsigned)
            .finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    pub fn new(config: &CommitSecurityConfig, directory: Arc<dyn WalletDirectory>) -> Self {
        Self {
            directory,
            max_signature_age_secs: config.max_signature_age_secs,
            max_future_skew_secs: config.max_future_skew_secs,
            allow_legacy_unsigned: config.allow_legacy_unsigned_commits,
        }
    }

    #[must_use]
    pub fn allows_legacy_unsigned(&self) -> bool {
        self.allow_legacy_unsigned
    }

    /// Verify `signature` over `payload` for `wallet`, signed at
    /// `signed_at` (unix seconds).
    ///
    /// # Errors
    /// - [`CuriaError::InvalidSignature`]: missing (with legacy mode off),
    ///   malformed, or not matching the wallet's key
    /// - [`CuriaError::Expired`]: `now - signed_at > max_signature_age_secs`
    /// - [`CuriaError::TooFarInFuture`]: `signed_at - now > max_future_skew_secs`
    pub fn verify(
        &self,
        payload: &[u8],
        signature: Option<&[u8]>,
        wallet: &WalletAddress,
        signed_at: i64,
        now: DateTime<Utc>,
    ) -> Result<Verification> {
        let Some(signature) = signature else {
            if self.allow_legacy_unsigned {
                debug!(wallet = %wallet.short(), "Unsigned commit accepted in legacy mode");
                return Ok(Verification::LegacyUnsigned);
            }
            return Err(CuriaError::InvalidSignature {
                reason: "signed commit envelope is required".into(),
            });
        };

        self.check_window(signed_at, now)?;

        let signature =
            Signature::from_slice(signature).map_err(|_| CuriaError::InvalidSignature {
                reason: "signature must be 64 bytes".into(),
            })?;
        let key = self.directory.verifying_key(wallet)?;
        key.verify_strict(payload, &signature)
            .map_err(|_| CuriaError::InvalidSignature {
                reason: "signature does not match wallet key".into(),
            })?;
        Ok(Verification::Verified)
    }

    /// Timestamp bounds only.
    pub fn check_window(&self, signed_at: i64, now: DateTime<Utc>) -> Result<()> {
        let delta = now.timestamp().saturating_sub(signed_at);
        if delta > 0 && delta.unsigned_abs() > self.max_signature_age_secs {
            return Err(CuriaError::Expired {
                age_secs: delta,
                max_age_secs: self.max_signature_age_secs,
            });
        }
        if delta < 0 && delta.unsigned_abs() > self.max_future_skew_secs {
            return Err(CuriaError::TooFarInFuture {
                ahead_secs: -delta,
                max_skew_secs: self.max_future_skew_secs,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    fn setup(legacy: bool) -> (SigningKey, WalletAddress, SignatureVerifier) {
        let sk = SigningKey::generate(&mut OsRng);
        let wallet = WalletAddress::new(hex::encode(sk.verifying_key().as_bytes()));
        let config = CommitSecurityConfig {
            allow_legacy_unsigned_commits: legacy,
            ..CommitSecurityConfig::default()
        };
        let verifier = SignatureVerifier::new(&config, Arc::new(HexWalletDirectory));
        (sk, wallet, verifier)
    }

    #[test]
    fn valid_signature_accepted() {
        let (sk, wallet, verifier) = setup(false);
        let now = Utc::now();
        let sig = sk.sign(b"vote");
        let out = verifier
            .verify(b"vote", Some(&sig.to_bytes()), &wallet, now.timestamp(), now)
            .unwrap();
        assert_eq!(out, Verification::Verified);
    }

    #[test]
    fn wrong_payload_rejected() {
        let (sk, wallet, verifier) = setup(false);
        let now = Utc::now();
        let sig = sk.sign(b"vote");
        let err = verifier
            .verify(b"other", Some(&sig.to_bytes()), &wallet, now.timestamp(), now)
            .unwrap_err();
        assert!(matches!(err, CuriaError::InvalidSignature { .. }));
    }

    #[test]
    fn other_wallet_rejected() {
        let (sk, _, verifier) = setup(false);
        let (_, other_wallet, _) = setup(false);
        let now = Utc::now();
        let sig = sk.sign(b"vote");
        assert!(
            verifier
                .verify(b"vote", Some(&sig.to_bytes()), &other_wallet, now.timestamp(), now)
                .is_err()
        );
    }

    #[test]
    fn expired_and_future_bounds() {
        let (sk, wallet, verifier) = setup(false);
        let now = Utc::now();
        let sig = sk.sign(b"vote").to_bytes();

        // Exactly at the bounds is still fine.
        assert!(verifier.verify(b"vote", Some(&sig), &wallet, now.timestamp() - 300, now).is_ok());
        assert!(verifier.verify(b"vote", Some(&sig), &wallet, now.timestamp() + 60, now).is_ok());

        let err = verifier
            .verify(b"vote", Some(&sig), &wallet, now.timestamp() - 301, now)
            .unwrap_err();
        assert!(matches!(err, CuriaError::Expired { age_secs: 301, .. }), "got {err:?}");

        let err = verifier
            .verify(b"vote", Some(&sig), &wallet, now.timestamp() + 61, now)
            .unwrap_err();
        assert!(
            matches!(err, CuriaError::TooFarInFuture { ahead_secs: 61, .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn missing_signature_depends_on_legacy_flag() {
        let (_, wallet, strict) = setup(false);
        let now = Utc::now();
        assert!(matches!(
            strict.verify(b"vote", None, &wallet, now.timestamp(), now),
            Err(CuriaError::InvalidSignature { .. })
        ));

        let (_, wallet, lenient) = setup(true);
        assert_eq!(
            lenient.verify(b"vote", None, &wallet, 0, now).unwrap(),
            Verification::LegacyUnsigned
        );
    }

    #[test]
    fn malformed_signature_and_wallet() {
        let (_, wallet, verifier) = setup(false);
        let now = Utc::now();
        assert!(verifier.verify(b"v", Some(&[0u8; 10]), &wallet, now.timestamp(), now).is_err());

        let bogus = WalletAddress::new("not-hex");
        assert!(HexWalletDirectory.verifying_key(&bogus).is_err());
    }

    #[test]
    fn prefixed_uppercase_wallet_verifies() {
        let (sk, wallet, verifier) = setup(false);
        let alias = WalletAddress::new(format!("0x{}", wallet.as_str().to_uppercase()));
        assert_eq!(alias, wallet);
        let now = Utc::now();
        let sig = sk.sign(b"vote");
        assert!(verifier
            .verify(b"vote", Some(&sig.to_bytes()), &alias, now.timestamp(), now)
            .is_ok());
    }

    #[test]
    fn static_directory() {
        let sk = SigningKey::generate(&mut OsRng);
        let wallet = WalletAddress::new("alice");
        let mut dir = StaticWalletDirectory::new();
        dir.register(wallet.clone(), sk.verifying_key());
        assert_eq!(dir.verifying_key(&wallet).unwrap(), sk.verifying_key());
        assert!(dir.verifying_key(&WalletAddress::new("bob")).is_err());
    }
}
