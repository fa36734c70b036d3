//! # Commit admission
//!
//! Turns a curator's commit request into something safe to store:
//!
//! ```text
//!   request ──▶ normalize ──▶ verify signature ──▶ admit fingerprint
//!                                                        │
//!   stored envelope ◀── seal (active key) ◀── hash check ◀── open client envelope
//! ```
//!
//! The client encrypts the reveal payload with AES-256-GCM under
//! SHA-256(signature), using the signed auth message as AAD. Only a holder
//! of the signature can open it, and it cannot be lifted onto another
//! request. After opening, the decoded payload must hash to the claimed
//! commitment hash, and the canonical v1 payload is re-sealed under the
//! key ring's active key.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use curia_types::constants::{AES_KEY_BYTES, GCM_IV_BYTES};
use curia_types::{CommitSecurityConfig, CuriaError, KeyId, PairId, Result, WalletAddress};
use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::codec::{self, RevealPayload};
use crate::keyring::KeyRing;
use crate::replay::{ReplayFingerprint, ReplayGuard};
use crate::signature::{SignatureVerifier, WalletDirectory};
use crate::storage::{self, aes_gcm_decrypt, aes_gcm_encrypt};

/// A commit as received from the curator's client.
///
/// The four auth fields (`signature`, `signed_at`, `request_nonce`,
/// `reveal_iv`) travel together. Without them the request is a legacy
/// unsigned commit and `encrypted_reveal` holds the base64 reveal payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub wallet: WalletAddress,
    pub commitment_hash: String,
    pub stake_amount: u64,
    /// Base64 ciphertext (signed) or base64 payload (legacy unsigned).
    pub encrypted_reveal: String,
    pub reveal_iv: Option<String>,
    /// Base64 ed25519 signature over the auth message.
    pub signature: Option<String>,
    /// Unix seconds.
    pub signed_at: Option<i64>,
    pub request_nonce: Option<String>,
}

impl CommitRequest {
    /// Whether every auth field is present.
    #[must_use]
    pub fn has_auth_envelope(&self) -> bool {
        self.signature.is_some()
            && self.signed_at.is_some()
            && self.request_nonce.is_some()
            && self.reveal_iv.is_some()
    }

    /// Build a fully signed request the way a client does.
    pub fn sign(
        signing_key: &SigningKey,
        wallet: WalletAddress,
        pair_id: PairId,
        payload: &RevealPayload,
        stake_amount: u64,
        signed_at: i64,
    ) -> Result<Self> {
        let hash = codec::compute_commitment_hash(
            &wallet,
            pair_id,
            payload.choice,
            stake_amount,
            &payload.nonce,
        );
        let nonce = codec::generate_request_nonce();
        let message =
            codec::build_auth_message(&wallet, pair_id, &hash, stake_amount, signed_at, &nonce);
        let signature = signing_key.sign(message.as_bytes()).to_bytes();
        let (iv, ct) = encrypt_client_reveal(&signature, &message, &payload.encode_v1())?;
        Ok(Self {
            wallet,
            commitment_hash: hash,
            stake_amount,
            encrypted_reveal: ct,
            reveal_iv: Some(iv),
            signature: Some(STANDARD.encode(signature)),
            signed_at: Some(signed_at),
            request_nonce: Some(nonce),
        })
    }
}

/// A commit that passed admission and is ready for the commitment store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuredCommitment {
    /// Normalized `0x`-prefixed hash.
    pub commitment_hash: String,
    /// Storage envelope JSON.
    pub encrypted_payload: String,
    pub key_id: KeyId,
    pub signed: bool,
}

/// Client side of the reveal envelope: returns `(iv_b64, ct_b64)`.
pub fn encrypt_client_reveal(
    signature: &[u8],
    auth_message: &str,
    payload: &[u8],
) -> Result<(String, String)> {
    let iv: [u8; GCM_IV_BYTES] = rand::random();
    let ct = aes_gcm_encrypt(
        &client_key(signature),
        &iv,
        payload,
        auth_message.as_bytes(),
    )?;
    Ok((STANDARD.encode(iv), STANDARD.encode(ct)))
}

fn client_key(signature: &[u8]) -> [u8; AES_KEY_BYTES] {
    Sha256::digest(signature).into()
}

fn decode_b64_field(field: &str, value: &str) -> Result<Vec<u8>> {
    if value.trim().is_empty() {
        return Err(CuriaError::MalformedRequest {
            reason: format!("{field} is required"),
        });
    }
    STANDARD
        .decode(value.trim())
        .map_err(|_| CuriaError::MalformedRequest {
            reason: format!("invalid base64 value for {field}"),
        })
}

/// Signature check, replay admission and envelope re-sealing for commits.
#[derive(Debug, Clone)]
pub struct CommitGate {
    verifier: SignatureVerifier,
    replay: Arc<ReplayGuard>,
    keys: Arc<KeyRing>,
    allow_legacy_reveal_decode: bool,
}

impl CommitGate {
    pub fn new(
        config: &CommitSecurityConfig,
        directory: Arc<dyn WalletDirectory>,
        replay: Arc<ReplayGuard>,
        keys: Arc<KeyRing>,
    ) -> Self {
        Self {
            verifier: SignatureVerifier::new(config, directory),
            replay,
            keys,
            allow_legacy_reveal_decode: config.allow_legacy_reveal_decode,
        }
    }

    #[must_use]
    pub fn replay_guard(&self) -> &Arc<ReplayGuard> {
        &self.replay
    }

    #[must_use]
    pub fn key_ring(&self) -> &Arc<KeyRing> {
        &self.keys
    }

    #[must_use]
    pub fn allows_legacy_reveal_decode(&self) -> bool {
        self.allow_legacy_reveal_decode
    }

    /// Admit a commit request for `pair_id`.
    ///
    /// The replay fingerprint is consumed as soon as the signature verifies,
    /// so a request whose envelope then fails is not retryable as-is.
    pub fn secure_commit(
        &self,
        pair_id: PairId,
        request: &CommitRequest,
        now: DateTime<Utc>,
    ) -> Result<SecuredCommitment> {
        if request.wallet.is_empty() {
            return Err(CuriaError::MalformedRequest {
                reason: "wallet is required".into(),
            });
        }
        if request.stake_amount == 0 {
            return Err(CuriaError::MalformedRequest {
                reason: "stake amount must be positive".into(),
            });
        }
        let hash = codec::normalize_commitment_hash(&request.commitment_hash)?;

        let (signature_b64, signed_at, nonce, iv_b64) = match (
            request.signature.as_deref(),
            request.signed_at,
            request.request_nonce.as_deref(),
            request.reveal_iv.as_deref(),
        ) {
            (Some(signature), Some(signed_at), Some(nonce), Some(iv)) => {
                (signature, signed_at, nonce, iv)
            }
            (None, None, None, None) => {
                // Rejects unless legacy unsigned commits are enabled.
                self.verifier.verify(&[], None, &request.wallet, 0, now)?;
                let raw = decode_b64_field("encryptedReveal", &request.encrypted_reveal)?;
                return self.seal(pair_id, request, &hash, &raw, false);
            }
            _ => {
                return Err(CuriaError::MalformedRequest {
                    reason: "signature, signedAt, requestNonce and revealIv must be sent together"
                        .into(),
                });
            }
        };

        let nonce = codec::normalize_request_nonce(nonce)?;
        let signature = decode_b64_field("signature", signature_b64)?;
        let iv = storage::decode_iv(iv_b64)?;
        let ciphertext = decode_b64_field("encryptedReveal", &request.encrypted_reveal)?;
        let message = codec::build_auth_message(
            &request.wallet,
            pair_id,
            &hash,
            request.stake_amount,
            signed_at,
            &nonce,
        );

        self.verifier.verify(
            message.as_bytes(),
            Some(&signature),
            &request.wallet,
            signed_at,
            now,
        )?;

        self.replay.admit(
            ReplayFingerprint::derive(&request.wallet, message.as_bytes(), signed_at),
            now,
        )?;

        let plaintext = aes_gcm_decrypt(&client_key(&signature), &iv, &ciphertext, message.as_bytes())
            .map_err(|_| CuriaError::EnvelopeRejected {
                reason: "encrypted reveal payload failed authentication".into(),
            })?;
        self.seal(pair_id, request, &hash, &plaintext, true)
    }

    fn seal(
        &self,
        pair_id: PairId,
        request: &CommitRequest,
        hash: &str,
        raw_payload: &[u8],
        signed: bool,
    ) -> Result<SecuredCommitment> {
        let (payload, format) = RevealPayload::decode(raw_payload, self.allow_legacy_reveal_decode)
            .map_err(|e| CuriaError::EnvelopeRejected {
                reason: format!("reveal payload does not decode: {e}"),
            })?;
        let expected = codec::compute_commitment_hash(
            &request.wallet,
            pair_id,
            payload.choice,
            request.stake_amount,
            &payload.nonce,
        );
        if expected != hash {
            return Err(CuriaError::EnvelopeRejected {
                reason: "commit payload does not match commitment hash".into(),
            });
        }
        if format != codec::PayloadFormat::V1 {
            debug!(pair = %pair_id, "Legacy reveal payload upgraded to v1 at commit");
        }

        let (key_id, encrypted_payload) = storage::seal_for_storage(&self.keys, &payload.encode_v1())?;
        info!(
            pair = %pair_id,
            wallet = %request.wallet.short(),
            key_id = %key_id,
            signed,
            "Commit admitted"
        );
        Ok(SecuredCommitment {
            commitment_hash: hash.to_string(),
            encrypted_payload,
            key_id,
            signed,
        })
    }
}
