//! AES-256-GCM envelopes.
//!
//! Two envelopes use the same cipher:
//!
//! - the **storage envelope**, a JSON document written into
//!   `Commitment::encrypted_payload`:
//!   `{"version":"v1","alg":"AES-256-GCM","kid":"v1","iv":"<b64>","ct":"<b64>"}`
//!   with AAD `curia-commitment|v1|<kid>`, so a ciphertext cannot be moved
//!   under a different key id;
//! - the **client envelope**, produced by the curator's client under
//!   SHA-256(signature) with the signed auth message as AAD (see
//!   [`crate::commit`]).

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use curia_types::constants::{AES_KEY_BYTES, GCM_IV_BYTES};
use curia_types::{CuriaError, KeyId, Result};
use serde::{Deserialize, Serialize};

use crate::keyring::KeyRing;

const ENVELOPE_VERSION: &str = "v1";
const ENVELOPE_ALG: &str = "AES-256-GCM";

/// Serialized form of an at-rest ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEnvelope {
    pub version: String,
    pub alg: String,
    pub kid: String,
    pub iv: String,
    pub ct: String,
}

fn storage_aad(kid: &str) -> Vec<u8> {
    format!("curia-commitment|{ENVELOPE_VERSION}|{kid}").into_bytes()
}

/// Encrypt under the ring's active key.
///
/// Returns the key id used and the JSON envelope; callers record both.
pub fn seal_for_storage(ring: &KeyRing, plaintext: &[u8]) -> Result<(KeyId, String)> {
    let (key_id, key) = ring.active()?;
    let iv: [u8; GCM_IV_BYTES] = rand::random();
    let ct = aes_gcm_encrypt(key.as_bytes(), &iv, plaintext, &storage_aad(key_id.as_str()))?;
    let envelope = StorageEnvelope {
        version: ENVELOPE_VERSION.to_string(),
        alg: ENVELOPE_ALG.to_string(),
        kid: key_id.as_str().to_string(),
        iv: STANDARD.encode(iv),
        ct: STANDARD.encode(ct),
    };
    let json = serde_json::to_string(&envelope)?;
    Ok((key_id, json))
}

/// Decrypt an envelope written under `recorded_key_id`.
///
/// The key is resolved from the ring by the recorded id, and the envelope's
/// own `kid` must agree with it.
pub fn open_from_storage(ring: &KeyRing, recorded_key_id: &KeyId, envelope: &str) -> Result<Vec<u8>> {
    let envelope: StorageEnvelope = serde_json::from_str(envelope)
        .map_err(|e| CuriaError::Crypto(format!("malformed storage envelope: {e}")))?;
    if envelope.version != ENVELOPE_VERSION {
        return Err(CuriaError::Crypto(format!(
            "unsupported storage envelope version {:?}",
            envelope.version
        )));
    }
    if envelope.alg != ENVELOPE_ALG {
        return Err(CuriaError::Crypto(format!(
            "unsupported storage envelope alg {:?}",
            envelope.alg
        )));
    }
    if envelope.kid != recorded_key_id.as_str() {
        return Err(CuriaError::Crypto(format!(
            "envelope kid {:?} does not match recorded key id {recorded_key_id}",
            envelope.kid
        )));
    }

    let key = ring.resolve(recorded_key_id)?;
    let iv = decode_iv(&envelope.iv).map_err(|e| CuriaError::Crypto(e.to_string()))?;
    let ct = STANDARD
        .decode(&envelope.ct)
        .map_err(|e| CuriaError::Crypto(format!("envelope ct is not base64: {e}")))?;
    aes_gcm_decrypt(key.as_bytes(), &iv, &ct, &storage_aad(&envelope.kid))
}

/// Decode a base64 IV and check its length.
pub(crate) fn decode_iv(encoded: &str) -> Result<[u8; GCM_IV_BYTES]> {
    let raw = STANDARD
        .decode(encoded.trim())
        .map_err(|e| CuriaError::MalformedRequest {
            reason: format!("iv is not valid base64: {e}"),
        })?;
    raw.try_into().map_err(|raw: Vec<u8>| CuriaError::MalformedRequest {
        reason: format!("iv must decode to {GCM_IV_BYTES} bytes, got {}", raw.len()),
    })
}

pub(crate) fn aes_gcm_encrypt(
    key: &[u8; AES_KEY_BYTES],
    iv: &[u8; GCM_IV_BYTES],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CuriaError::Crypto(format!("cipher init failed: {e}")))?;
    cipher
        .encrypt(Nonce::from_slice(iv), Payload { msg: plaintext, aad })
        .map_err(|e| CuriaError::Crypto(format!("encryption failed: {e}")))
}

pub(crate) fn aes_gcm_decrypt(
    key: &[u8; AES_KEY_BYTES],
    iv: &[u8; GCM_IV_BYTES],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CuriaError::Crypto(format!("cipher init failed: {e}")))?;
    cipher
        .decrypt(Nonce::from_slice(iv), Payload { msg: ciphertext, aad })
        .map_err(|_| CuriaError::Crypto("decryption failed: wrong key or corrupted data".into()))
}
