//! # Key Ring
//!
//! Symmetric keys used to encrypt commitment payloads at rest, keyed by id.
//!
//! Exactly one id is *active* for new encryptions. Every id ever registered
//! stays resolvable, so ciphertext written under an old key keeps decrypting
//! after a rotation. Decryption always looks the key up by the id stored next
//! to the ciphertext; it never assumes the active key.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use curia_types::constants::AES_KEY_BYTES;
use curia_types::{CommitSecurityConfig, CuriaError, KeyId, Result};
use tracing::info;

/// 32 bytes of AES-256 key material. `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageKey([u8; AES_KEY_BYTES]);

impl StorageKey {
    #[must_use]
    pub fn from_bytes(bytes: [u8; AES_KEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Decode base64 key material as it appears in configuration.
    pub fn from_base64(key_id: &KeyId, encoded: &str) -> Result<Self> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CuriaError::InvalidKeyMaterial {
                key_id: key_id.clone(),
                reason: format!("not valid base64: {e}"),
            })?;
        let bytes: [u8; AES_KEY_BYTES] =
            raw.try_into()
                .map_err(|raw: Vec<u8>| CuriaError::InvalidKeyMaterial {
                    key_id: key_id.clone(),
                    reason: format!("expected {AES_KEY_BYTES} bytes, got {}", raw.len()),
                })?;
        Ok(Self(bytes))
    }

    /// Fresh random key from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        Self(rand::random())
    }

    pub(crate) fn as_bytes(&self) -> &[u8; AES_KEY_BYTES] {
        &self.0
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StorageKey(<redacted>)")
    }
}

#[derive(Debug)]
struct KeyRingState {
    keys: HashMap<KeyId, Arc<StorageKey>>,
    active: KeyId,
}

/// Registry of storage keys with one active id.
///
/// Shared behind an `Arc` by the commit path (encrypt under the active key)
/// and the reveal path (decrypt under the recorded key). Rotation takes the
/// write lock briefly; lookups only take the read lock.
#[derive(Debug)]
pub struct KeyRing {
    state: RwLock<KeyRingState>,
}

impl KeyRing {
    /// A ring holding a single key, which is active.
    #[must_use]
    pub fn new(active: KeyId, key: StorageKey) -> Self {
        let mut keys = HashMap::new();
        keys.insert(active.clone(), Arc::new(key));
        Self {
            state: RwLock::new(KeyRingState { keys, active }),
        }
    }

    /// Build the ring from `storage_keys` and `active_storage_key_id`.
    ///
    /// Fails fast on malformed material or a missing active key so a bad
    /// deployment is caught at startup rather than on the first commit.
    pub fn from_config(config: &CommitSecurityConfig) -> Result<Self> {
        let active = KeyId::new(&config.active_storage_key_id);
        let mut keys = HashMap::with_capacity(config.storage_keys.len());
        for (id, encoded) in &config.storage_keys {
            let key_id = KeyId::new(id);
            let key = StorageKey::from_base64(&key_id, encoded)?;
            keys.insert(key_id, Arc::new(key));
        }
        if !keys.contains_key(&active) {
            return Err(CuriaError::UnknownKeyId(active));
        }
        info!(
            active_key_id = %active,
            key_count = keys.len(),
            "Storage key ring loaded"
        );
        Ok(Self {
            state: RwLock::new(KeyRingState { keys, active }),
        })
    }

    /// Register a decrypt-capable key without activating it.
    ///
    /// An id is bound to its material for life: registering different bytes
    /// under an existing id is rejected, since stored ciphertext depends on it.
    pub fn insert(&self, key_id: KeyId, key: StorageKey) -> Result<()> {
        let mut state = self.write()?;
        if let Some(existing) = state.keys.get(&key_id) {
            if **existing == key {
                return Ok(());
            }
            return Err(CuriaError::InvalidKeyMaterial {
                key_id,
                reason: "id is already bound to different key material".into(),
            });
        }
        state.keys.insert(key_id, Arc::new(key));
        Ok(())
    }

    /// Make a registered id the active one.
    pub fn activate(&self, key_id: &KeyId) -> Result<()> {
        let mut state = self.write()?;
        if !state.keys.contains_key(key_id) {
            return Err(CuriaError::UnknownKeyId(key_id.clone()));
        }
        let previous = std::mem::replace(&mut state.active, key_id.clone());
        info!(from = %previous, to = %key_id, "Storage key rotated");
        Ok(())
    }

    /// Register and activate in one step.
    pub fn rotate(&self, key_id: KeyId, key: StorageKey) -> Result<()> {
        self.insert(key_id.clone(), key)?;
        self.activate(&key_id)
    }

    /// The key used for new encryptions, with its id.
    pub fn active(&self) -> Result<(KeyId, Arc<StorageKey>)> {
        let state = self.read()?;
        let key = state
            .keys
            .get(&state.active)
            .cloned()
            .ok_or_else(|| CuriaError::UnknownKeyId(state.active.clone()))?;
        Ok((state.active.clone(), key))
    }

    pub fn active_key_id(&self) -> Result<KeyId> {
        Ok(self.read()?.active.clone())
    }

    /// Look up a key by the id recorded alongside a ciphertext.
    ///
    /// # Errors
    /// [`CuriaError::UnknownKeyId`] if the id was never registered.
    pub fn resolve(&self, key_id: &KeyId) -> Result<Arc<StorageKey>> {
        self.read()?
            .keys
            .get(key_id)
            .cloned()
            .ok_or_else(|| CuriaError::UnknownKeyId(key_id.clone()))
    }

    /// All registered ids, sorted.
    pub fn key_ids(&self) -> Result<Vec<KeyId>> {
        let mut ids: Vec<KeyId> = self.read()?.keys.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, KeyRingState>> {
        self.state
            .read()
            .map_err(|_| CuriaError::Internal("key ring lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, KeyRingState>> {
        self.state
            .write()
            .map_err(|_| CuriaError::Internal("key ring lock poisoned".into()))
    }
}
