//! Configuration for the Curia core.
//!
//! One immutable [`CuriaConfig`] is built at startup (usually from TOML)
//! and handed to every component. There is no global settings object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CuriaError, Result, constants};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CuriaConfig {
    pub commit_security: CommitSecurityConfig,
    pub rating: RatingConfig,
    pub logging: LoggingConfig,
}

impl CuriaConfig {
    /// Parse configuration from a TOML string. Missing fields use defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| CuriaError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CuriaError::Serialization(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.commit_security.validate()?;
        self.rating.validate()
    }
}

/// Signature windows, replay window, legacy switches and storage keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitSecurityConfig {
    /// Oldest acceptable signed timestamp, relative to now.
    pub max_signature_age_secs: u64,
    /// How far ahead of now a signed timestamp may be.
    pub max_future_skew_secs: u64,
    /// Lifetime of a replay guard entry.
    pub replay_window_secs: u64,
    /// Accept commits without a signature envelope (bridging mode).
    pub allow_legacy_unsigned_commits: bool,
    /// Accept the pre-v1 textual reveal payload encoding.
    pub allow_legacy_reveal_decode: bool,
    /// Key id used for new encryptions.
    pub active_storage_key_id: String,
    /// Interval between replay guard sweeps.
    pub sweep_interval_secs: u64,
    /// Key id → base64 of 32 bytes of key material.
    pub storage_keys: BTreeMap<String, String>,
}

impl Default for CommitSecurityConfig {
    fn default() -> Self {
        let mut storage_keys = BTreeMap::new();
        storage_keys.insert(
            constants::DEFAULT_STORAGE_KEY_ID.to_string(),
            constants::DEFAULT_STORAGE_KEY_BASE64.to_string(),
        );
        Self {
            max_signature_age_secs: constants::DEFAULT_MAX_SIGNATURE_AGE_SECS,
            max_future_skew_secs: constants::DEFAULT_MAX_FUTURE_SKEW_SECS,
            replay_window_secs: constants::DEFAULT_REPLAY_WINDOW_SECS,
            allow_legacy_unsigned_commits: false,
            allow_legacy_reveal_decode: true,
            active_storage_key_id: constants::DEFAULT_STORAGE_KEY_ID.to_string(),
            sweep_interval_secs: constants::DEFAULT_SWEEP_INTERVAL_SECS,
            storage_keys,
        }
    }
}

impl CommitSecurityConfig {
    /// Check window relationships and key configuration.
    ///
    /// The replay window must cover the whole signature validity span
    /// (`max_signature_age_secs + max_future_skew_secs`), otherwise a
    /// request could become replayable before its signature expires.
    pub fn validate(&self) -> Result<()> {
        if self.max_signature_age_secs == 0 {
            return Err(CuriaError::Configuration(
                "max_signature_age_secs must be > 0".into(),
            ));
        }
        let validity_span = self
            .max_signature_age_secs
            .saturating_add(self.max_future_skew_secs);
        if self.replay_window_secs < validity_span {
            return Err(CuriaError::Configuration(format!(
                "replay_window_secs ({}) must be >= max_signature_age_secs + max_future_skew_secs ({validity_span})",
                self.replay_window_secs
            )));
        }
        if self.sweep_interval_secs == 0 {
            return Err(CuriaError::Configuration(
                "sweep_interval_secs must be > 0".into(),
            ));
        }
        if self.active_storage_key_id.trim().is_empty() {
            return Err(CuriaError::Configuration(
                "active_storage_key_id is not configured".into(),
            ));
        }
        if !self
            .storage_keys
            .contains_key(self.active_storage_key_id.trim())
        {
            return Err(CuriaError::Configuration(format!(
                "active storage key id {:?} has no key material",
                self.active_storage_key_id
            )));
        }
        Ok(())
    }
}

/// Elo parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub k_factor: f64,
    pub initial_rating: f64,
    pub idempotency_cache_size: usize,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            k_factor: constants::DEFAULT_K_FACTOR,
            initial_rating: constants::DEFAULT_INITIAL_RATING,
            idempotency_cache_size: constants::RATING_IDEMPOTENCY_CACHE_SIZE,
        }
    }
}

impl RatingConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.k_factor.is_finite() || self.k_factor <= 0.0 {
            return Err(CuriaError::Configuration(
                "k_factor must be a positive finite value".into(),
            ));
        }
        if !self.initial_rating.is_finite() {
            return Err(CuriaError::Configuration(
                "initial_rating must be finite".into(),
            ));
        }
        if self.idempotency_cache_size == 0 {
            return Err(CuriaError::Configuration(
                "idempotency_cache_size must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

/// Logging settings. `RUST_LOG` overrides `level` at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = CuriaConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.commit_security.max_signature_age_secs, 300);
        assert_eq!(cfg.commit_security.max_future_skew_secs, 60);
        assert_eq!(cfg.commit_security.replay_window_secs, 900);
        assert!(!cfg.commit_security.allow_legacy_unsigned_commits);
        assert!(cfg.commit_security.allow_legacy_reveal_decode);
        assert_eq!(cfg.commit_security.active_storage_key_id, "v1");
        assert!((cfg.rating.k_factor - 32.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let cfg = CuriaConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.commit_security.replay_window_secs, 900);
        assert_eq!(cfg.logging.format, LogFormat::Human);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            [commit_security]
            max_signature_age_secs = 120
            allow_legacy_unsigned_commits = true

            [logging]
            level = "debug"
            format = "json"
        "#;
        let cfg = CuriaConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.commit_security.max_signature_age_secs, 120);
        assert!(cfg.commit_security.allow_legacy_unsigned_commits);
        assert_eq!(cfg.commit_security.replay_window_secs, 900);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, LogFormat::Json);
    }

    #[test]
    fn short_replay_window_rejected() {
        let toml = r"
            [commit_security]
            max_signature_age_secs = 300
            max_future_skew_secs = 60
            replay_window_secs = 200
        ";
        let err = CuriaConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, CuriaError::Configuration(_)), "got {err:?}");
    }

    #[test]
    fn active_key_without_material_rejected() {
        let mut cfg = CommitSecurityConfig::default();
        cfg.active_storage_key_id = "v2".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_positive_k_rejected() {
        let cfg = RatingConfig {
            k_factor: 0.0,
            ..RatingConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = RatingConfig {
            k_factor: f64::NAN,
            ..RatingConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = CuriaConfig::default();
        let text = cfg.to_toml_string().unwrap();
        let back = CuriaConfig::from_toml_str(&text).unwrap();
        assert_eq!(
            back.commit_security.storage_keys,
            cfg.commit_security.storage_keys
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CuriaConfig::from_toml_file("/nonexistent/curia.toml").unwrap_err();
        assert!(matches!(err, CuriaError::Io(_)));
    }
}
