//! Vault configuration.
//!
//! Hosts build these explicitly or load them from JSON; nothing is read
//! from the environment.

use serde::Deserialize;

use claimvault_core::BucketKind;
use claimvault_crypto::ContentEncryption;
use claimvault_store::StoreConfig;

use crate::error::{Result, VaultError};

/// Names of the two logical buckets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    /// Encrypted operational copies.
    pub working: String,
    /// Plaintext audit copies of completed claims.
    pub archive: String,
}

impl BucketConfig {
    /// Backend bucket name for a logical bucket.
    pub fn name(&self, kind: BucketKind) -> &str {
        match kind {
            BucketKind::Working => &self.working,
            BucketKind::Archive => &self.archive,
        }
    }
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            working: "claims-working".to_string(),
            archive: "claims-archive".to_string(),
        }
    }
}

/// Configuration for a [`ClaimVault`](crate::ClaimVault).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Bucket names.
    pub buckets: BucketConfig,
    /// Cipher for new envelopes. Existing envelopes are opened with
    /// whatever their header names.
    pub content_encryption: ContentEncryption,
    /// SQLite backend settings.
    pub store: StoreConfig,
}

impl VaultConfig {
    /// Load from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| VaultError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VaultConfig::default();
        assert_eq!(config.buckets.name(BucketKind::Working), "claims-working");
        assert_eq!(config.buckets.name(BucketKind::Archive), "claims-archive");
        assert_eq!(config.content_encryption, ContentEncryption::A256Gcm);
        assert_eq!(config.store.busy_timeout_ms, 5_000);
    }

    #[test]
    fn test_partial_json() {
        let config = VaultConfig::from_json(
            r#"{"buckets": {"archive": "audit"}, "content_encryption": "C20P"}"#,
        )
        .unwrap();
        assert_eq!(config.buckets.working, "claims-working");
        assert_eq!(config.buckets.archive, "audit");
        assert_eq!(config.content_encryption, ContentEncryption::C20P);
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_rejects_unknown_cipher() {
        assert!(matches!(
            VaultConfig::from_json(r#"{"content_encryption": "A128CBC-HS256"}"#),
            Err(VaultError::Config(_))
        ));
    }
}
