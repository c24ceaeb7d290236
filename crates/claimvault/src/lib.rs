//! # Claim Vault
//!
//! Encrypted storage for claim artifacts: a claimant's personal data is
//! sealed before it leaves the server, filed at a deterministic path, and
//! can be re-encrypted under a new key without downtime.
//!
//! ## Overview
//!
//! - **Partial claims and claimant files** are sealed with a shared secret
//!   from a [`KeyRing`] so the server can read them back.
//! - **Completed claims** are sealed to the partner's X25519 public key and
//!   a plaintext copy is kept in the archive bucket.
//! - **Rotation** re-encrypts every server-readable artifact of a principal
//!   from an old key to a new one; re-running it is safe.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use claimvault::{ClaimVault, KeyRing, SymmetricKey, VaultConfig};
//! use claimvault::store::SqliteObjectStore;
//!
//! let config = VaultConfig::default();
//! let backend = SqliteObjectStore::open("claims.db", &config.store)?;
//! let keys = KeyRing::new(vec![SymmetricKey::generate()])?;
//!
//! let vault = ClaimVault::new(backend, keys, config);
//! vault.ensure_buckets()?;
//!
//! // let saved = vault.save_partial(&claim, &payload)?;
//! // let payload = vault.load_partial(&claim)?;
//! # Ok::<(), claimvault::VaultError>(())
//! ```
//!
//! ## Re-exports
//!
//! - `claimvault::core` - Identifiers, paths and entity traits
//! - `claimvault::crypto` - Keys, JWE tokens and envelopes
//! - `claimvault::store` - Object storage backends

pub mod config;
pub mod error;
pub mod gateway;
pub mod rotation;
pub mod vault;

// Re-export component crates
pub use claimvault_core as core;
pub use claimvault_crypto as crypto;
pub use claimvault_store as store;

// Re-export main types for convenience
pub use config::{BucketConfig, VaultConfig};
pub use error::{Result, RotationError, StorageOp, VaultError};
pub use gateway::{ArtifactStore, DeleteReport};
pub use rotation::{KeyRotation, Principal, PrincipalOutcome, RotationObserver, RotationReport};
pub use vault::ClaimVault;

pub use claimvault_core::{
    ArtifactClass, ArtifactPath, BucketKind, ClaimEntity, ClaimStatus, EntityId, HookError,
    HookResult, Lifecycle, PartnerCode, StoredEntity,
};
pub use claimvault_crypto::{
    ClaimPayload, ContentEncryption, CryptoError, Envelope, KeyRing, PartnerPublicKey,
    PartnerSecretKey, SymmetricKey,
};
pub use claimvault_store::{MemoryObjectStore, ObjectStore, SqliteObjectStore, StoreConfig};
