//! Error types for Claim Vault.

use std::fmt;

use claimvault_core::{ArtifactClass, ArtifactPath, CoreError, EntityId};
use claimvault_crypto::CryptoError;
use claimvault_store::StoreError;
use thiserror::Error;

/// Errors that can occur during vault operations.
///
/// Storage failures at the gateway are reported as `false`/`None`, not as
/// errors; only setup and cryptography raise.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Cryptographic failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Storage error during setup.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    Core(#[from] CoreError),

    /// Payload `id` does not belong to the entity it is stored for.
    #[error("payload id {payload} does not match entity {entity}")]
    IdMismatch { entity: EntityId, payload: String },

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Which storage operation failed during rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Read,
    Write,
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageOp::Read => f.write_str("read"),
            StorageOp::Write => f.write_str("write re-encrypted"),
        }
    }
}

/// Errors that abort rotation of one principal.
///
/// Artifacts rotated before the failure stay rotated; re-running the
/// rotation picks up where it stopped.
#[derive(Debug, Error)]
pub enum RotationError {
    /// An artifact could not be read or written back.
    #[error("could not {op} {class} at {path}")]
    Storage {
        op: StorageOp,
        class: ArtifactClass,
        path: ArtifactPath,
    },

    /// An artifact could not be opened with the old key or sealed with the new one.
    #[error("could not re-encrypt {class} at {path}: {source}")]
    Crypto {
        class: ArtifactClass,
        path: ArtifactPath,
        #[source]
        source: CryptoError,
    },
}

impl RotationError {
    pub fn class(&self) -> ArtifactClass {
        match self {
            RotationError::Storage { class, .. } | RotationError::Crypto { class, .. } => *class,
        }
    }

    pub fn path(&self) -> &ArtifactPath {
        match self {
            RotationError::Storage { path, .. } | RotationError::Crypto { path, .. } => path,
        }
    }
}
