//! Error types for claim envelope cryptography.

use thiserror::Error;

/// Errors that can occur while sealing or opening envelopes.
///
/// Every variant is a hard failure: callers must never fall back to serving
/// data that failed one of these checks.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Authentication failed: the envelope was tampered with or corrupted,
    /// or it was opened with the wrong private key.
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// The supplied key is not the one the envelope was sealed with.
    #[error("key mismatch: envelope sealed with {expected}, key is {found}")]
    KeyMismatch { expected: String, found: String },

    /// None of the candidate keys was used to seal the envelope.
    #[error("no candidate key matches {kid}")]
    NoMatchingKey { kid: String },

    /// The plaintext has no string `id` field.
    #[error("claim payload has no string `id` field")]
    MissingId,

    /// Key material could not be parsed or is the wrong kind.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The token names an algorithm this crate does not implement.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The bytes are not an envelope at all.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// Encryption itself failed.
    #[error("encryption error: {0}")]
    Encryption(String),
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
