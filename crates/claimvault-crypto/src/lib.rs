//! # Claim Vault Crypto
//!
//! Envelope encryption for claim artifacts.
//!
//! ## Encryption Model
//!
//! Every claim is sealed into an [`Envelope`]: a JWE token (flattened JSON)
//! plus the cleartext thumbprint of the sealing key and the claim id.
//!
//! 1. **Partial claims** are sealed with a shared secret (`A256KW`) so the
//!    server can read them back. A [`KeyRing`] holds the current secret and
//!    previous ones still valid during rotation.
//! 2. **Completed claims** are sealed to the partner's X25519 public key
//!    (`ECDH-ES+A256KW`). The server cannot open them again.
//!
//! Content is encrypted with AES-256-GCM by default, or ChaCha20-Poly1305.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use claimvault_crypto::{
//!     ClaimDecryptor, ClaimEncryptor, ClaimPayload, RotatableDecryptor,
//!     SymmetricClaimEncryptor, SymmetricKey,
//! };
//!
//! let key = SymmetricKey::generate();
//! let mut claim = ClaimPayload::new();
//! claim.insert("id".into(), "123-abc".into());
//!
//! let envelope = SymmetricClaimEncryptor::new(key.clone()).packaged_claim(&claim)?;
//! let opened = RotatableDecryptor::new([key]).decrypt(&envelope)?;
//! assert_eq!(opened, claim);
//! # Ok::<(), claimvault_crypto::CryptoError>(())
//! ```

pub mod asymmetric;
pub mod envelope;
pub mod error;
pub mod jwe;
pub mod jwk;
pub mod keys;
pub mod symmetric;
pub mod traits;

pub use asymmetric::{AsymmetricClaimEncryptor, PartnerClaimDecryptor};
pub use envelope::{payload_id, ClaimPayload, Envelope};
pub use error::{CryptoError, Result};
pub use jwe::{ContentEncryption, JweHeader, JweToken, KeyManagement, OpeningKey, SealingKey};
pub use jwk::Jwk;
pub use keys::{EphemeralKeyPair, KeyRing, PartnerPublicKey, PartnerSecretKey, SymmetricKey};
pub use symmetric::{RotatableDecryptor, SymmetricClaimDecryptor, SymmetricClaimEncryptor};
pub use traits::{ClaimDecryptor, ClaimEncryptor};
