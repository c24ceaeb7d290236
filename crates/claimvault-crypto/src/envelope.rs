//! The persisted claim envelope.
//!
//! An envelope is the JWE token plus two cleartext routing fields: the
//! thumbprint of the key it was sealed to and the id of the claim inside.
//! Both are authenticated indirectly: the `kid` is bound through the
//! protected header and the id is checked against the decrypted payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CryptoError, Result};
use crate::jwe::{ContentEncryption, JweToken, OpeningKey, SealingKey};

/// A decrypted claim: a JSON object with a string `id` member.
pub type ClaimPayload = serde_json::Map<String, Value>;

/// The `id` of a claim payload.
///
/// Any string is accepted here. Whether it can name a storage path is
/// decided where the path is derived.
pub fn payload_id(payload: &ClaimPayload) -> Result<&str> {
    payload
        .get("id")
        .and_then(Value::as_str)
        .ok_or(CryptoError::MissingId)
}

/// An encrypted claim as written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Thumbprint of the key the claim was sealed to.
    pub public_kid: String,

    /// Id of the claim, equal to the `id` inside the ciphertext.
    pub claim_id: String,

    /// The ciphertext package.
    pub claim: JweToken,
}

impl Envelope {
    /// Seal a payload to `key`.
    ///
    /// The payload must carry a string `id`; it becomes `claim_id`.
    pub fn seal(payload: &ClaimPayload, key: SealingKey<'_>, enc: ContentEncryption) -> Result<Self> {
        let claim_id = payload_id(payload)?.to_string();
        let plaintext = serde_json::to_vec(payload)
            .map_err(|e| CryptoError::Encryption(format!("payload: {e}")))?;

        Ok(Self {
            public_kid: key.kid(),
            claim_id,
            claim: JweToken::seal(key, enc, &plaintext)?,
        })
    }

    /// Open the envelope and verify the claim id.
    pub fn open(&self, key: OpeningKey<'_>) -> Result<ClaimPayload> {
        // A shared secret's thumbprint is known up front; check it before
        // touching the ciphertext.
        if let OpeningKey::Symmetric(key) = key {
            if key.kid() != self.public_kid {
                return Err(CryptoError::KeyMismatch {
                    expected: self.public_kid.clone(),
                    found: key.kid().to_string(),
                });
            }
        }

        let header = self.claim.header()?;
        if header.kid != self.public_kid {
            return Err(CryptoError::Integrity(format!(
                "header kid {} does not match envelope kid {}",
                header.kid, self.public_kid
            )));
        }

        let plaintext = self.claim.open(key)?;
        let payload: ClaimPayload = serde_json::from_slice(&plaintext)
            .map_err(|e| CryptoError::Integrity(format!("decrypted payload: {e}")))?;

        match payload.get("id").and_then(Value::as_str) {
            Some(id) if id == self.claim_id => Ok(payload),
            found => Err(CryptoError::Integrity(format!(
                "claim id {} does not match decrypted id {found:?}",
                self.claim_id
            ))),
        }
    }

    /// Parse and open stored bytes in one step.
    pub fn open_bytes(bytes: &[u8], key: OpeningKey<'_>) -> Result<ClaimPayload> {
        Self::from_bytes(bytes)?.open(key)
    }

    /// The id of the claim inside.
    pub fn claim_id(&self) -> &str {
        &self.claim_id
    }

    /// Thumbprint of the sealing key.
    pub fn kid(&self) -> &str {
        &self.public_kid
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CryptoError::Encryption(format!("envelope: {e}")))
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| CryptoError::Malformed(e.to_string()))
    }
}
