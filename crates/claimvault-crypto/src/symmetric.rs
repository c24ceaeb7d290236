//! Shared-secret adapters for partial claims.
//!
//! Partial claims are read back by the server, so they are sealed with a
//! key the server holds. During a rotation window several keys are valid;
//! [`RotatableDecryptor`] picks the right one by thumbprint.

use crate::envelope::{ClaimPayload, Envelope};
use crate::error::{CryptoError, Result};
use crate::jwe::{ContentEncryption, OpeningKey, SealingKey};
use crate::keys::{KeyRing, SymmetricKey};
use crate::traits::{ClaimDecryptor, ClaimEncryptor};

/// Seals claims with one active shared secret.
#[derive(Debug, Clone)]
pub struct SymmetricClaimEncryptor {
    key: SymmetricKey,
    enc: ContentEncryption,
}

impl SymmetricClaimEncryptor {
    pub fn new(key: SymmetricKey) -> Self {
        Self::with_content_encryption(key, ContentEncryption::default())
    }

    pub fn with_content_encryption(key: SymmetricKey, enc: ContentEncryption) -> Self {
        Self { key, enc }
    }

    pub fn key(&self) -> &SymmetricKey {
        &self.key
    }
}

impl ClaimEncryptor for SymmetricClaimEncryptor {
    fn kid(&self) -> String {
        self.key.kid().to_string()
    }

    fn packaged_claim(&self, payload: &ClaimPayload) -> Result<Envelope> {
        Envelope::seal(payload, SealingKey::Symmetric(&self.key), self.enc)
    }
}

/// Opens claims sealed with exactly one shared secret.
#[derive(Debug, Clone)]
pub struct SymmetricClaimDecryptor {
    key: SymmetricKey,
}

impl SymmetricClaimDecryptor {
    pub fn new(key: SymmetricKey) -> Self {
        Self { key }
    }
}

impl ClaimDecryptor for SymmetricClaimDecryptor {
    fn decrypt(&self, envelope: &Envelope) -> Result<ClaimPayload> {
        envelope.open(OpeningKey::Symmetric(&self.key))
    }
}

/// Opens claims with whichever candidate key sealed them.
#[derive(Debug, Clone)]
pub struct RotatableDecryptor {
    candidates: Vec<SymmetricKey>,
}

impl RotatableDecryptor {
    /// Candidates are tried in order.
    pub fn new(candidates: impl IntoIterator<Item = SymmetricKey>) -> Self {
        Self {
            candidates: candidates.into_iter().collect(),
        }
    }

    pub fn from_ring(ring: &KeyRing) -> Self {
        Self::new(ring.candidates().iter().cloned())
    }

    /// The first candidate whose thumbprint matches the envelope.
    pub fn key_for(&self, envelope: &Envelope) -> Result<&SymmetricKey> {
        self.candidates
            .iter()
            .find(|k| k.kid() == envelope.kid())
            .ok_or_else(|| CryptoError::NoMatchingKey {
                kid: envelope.kid().to_string(),
            })
    }
}

impl ClaimDecryptor for RotatableDecryptor {
    fn decrypt(&self, envelope: &Envelope) -> Result<ClaimPayload> {
        envelope.open(OpeningKey::Symmetric(self.key_for(envelope)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claim(id: &str) -> ClaimPayload {
        let mut p = ClaimPayload::new();
        p.insert("id".to_string(), json!(id));
        p.insert("answers".to_string(), json!({"q1": "yes"}));
        p
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = SymmetricKey::generate();
        let encryptor = SymmetricClaimEncryptor::new(key.clone());
        let envelope = encryptor.packaged_claim(&claim("c1")).unwrap();

        assert_eq!(envelope.kid(), encryptor.kid());
        let opened = SymmetricClaimDecryptor::new(key).decrypt(&envelope).unwrap();
        assert_eq!(opened, claim("c1"));
    }

    #[test]
    fn test_chacha_content_encryption() {
        let key = SymmetricKey::generate();
        let encryptor =
            SymmetricClaimEncryptor::with_content_encryption(key.clone(), ContentEncryption::C20P);
        let envelope = encryptor.packaged_claim(&claim("c2")).unwrap();

        assert_eq!(envelope.claim.header().unwrap().enc, "C20P");
        let bytes = envelope.to_bytes().unwrap();
        let opened = SymmetricClaimDecryptor::new(key).decrypt_bytes(&bytes).unwrap();
        assert_eq!(opened, claim("c2"));
    }

    #[test]
    fn test_trial_decryption() {
        let k1 = SymmetricKey::generate();
        let k2 = SymmetricKey::generate();
        let k3 = SymmetricKey::generate();
        let envelope = SymmetricClaimEncryptor::new(k2.clone())
            .packaged_claim(&claim("c3"))
            .unwrap();

        let all = RotatableDecryptor::new([k1.clone(), k2.clone(), k3.clone()]);
        assert_eq!(all.key_for(&envelope).unwrap(), &k2);
        assert_eq!(all.decrypt(&envelope).unwrap(), claim("c3"));

        let without = RotatableDecryptor::new([k1, k3]);
        match without.decrypt(&envelope) {
            Err(CryptoError::NoMatchingKey { kid }) => assert_eq!(kid, k2.kid()),
            other => panic!("expected NoMatchingKey, got {other:?}"),
        }
    }

    #[test]
    fn test_from_ring() {
        let old = SymmetricKey::generate();
        let new = SymmetricKey::generate();
        let ring = KeyRing::new(vec![new.clone(), old.clone()]).unwrap();
        let envelope = SymmetricClaimEncryptor::new(old)
            .packaged_claim(&claim("c4"))
            .unwrap();

        let opened = RotatableDecryptor::from_ring(&ring).decrypt(&envelope).unwrap();
        assert_eq!(opened, claim("c4"));
    }
}
