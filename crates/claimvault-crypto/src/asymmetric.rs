//! Partner-key adapters for completed claims.
//!
//! The server seals completed claims to the partner's X25519 public key and
//! cannot open them again. Only the partner, holding the private key, can.

use crate::envelope::{ClaimPayload, Envelope};
use crate::error::Result;
use crate::jwe::{ContentEncryption, OpeningKey, SealingKey};
use crate::keys::{PartnerPublicKey, PartnerSecretKey};
use crate::traits::{ClaimDecryptor, ClaimEncryptor};

/// Seals claims to a partner's public key.
#[derive(Debug, Clone)]
pub struct AsymmetricClaimEncryptor {
    partner: PartnerPublicKey,
    enc: ContentEncryption,
}

impl AsymmetricClaimEncryptor {
    /// Create from a JWK or PEM public key, as text or bytes.
    pub fn new(public_key: impl AsRef<[u8]>) -> Result<Self> {
        Ok(Self::from_key(PartnerPublicKey::parse(public_key)?))
    }

    pub fn from_key(partner: PartnerPublicKey) -> Self {
        Self::with_content_encryption(partner, ContentEncryption::default())
    }

    pub fn with_content_encryption(partner: PartnerPublicKey, enc: ContentEncryption) -> Self {
        Self { partner, enc }
    }

    pub fn public_key(&self) -> &PartnerPublicKey {
        &self.partner
    }
}

impl ClaimEncryptor for AsymmetricClaimEncryptor {
    fn kid(&self) -> String {
        self.partner.kid()
    }

    fn packaged_claim(&self, payload: &ClaimPayload) -> Result<Envelope> {
        Envelope::seal(payload, SealingKey::Partner(&self.partner), self.enc)
    }
}

/// Opens completed claims with the partner's private key.
#[derive(Debug)]
pub struct PartnerClaimDecryptor {
    secret: PartnerSecretKey,
}

impl PartnerClaimDecryptor {
    pub fn new(secret: PartnerSecretKey) -> Self {
        Self { secret }
    }
}

impl ClaimDecryptor for PartnerClaimDecryptor {
    fn decrypt(&self, envelope: &Envelope) -> Result<ClaimPayload> {
        envelope.open(OpeningKey::Partner(&self.secret))
    }
}
