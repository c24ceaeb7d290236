//! Cipher adapter traits.

use crate::envelope::{ClaimPayload, Envelope};
use crate::error::Result;

/// Packages plaintext claims into envelopes.
pub trait ClaimEncryptor {
    /// Thumbprint of the key new envelopes are sealed to.
    fn kid(&self) -> String;

    /// Seal a claim payload.
    fn packaged_claim(&self, payload: &ClaimPayload) -> Result<Envelope>;
}

/// Recovers plaintext claims from envelopes.
pub trait ClaimDecryptor {
    /// Open an envelope.
    fn decrypt(&self, envelope: &Envelope) -> Result<ClaimPayload>;

    /// Parse stored bytes and open them.
    fn decrypt_bytes(&self, bytes: &[u8]) -> Result<ClaimPayload> {
        self.decrypt(&Envelope::from_bytes(bytes)?)
    }
}
