//! Key material for claim envelopes.
//!
//! Provides 256-bit shared secrets for partial claims and X25519 partner keys
//! for completed claims. Every key carries its RFC 7638 thumbprint, which is
//! the `public_kid` recorded in envelopes.

use std::fmt;

use rand::RngCore;
use serde::Deserialize;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};
use crate::jwk::{self, Jwk};

/// A 256-bit shared secret used to seal partial claims.
#[derive(Clone)]
pub struct SymmetricKey {
    secret: Zeroizing<[u8; 32]>,
    kid: String,
}

impl SymmetricKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut secret = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut secret[..]);
        Self::from_bytes(*secret)
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        let kid = jwk::oct_thumbprint(&bytes);
        Self {
            secret: Zeroizing::new(bytes),
            kid,
        }
    }

    /// Parse an `oct` JWK.
    pub fn from_jwk(json: impl AsRef<[u8]>) -> Result<Self> {
        Self::try_from(&Jwk::from_json(json.as_ref())?)
    }

    /// Export as an `oct` JWK.
    pub fn to_jwk(&self) -> Jwk {
        Jwk::oct(self.secret.as_ref())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.secret
    }

    /// The key's thumbprint.
    pub fn kid(&self) -> &str {
        &self.kid
    }
}

impl TryFrom<&Jwk> for SymmetricKey {
    type Error = CryptoError;

    fn try_from(jwk: &Jwk) -> Result<Self> {
        Ok(Self::from_bytes(*jwk.oct_secret()?))
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.kid == other.kid
    }
}

impl Eq for SymmetricKey {}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey({})", self.kid)
    }
}

/// The ordered set of valid shared secrets.
///
/// The first key is current and seals new envelopes; the rest are previous
/// keys kept for trial decryption during a rotation window.
#[derive(Debug, Clone)]
pub struct KeyRing {
    keys: Vec<SymmetricKey>,
}

#[derive(Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

impl KeyRing {
    /// Create a key ring. The first key becomes current.
    pub fn new(keys: Vec<SymmetricKey>) -> Result<Self> {
        if keys.is_empty() {
            return Err(CryptoError::InvalidKey("key ring is empty".to_string()));
        }
        Ok(Self { keys })
    }

    /// Load from a JWK Set (`{"keys": [...]}`), current key first.
    pub fn from_jwk_set(json: impl AsRef<[u8]>) -> Result<Self> {
        let set: JwkSet = serde_json::from_slice(json.as_ref())
            .map_err(|e| CryptoError::InvalidKey(format!("JWK set: {e}")))?;
        let keys = set
            .keys
            .iter()
            .map(SymmetricKey::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::new(keys)
    }

    /// The key used for new envelopes.
    pub fn current(&self) -> &SymmetricKey {
        &self.keys[0]
    }

    /// Previous keys, most recent first.
    pub fn previous(&self) -> &[SymmetricKey] {
        &self.keys[1..]
    }

    /// All keys in trial order.
    pub fn candidates(&self) -> &[SymmetricKey] {
        &self.keys
    }

    /// Find the key with the given thumbprint.
    pub fn find(&self, kid: &str) -> Option<&SymmetricKey> {
        self.keys.iter().find(|k| k.kid() == kid)
    }

    /// Make `key` current, keeping the old keys as previous.
    ///
    /// A key already in the ring is moved to the front rather than duplicated.
    pub fn promote(&mut self, key: SymmetricKey) {
        self.keys.retain(|k| k != &key);
        self.keys.insert(0, key);
    }
}

/// An X25519 partner public key.
///
/// The server holds only this half; completed claims sealed to it can be
/// read only by the partner.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PartnerPublicKey {
    bytes: [u8; 32],
}

impl PartnerPublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Parse a public key given as a JWK, a PEM document, or 32 raw bytes.
    ///
    /// Accepts anything byte-like so callers can pass `&str`, `String` or
    /// `Vec<u8>` straight from their configuration.
    pub fn parse(input: impl AsRef<[u8]>) -> Result<Self> {
        let input = input.as_ref();
        let text = std::str::from_utf8(input).ok().map(str::trim_start);

        match text {
            Some(t) if t.starts_with('{') => Self::try_from(&Jwk::from_json(input)?),
            Some(t) if t.starts_with("-----BEGIN") => Ok(Self::from_bytes(jwk::x25519_from_pem(t)?)),
            _ => {
                let bytes: [u8; 32] = input.try_into().map_err(|_| {
                    CryptoError::InvalidKey("expected JWK, PEM or 32 raw bytes".to_string())
                })?;
                Ok(Self::from_bytes(bytes))
            }
        }
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// The key's thumbprint.
    pub fn kid(&self) -> String {
        jwk::x25519_thumbprint(&self.bytes)
    }

    /// Export as a public JWK.
    pub fn to_jwk(&self) -> Jwk {
        Jwk::x25519_public(&self.bytes)
    }

    /// Export as PEM.
    pub fn to_pem(&self) -> String {
        jwk::x25519_to_pem(&self.bytes)
    }

    /// Convert to x25519-dalek PublicKey.
    pub fn to_dalek(&self) -> PublicKey {
        PublicKey::from(self.bytes)
    }
}

impl TryFrom<&Jwk> for PartnerPublicKey {
    type Error = CryptoError;

    fn try_from(jwk: &Jwk) -> Result<Self> {
        Ok(Self::from_bytes(jwk.x25519_x()?))
    }
}

impl From<PublicKey> for PartnerPublicKey {
    fn from(pk: PublicKey) -> Self {
        Self::from_bytes(*pk.as_bytes())
    }
}

impl fmt::Debug for PartnerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartnerPublicKey({})", self.kid())
    }
}

/// The partner's X25519 private key.
///
/// Held by the partner, never by the serving infrastructure.
pub struct PartnerSecretKey(StaticSecret);

impl PartnerSecretKey {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(rand::thread_rng()))
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Parse a private OKP JWK.
    pub fn from_jwk(json: impl AsRef<[u8]>) -> Result<Self> {
        let jwk = Jwk::from_json(json.as_ref())?;
        let secret = Self::from_bytes(*jwk.x25519_d()?);
        if jwk.x.is_some() && secret.public_key().as_bytes() != &jwk.x25519_x()? {
            return Err(CryptoError::InvalidKey(
                "public member does not belong to the private key".to_string(),
            ));
        }
        Ok(secret)
    }

    /// Export as a private JWK.
    pub fn to_jwk(&self) -> Jwk {
        Jwk::x25519_private(self.public_key().as_bytes(), &self.0.to_bytes())
    }

    /// Derive the public key.
    pub fn public_key(&self) -> PartnerPublicKey {
        PartnerPublicKey::from(PublicKey::from(&self.0))
    }

    /// Perform key agreement with a peer's public key.
    ///
    /// Fails on low-order peer points, which would yield an all-zero secret.
    pub fn diffie_hellman(&self, peer_public: &PartnerPublicKey) -> Result<Zeroizing<[u8; 32]>> {
        let shared = self.0.diffie_hellman(&peer_public.to_dalek());
        if !shared.was_contributory() {
            return Err(CryptoError::Integrity(
                "non-contributory key agreement".to_string(),
            ));
        }
        Ok(Zeroizing::new(*shared.as_bytes()))
    }
}

impl fmt::Debug for PartnerSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartnerSecretKey({})", self.public_key().kid())
    }
}

/// Ephemeral key pair for one-time key agreement.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: PartnerPublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new ephemeral key pair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = PartnerPublicKey::from(PublicKey::from(&secret));
        Self { secret, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> PartnerPublicKey {
        self.public
    }

    /// Perform key agreement with a peer's public key.
    ///
    /// Consumes the ephemeral secret (can only be used once).
    pub fn diffie_hellman(self, peer_public: &PartnerPublicKey) -> Result<Zeroizing<[u8; 32]>> {
        let shared = self.secret.diffie_hellman(&peer_public.to_dalek());
        if !shared.was_contributory() {
            return Err(CryptoError::InvalidKey(
                "partner public key is a low-order point".to_string(),
            ));
        }
        Ok(Zeroizing::new(*shared.as_bytes()))
    }
}
