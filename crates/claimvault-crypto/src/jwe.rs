//! JSON Web Encryption (RFC 7516) tokens in flattened JSON form.
//!
//! Key management is `A256KW` for shared secrets and `ECDH-ES+A256KW`
//! (ephemeral X25519, Concat KDF over SHA-256) for partner keys. Content is
//! encrypted with `A256GCM` or `C20P` under a fresh random key; the ASCII of
//! the protected header is the additional authenticated data.

use std::fmt;
use std::str::FromStr;

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::{aead::AeadInPlace, Aes256Gcm, KeyInit};
use aes_kw::{Kek, KekAes256};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chacha20poly1305::ChaCha20Poly1305;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};
use crate::jwk::Jwk;
use crate::keys::{EphemeralKeyPair, PartnerPublicKey, PartnerSecretKey, SymmetricKey};

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;
const WRAPPED_KEY_LEN: usize = 40;

/// How the content encryption key is protected (`alg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyManagement {
    /// AES-256 key wrap with a shared secret.
    A256Kw,
    /// Ephemeral-static X25519 agreement, then AES-256 key wrap.
    EcdhEsA256Kw,
}

impl KeyManagement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A256Kw => "A256KW",
            Self::EcdhEsA256Kw => "ECDH-ES+A256KW",
        }
    }
}

impl FromStr for KeyManagement {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A256KW" => Ok(Self::A256Kw),
            "ECDH-ES+A256KW" => Ok(Self::EcdhEsA256Kw),
            other => Err(CryptoError::UnsupportedAlgorithm(format!("alg {other}"))),
        }
    }
}

impl fmt::Display for KeyManagement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated cipher applied to the payload (`enc`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentEncryption {
    /// AES-256 in Galois/Counter Mode.
    #[default]
    #[serde(rename = "A256GCM")]
    A256Gcm,
    /// ChaCha20-Poly1305.
    #[serde(rename = "C20P")]
    C20P,
}

impl ContentEncryption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A256Gcm => "A256GCM",
            Self::C20P => "C20P",
        }
    }

    /// Encrypt in place, returning the ciphertext and detached tag.
    pub fn encrypt(
        &self,
        cek: &[u8; 32],
        iv: &[u8; IV_LEN],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut buffer = plaintext.to_vec();
        let tag = match self {
            Self::A256Gcm => Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(cek))
                .encrypt_in_place_detached(aes_gcm::Nonce::from_slice(iv), aad, &mut buffer)
                .map(|tag| tag.to_vec()),
            Self::C20P => ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(cek))
                .encrypt_in_place_detached(chacha20poly1305::Nonce::from_slice(iv), aad, &mut buffer)
                .map(|tag| tag.to_vec()),
        }
        .map_err(|e| CryptoError::Encryption(format!("{self} encrypt failed: {e:?}")))?;
        Ok((buffer, tag))
    }

    /// Verify the tag and decrypt.
    pub fn decrypt(
        &self,
        cek: &[u8; 32],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>> {
        if iv.len() != IV_LEN {
            return Err(CryptoError::Integrity(format!("iv is {} bytes", iv.len())));
        }
        if tag.len() != TAG_LEN {
            return Err(CryptoError::Integrity(format!("tag is {} bytes", tag.len())));
        }

        let mut buffer = ciphertext.to_vec();
        match self {
            Self::A256Gcm => Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(cek))
                .decrypt_in_place_detached(
                    aes_gcm::Nonce::from_slice(iv),
                    aad,
                    &mut buffer,
                    GenericArray::from_slice(tag),
                ),
            Self::C20P => ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(cek))
                .decrypt_in_place_detached(
                    chacha20poly1305::Nonce::from_slice(iv),
                    aad,
                    &mut buffer,
                    GenericArray::from_slice(tag),
                ),
        }
        .map_err(|_| CryptoError::Integrity(format!("{self} authentication failed")))?;
        Ok(buffer)
    }
}

impl FromStr for ContentEncryption {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A256GCM" => Ok(Self::A256Gcm),
            "C20P" => Ok(Self::C20P),
            other => Err(CryptoError::UnsupportedAlgorithm(format!("enc {other}"))),
        }
    }
}

impl fmt::Display for ContentEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The integrity-protected JOSE header.
///
/// `alg` and `enc` stay as strings so that unknown values surface as
/// [`CryptoError::UnsupportedAlgorithm`] rather than a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JweHeader {
    pub alg: String,
    pub enc: String,
    pub kid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epk: Option<Jwk>,
}

impl JweHeader {
    pub fn key_management(&self) -> Result<KeyManagement> {
        self.alg.parse()
    }

    pub fn content_encryption(&self) -> Result<ContentEncryption> {
        self.enc.parse()
    }
}

/// Key used to seal a token.
#[derive(Debug, Clone, Copy)]
pub enum SealingKey<'a> {
    Symmetric(&'a SymmetricKey),
    Partner(&'a PartnerPublicKey),
}

impl SealingKey<'_> {
    /// Thumbprint recorded as the token's `kid`.
    pub fn kid(&self) -> String {
        match self {
            Self::Symmetric(key) => key.kid().to_string(),
            Self::Partner(key) => key.kid(),
        }
    }
}

/// Key used to open a token.
#[derive(Debug, Clone, Copy)]
pub enum OpeningKey<'a> {
    Symmetric(&'a SymmetricKey),
    Partner(&'a PartnerSecretKey),
}

/// A JWE in flattened JSON serialization. All members are base64url
/// without padding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JweToken {
    pub protected: String,
    pub encrypted_key: String,
    pub iv: String,
    pub ciphertext: String,
    pub tag: String,
}

impl JweToken {
    /// Encrypt `plaintext` to `key` under a fresh content key and IV.
    pub fn seal(key: SealingKey<'_>, enc: ContentEncryption, plaintext: &[u8]) -> Result<Self> {
        let mut rng = rand::thread_rng();
        let mut cek = Zeroizing::new([0u8; 32]);
        rng.fill_bytes(&mut cek[..]);
        let mut iv = [0u8; IV_LEN];
        rng.fill_bytes(&mut iv);

        let (header, kek) = match key {
            SealingKey::Symmetric(key) => {
                let header = JweHeader {
                    alg: KeyManagement::A256Kw.to_string(),
                    enc: enc.to_string(),
                    kid: key.kid().to_string(),
                    epk: None,
                };
                (header, Zeroizing::new(*key.as_bytes()))
            }
            SealingKey::Partner(partner) => {
                let ephemeral = EphemeralKeyPair::generate();
                let mut epk = Jwk::x25519_public(ephemeral.public_key().as_bytes());
                epk.kid = None;
                let z = ephemeral.diffie_hellman(partner)?;
                let header = JweHeader {
                    alg: KeyManagement::EcdhEsA256Kw.to_string(),
                    enc: enc.to_string(),
                    kid: partner.kid(),
                    epk: Some(epk),
                };
                (header, derive_wrapping_key(&z[..])?)
            }
        };

        let header_json = serde_json::to_vec(&header)
            .map_err(|e| CryptoError::Encryption(format!("header: {e}")))?;
        let protected = URL_SAFE_NO_PAD.encode(header_json);
        let encrypted_key = wrap_key(&kek, &cek)?;
        let (ciphertext, tag) = enc.encrypt(&cek, &iv, protected.as_bytes(), plaintext)?;

        Ok(Self {
            protected,
            encrypted_key: URL_SAFE_NO_PAD.encode(encrypted_key),
            iv: URL_SAFE_NO_PAD.encode(iv),
            ciphertext: URL_SAFE_NO_PAD.encode(ciphertext),
            tag: URL_SAFE_NO_PAD.encode(tag),
        })
    }

    /// Decode the protected header.
    pub fn header(&self) -> Result<JweHeader> {
        let json = decode_member("protected", &self.protected)?;
        serde_json::from_slice(&json)
            .map_err(|e| CryptoError::Integrity(format!("protected header: {e}")))
    }

    /// Recover the content key and decrypt.
    pub fn open(&self, key: OpeningKey<'_>) -> Result<Vec<u8>> {
        let header = self.header()?;
        let alg = header.key_management()?;
        let enc = header.content_encryption()?;

        let kek = match (alg, key) {
            (KeyManagement::A256Kw, OpeningKey::Symmetric(key)) => Zeroizing::new(*key.as_bytes()),
            (KeyManagement::EcdhEsA256Kw, OpeningKey::Partner(secret)) => {
                let epk = header
                    .epk
                    .as_ref()
                    .ok_or_else(|| CryptoError::Integrity("missing epk".to_string()))?;
                let epk = epk
                    .x25519_x()
                    .map_err(|e| CryptoError::Integrity(format!("epk: {e}")))?;
                let z = secret.diffie_hellman(&PartnerPublicKey::from_bytes(epk))?;
                derive_wrapping_key(&z[..])?
            }
            (alg, _) => {
                return Err(CryptoError::KeyMismatch {
                    expected: format!("{alg} key {}", header.kid),
                    found: "a key of another kind".to_string(),
                })
            }
        };

        let cek = unwrap_key(&kek, &decode_member("encrypted_key", &self.encrypted_key)?)?;
        enc.decrypt(
            &cek,
            &decode_member("iv", &self.iv)?,
            self.protected.as_bytes(),
            &decode_member("ciphertext", &self.ciphertext)?,
            &decode_member("tag", &self.tag)?,
        )
    }
}

fn decode_member(name: &str, value: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| CryptoError::Integrity(format!("{name} is not base64url: {e}")))
}

fn derive_wrapping_key(z: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let mut kek = Zeroizing::new([0u8; 32]);
    concat_kdf(z, KeyManagement::EcdhEsA256Kw.as_str(), b"", b"", &mut kek[..])?;
    Ok(kek)
}

/// Concat KDF (NIST SP 800-56A) with SHA-256, as parameterized by RFC 7518
/// section 4.6.2. Derives `out.len()` bytes.
pub fn concat_kdf(z: &[u8], alg: &str, apu: &[u8], apv: &[u8], out: &mut [u8]) -> Result<()> {
    let mut other_info = Vec::with_capacity(16 + alg.len() + apu.len() + apv.len());
    for field in [alg.as_bytes(), apu, apv] {
        other_info.extend_from_slice(&(field.len() as u32).to_be_bytes());
        other_info.extend_from_slice(field);
    }
    other_info.extend_from_slice(&((out.len() * 8) as u32).to_be_bytes());

    concat_kdf::derive_key_into::<Sha256>(z, &other_info, out)
        .map_err(|e| CryptoError::Encryption(format!("concat KDF: {e:?}")))
}

/// AES-256 key wrap (RFC 3394).
pub fn wrap_key(kek: &[u8; 32], cek: &[u8; 32]) -> Result<[u8; WRAPPED_KEY_LEN]> {
    let kek: KekAes256 = Kek::new(&GenericArray::from(*kek));
    let mut wrapped = [0u8; WRAPPED_KEY_LEN];
    kek.wrap(cek, &mut wrapped)
        .map_err(|e| CryptoError::Encryption(format!("key wrap: {e:?}")))?;
    Ok(wrapped)
}

/// Reverse of [`wrap_key`]. A failed integrity check means the wrong
/// key-encryption key or a tampered token.
pub fn unwrap_key(kek: &[u8; 32], wrapped: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    if wrapped.len() != WRAPPED_KEY_LEN {
        return Err(CryptoError::Integrity(format!(
            "encrypted_key is {} bytes",
            wrapped.len()
        )));
    }
    let kek: KekAes256 = Kek::new(&GenericArray::from(*kek));
    let mut cek = Zeroizing::new([0u8; 32]);
    kek.unwrap(wrapped, &mut cek[..])
        .map_err(|_| CryptoError::Integrity("key unwrap failed".to_string()))?;
    Ok(cek)
}
