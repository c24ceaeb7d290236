//! JSON Web Keys (RFC 7517) and thumbprints (RFC 7638).
//!
//! Only the two key shapes the vault uses are supported: `oct` shared
//! secrets and `OKP`/`X25519` partner keys. PEM input is accepted for
//! partner public keys (X25519 SubjectPublicKeyInfo).

use std::fmt;

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, Result};

/// DER prefix of an X25519 SubjectPublicKeyInfo (RFC 8410), followed by the
/// 32-byte key.
const X25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x6e, 0x03, 0x21, 0x00,
];

const PEM_BEGIN: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_END: &str = "-----END PUBLIC KEY-----";

/// A JSON Web Key, restricted to the members the vault reads.
///
/// Secret members are wiped on drop.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Jwk {
    /// Parse a JWK from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Build an `oct` JWK from raw secret bytes.
    pub fn oct(secret: &[u8]) -> Self {
        let mut jwk = Self::default();
        jwk.kty = "oct".to_string();
        jwk.k = Some(URL_SAFE_NO_PAD.encode(secret));
        jwk.kid = Some(oct_thumbprint(secret));
        jwk
    }

    /// Build an X25519 public JWK.
    pub fn x25519_public(x: &[u8; 32]) -> Self {
        let mut jwk = Self::default();
        jwk.kty = "OKP".to_string();
        jwk.crv = Some("X25519".to_string());
        jwk.x = Some(URL_SAFE_NO_PAD.encode(x));
        jwk.kid = Some(x25519_thumbprint(x));
        jwk
    }

    /// Build an X25519 private JWK.
    pub fn x25519_private(x: &[u8; 32], d: &[u8; 32]) -> Self {
        let mut jwk = Self::x25519_public(x);
        jwk.d = Some(URL_SAFE_NO_PAD.encode(d));
        jwk
    }

    /// Decode the 32-byte secret of an `oct` key.
    pub fn oct_secret(&self) -> Result<Zeroizing<[u8; 32]>> {
        self.expect_kty("oct")?;
        decode_key_member("k", self.k.as_deref())
    }

    /// Decode the public `x` coordinate of an X25519 key.
    pub fn x25519_x(&self) -> Result<[u8; 32]> {
        self.expect_x25519()?;
        let x = decode_key_member("x", self.x.as_deref())?;
        Ok(*x)
    }

    /// Decode the private scalar `d` of an X25519 key.
    pub fn x25519_d(&self) -> Result<Zeroizing<[u8; 32]>> {
        self.expect_x25519()?;
        decode_key_member("d", self.d.as_deref())
    }

    fn expect_kty(&self, kty: &str) -> Result<()> {
        if self.kty == kty {
            Ok(())
        } else {
            Err(CryptoError::InvalidKey(format!(
                "expected kty {kty}, found {}",
                self.kty
            )))
        }
    }

    fn expect_x25519(&self) -> Result<()> {
        self.expect_kty("OKP")?;
        match self.crv.as_deref() {
            Some("X25519") => Ok(()),
            other => Err(CryptoError::InvalidKey(format!(
                "expected crv X25519, found {other:?}"
            ))),
        }
    }
}

impl Drop for Jwk {
    fn drop(&mut self) {
        self.d.zeroize();
        self.k.zeroize();
    }
}

impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

fn decode_key_member(name: &str, value: Option<&str>) -> Result<Zeroizing<[u8; 32]>> {
    let value = value.ok_or_else(|| CryptoError::InvalidKey(format!("missing member {name}")))?;
    let bytes = Zeroizing::new(
        URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|e| CryptoError::InvalidKey(format!("member {name}: {e}")))?,
    );
    if bytes.len() != 32 {
        return Err(CryptoError::InvalidKey(format!(
            "member {name}: expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// RFC 7638 thumbprint of an `oct` key.
pub fn oct_thumbprint(secret: &[u8]) -> String {
    // Required members in lexicographic order, no whitespace.
    let canonical = Zeroizing::new(format!(
        r#"{{"k":"{}","kty":"oct"}}"#,
        URL_SAFE_NO_PAD.encode(secret)
    ));
    URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
}

/// RFC 7638 thumbprint of an X25519 public key.
pub fn x25519_thumbprint(x: &[u8; 32]) -> String {
    let canonical = format!(
        r#"{{"crv":"X25519","kty":"OKP","x":"{}"}}"#,
        URL_SAFE_NO_PAD.encode(x)
    );
    URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
}

/// Parse a PEM-encoded X25519 public key.
pub fn x25519_from_pem(pem: &str) -> Result<[u8; 32]> {
    let body = pem
        .trim()
        .strip_prefix(PEM_BEGIN)
        .and_then(|rest| rest.trim_end().strip_suffix(PEM_END))
        .ok_or_else(|| CryptoError::InvalidKey("not a PEM public key".to_string()))?;

    let b64: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    let der = STANDARD
        .decode(b64)
        .map_err(|e| CryptoError::InvalidKey(format!("PEM body: {e}")))?;

    let key = der
        .strip_prefix(&X25519_SPKI_PREFIX[..])
        .ok_or_else(|| CryptoError::InvalidKey("PEM key is not X25519".to_string()))?;

    key.try_into()
        .map_err(|_| CryptoError::InvalidKey("PEM key has wrong length".to_string()))
}

/// Encode an X25519 public key as PEM.
pub fn x25519_to_pem(x: &[u8; 32]) -> String {
    let mut der = Vec::with_capacity(X25519_SPKI_PREFIX.len() + x.len());
    der.extend_from_slice(&X25519_SPKI_PREFIX);
    der.extend_from_slice(x);
    format!("{PEM_BEGIN}\n{}\n{PEM_END}\n", STANDARD.encode(der))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oct_roundtrip() {
        let jwk = Jwk::oct(&[7u8; 32]);
        let json = jwk.to_json().unwrap();
        let parsed = Jwk::from_json(json.as_bytes()).unwrap();
        assert_eq!(*parsed.oct_secret().unwrap(), [7u8; 32]);
        assert_eq!(parsed.kid.as_deref(), Some(oct_thumbprint(&[7u8; 32]).as_str()));
    }

    #[test]
    fn test_oct_wrong_length_rejected() {
        let jwk = Jwk::oct(&[7u8; 16]);
        assert!(matches!(jwk.oct_secret(), Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_kty_checked() {
        let jwk = Jwk::x25519_public(&[9u8; 32]);
        assert!(jwk.oct_secret().is_err());
        assert_eq!(jwk.x25519_x().unwrap(), [9u8; 32]);
        assert!(jwk.x25519_d().is_err());
    }

    #[test]
    fn test_thumbprints_differ_by_key() {
        assert_ne!(oct_thumbprint(&[1u8; 32]), oct_thumbprint(&[2u8; 32]));
        assert_ne!(x25519_thumbprint(&[1u8; 32]), x25519_thumbprint(&[2u8; 32]));
        // 32 bytes of SHA-256, base64url without padding
        assert_eq!(oct_thumbprint(&[1u8; 32]).len(), 43);
    }

    #[test]
    fn test_pem_roundtrip() {
        let x = [0x5au8; 32];
        let pem = x25519_to_pem(&x);
        assert!(pem.starts_with(PEM_BEGIN));
        assert_eq!(x25519_from_pem(&pem).unwrap(), x);
    }

    #[test]
    fn test_pem_rejects_other_algorithms() {
        // Ed25519 SPKI uses OID 1.3.101.112 (0x70) instead of 0x6e.
        let mut der = X25519_SPKI_PREFIX.to_vec();
        der[8] = 0x70;
        der.extend_from_slice(&[1u8; 32]);
        let pem = format!("{PEM_BEGIN}\n{}\n{PEM_END}", STANDARD.encode(der));
        assert!(x25519_from_pem(&pem).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let jwk = Jwk::x25519_private(&[1u8; 32], &[2u8; 32]);
        let debug = format!("{jwk:?}");
        assert!(!debug.contains(&URL_SAFE_NO_PAD.encode([2u8; 32])));
    }
}
