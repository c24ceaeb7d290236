//! Known-answer vectors for the cryptographic building blocks.
//!
//! Key wrap and Concat KDF vectors are taken from their RFCs; thumbprints
//! are computed for fixed keys so every implementation agrees on the `kid`
//! an artifact is stored under.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use claimvault_crypto::jwe::{concat_kdf, wrap_key};
use claimvault_crypto::{PartnerSecretKey, SymmetricKey};

/// AES-256 key wrap of a 256-bit key (RFC 3394 section 4.6).
#[derive(Debug, Clone)]
pub struct KeyWrapVector {
    pub name: &'static str,
    pub kek: &'static str,
    pub key_data: &'static str,
    pub expected_ciphertext: &'static str,
}

/// Concat KDF derivation (RFC 7518 appendix C).
#[derive(Debug, Clone)]
pub struct ConcatKdfVector {
    pub name: &'static str,
    pub z: [u8; 32],
    pub alg: &'static str,
    pub apu: &'static [u8],
    pub apv: &'static [u8],
    pub bits: usize,
    /// base64url, no padding.
    pub expected: &'static str,
}

/// Which kind of key a thumbprint vector describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbprintKind {
    Oct,
    X25519,
}

/// RFC 7638 thumbprint of a fixed key.
#[derive(Debug, Clone)]
pub struct ThumbprintVector {
    pub name: &'static str,
    pub kind: ThumbprintKind,
    /// Secret bytes (hex). For X25519 the thumbprint is of the public key.
    pub secret: &'static str,
    pub expected_kid: &'static str,
}

pub fn key_wrap_vectors() -> Vec<KeyWrapVector> {
    vec![KeyWrapVector {
        name: "RFC 3394 4.6: 256 bits of key data with a 256-bit KEK",
        kek: "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
        key_data: "00112233445566778899aabbccddeeff000102030405060708090a0b0c0d0e0f",
        expected_ciphertext: "28c9f404c4b810f4cbccb35cfb87f8263f5786e2d80ed326\
                              cbc7f0e71a99f43bfb988b9b7a02dd21",
    }]
}

pub fn concat_kdf_vectors() -> Vec<ConcatKdfVector> {
    vec![ConcatKdfVector {
        name: "RFC 7518 appendix C: ECDH-ES with A128GCM",
        z: [
            158, 86, 217, 29, 129, 113, 53, 211, 114, 131, 66, 131, 191, 132, 38, 156, 251, 49,
            110, 163, 218, 128, 106, 72, 246, 218, 167, 121, 140, 254, 144, 196,
        ],
        alg: "A128GCM",
        apu: b"Alice",
        apv: b"Bob",
        bits: 128,
        expected: "VqqN6vgjbSBcIijNcacQGg",
    }]
}

pub fn thumbprint_vectors() -> Vec<ThumbprintVector> {
    vec![
        ThumbprintVector {
            name: "oct key 00..1f",
            kind: ThumbprintKind::Oct,
            secret: "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
            expected_kid: "WqjPPRvAP8oYbAqCwMErhzTg-Quaz-vLx_cef07yhOs",
        },
        ThumbprintVector {
            name: "oct key of 0x42",
            kind: ThumbprintKind::Oct,
            secret: "4242424242424242424242424242424242424242424242424242424242424242",
            expected_kid: "Gfw6p8MgF7HNm9fCh8Jn0sG9JFY2YTyX_W4T2I2O7C8",
        },
        ThumbprintVector {
            name: "X25519 key of 0x42",
            kind: ThumbprintKind::X25519,
            secret: "4242424242424242424242424242424242424242424242424242424242424242",
            expected_kid: "avdnssDO3IEV6vfpeXvnyJC_bKCX89yZ9ua86hQBYEQ",
        },
        ThumbprintVector {
            name: "X25519 key of 0x07",
            kind: ThumbprintKind::X25519,
            secret: "0707070707070707070707070707070707070707070707070707070707070707",
            expected_kid: "l_jrHIWxAD4WTzNZp34IxdWLIGPjrESYyzUJtgEMeH0",
        },
    ]
}

fn hex32(s: &str) -> [u8; 32] {
    let bytes = hex::decode(s).unwrap_or_default();
    let mut out = [0u8; 32];
    if bytes.len() == 32 {
        out.copy_from_slice(&bytes);
    }
    out
}

/// Compute the output of a key wrap vector, as hex.
pub fn compute_key_wrap(v: &KeyWrapVector) -> String {
    match wrap_key(&hex32(v.kek), &hex32(v.key_data)) {
        Ok(wrapped) => hex::encode(wrapped),
        Err(e) => format!("error: {e}"),
    }
}

/// Compute the output of a Concat KDF vector, as base64url.
pub fn compute_concat_kdf(v: &ConcatKdfVector) -> String {
    let mut out = vec![0u8; v.bits / 8];
    match concat_kdf(&v.z, v.alg, v.apu, v.apv, &mut out) {
        Ok(()) => URL_SAFE_NO_PAD.encode(out),
        Err(e) => format!("error: {e}"),
    }
}

/// Compute the `kid` of a thumbprint vector's key.
pub fn compute_thumbprint(v: &ThumbprintVector) -> String {
    let secret = hex32(v.secret);
    match v.kind {
        ThumbprintKind::Oct => SymmetricKey::from_bytes(secret).kid().to_string(),
        ThumbprintKind::X25519 => PartnerSecretKey::from_bytes(secret).public_key().kid(),
    }
}

/// Check every vector. Returns `(name, matches, computed)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let wraps = key_wrap_vectors().into_iter().map(|v| {
        let got = compute_key_wrap(&v);
        (v.name.to_string(), got == v.expected_ciphertext, got)
    });
    let kdfs = concat_kdf_vectors().into_iter().map(|v| {
        let got = compute_concat_kdf(&v);
        (v.name.to_string(), got == v.expected, got)
    });
    let kids = thumbprint_vectors().into_iter().map(|v| {
        let got = compute_thumbprint(&v);
        (v.name.to_string(), got == v.expected_kid, got)
    });
    wraps.chain(kdfs).chain(kids).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimvault_crypto::jwe::unwrap_key;

    #[test]
    fn test_all_vectors_match() {
        for (name, matches, got) in verify_all_vectors() {
            assert!(matches, "vector '{name}' computed {got}");
        }
    }

    #[test]
    fn test_key_wrap_vector_unwraps() {
        for v in key_wrap_vectors() {
            let wrapped = hex::decode(v.expected_ciphertext).unwrap();
            let unwrapped = unwrap_key(&hex32(v.kek), &wrapped).unwrap();
            assert_eq!(hex::encode(&unwrapped[..]), v.key_data);
        }
    }

    #[test]
    fn test_partner_key_from_rfc7748() {
        let secret =
            hex32("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a");
        let public = PartnerSecretKey::from_bytes(secret).public_key();
        assert_eq!(
            hex::encode(public.as_bytes()),
            "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a"
        );
    }
}
