//! Strong type definitions for Claim Vault.
//!
//! Identifiers are newtypes so a partner code can never be passed where an
//! entity id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Reject segments that would break path derivation.
fn is_valid_segment(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && !s.contains('/')
        && !s.contains('\\')
        && !s.chars().any(char::is_whitespace)
}

/// Identifier of a claim or claimant file.
///
/// Opaque to this crate (UUIDs in practice). Stored in cleartext next to the
/// ciphertext so artifacts can be located without decrypting them.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Create an entity id, validating that it is usable as a path segment.
    ///
    /// Ids ending in `.partial` are rejected: their final path would read
    /// back as the partial artifact of a different id.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if is_valid_segment(&id) && !id.ends_with(".partial") {
            Ok(Self(id))
        } else {
            Err(CoreError::InvalidEntityId(id))
        }
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Short code of the partner (state agency) an artifact belongs to.
///
/// Two uppercase letters in practice, but treated as an opaque segment.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartnerCode(String);

impl PartnerCode {
    /// Create a partner code, validating that it is usable as a path segment.
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        if is_valid_segment(&code) {
            Ok(Self(code))
        } else {
            Err(CoreError::InvalidPartnerCode(code))
        }
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PartnerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartnerCode({})", self.0)
    }
}

impl fmt::Display for PartnerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PartnerCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for PartnerCode {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<PartnerCode> for String {
    fn from(code: PartnerCode) -> Self {
        code.0
    }
}

/// The two logical buckets an artifact can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKind {
    /// Encrypted operational copies.
    Working,
    /// Plaintext audit copies of completed claims. Write-mostly.
    Archive,
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKind::Working => f.write_str("working"),
            BucketKind::Archive => f.write_str("archive"),
        }
    }
}
