//! Path & naming policy.
//!
//! Paths are derived from (partner, entity, lifecycle) alone, so independent
//! services agree on where an artifact lives without a shared index:
//!
//! ```text
//! {partner_code}/{entity_id}.partial.json   in-progress, working bucket
//! {partner_code}/{entity_id}.json           completed or claimant file
//! ```
//!
//! The archive bucket always uses the final form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{EntityId, PartnerCode};

const PARTIAL_SUFFIX: &str = ".partial.json";
const FINAL_SUFFIX: &str = ".json";

/// Which version of an entity's artifact a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// In-progress artifact, symmetrically encrypted, readable by the server.
    Partial,
    /// Completed claim or claimant file.
    Final,
}

impl Lifecycle {
    /// File suffix for this lifecycle state.
    pub const fn suffix(&self) -> &'static str {
        match self {
            Lifecycle::Partial => PARTIAL_SUFFIX,
            Lifecycle::Final => FINAL_SUFFIX,
        }
    }
}

/// A deterministic location for an entity's artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactPath {
    partner: PartnerCode,
    entity_id: EntityId,
    lifecycle: Lifecycle,
}

impl ArtifactPath {
    /// Build a path for the given partner, entity and lifecycle state.
    pub fn new(partner: PartnerCode, entity_id: EntityId, lifecycle: Lifecycle) -> Self {
        Self {
            partner,
            entity_id,
            lifecycle,
        }
    }

    /// Path of an in-progress artifact.
    pub fn partial(partner: PartnerCode, entity_id: EntityId) -> Self {
        Self::new(partner, entity_id, Lifecycle::Partial)
    }

    /// Path of a completed artifact (also used for claimant files and the archive).
    pub fn completed(partner: PartnerCode, entity_id: EntityId) -> Self {
        Self::new(partner, entity_id, Lifecycle::Final)
    }

    /// Recover partner, entity and lifecycle from an object key.
    ///
    /// Inverse of [`ArtifactPath::to_string`].
    pub fn parse(key: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidPath(key.to_string());

        let (partner, file) = key.split_once('/').ok_or_else(invalid)?;

        // Check the longer suffix first: every partial name also ends in ".json".
        let (stem, lifecycle) = if let Some(stem) = file.strip_suffix(PARTIAL_SUFFIX) {
            (stem, Lifecycle::Partial)
        } else if let Some(stem) = file.strip_suffix(FINAL_SUFFIX) {
            (stem, Lifecycle::Final)
        } else {
            return Err(invalid());
        };

        let partner = PartnerCode::new(partner).map_err(|_| invalid())?;
        let entity_id = EntityId::new(stem).map_err(|_| invalid())?;

        Ok(Self::new(partner, entity_id, lifecycle))
    }

    /// The partner this artifact belongs to.
    pub fn partner(&self) -> &PartnerCode {
        &self.partner
    }

    /// The entity this artifact represents.
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// The lifecycle state encoded in the path.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Prefix shared by every artifact of a partner, for listing.
    pub fn partner_prefix(partner: &PartnerCode) -> String {
        format!("{}/", partner)
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}{}",
            self.partner,
            self.entity_id,
            self.lifecycle.suffix()
        )
    }
}

impl FromStr for ArtifactPath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
