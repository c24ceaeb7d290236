//! Capability traits for entities whose payloads are stored as artifacts.
//!
//! Claims and claimant files are owned by the host application. The storage
//! layer treats both through [`StoredEntity`]: where the artifact lives, and
//! which bookkeeping hooks run together with the write.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HookError;
use crate::naming::{ArtifactPath, Lifecycle};
use crate::types::{EntityId, PartnerCode};

/// Result type for collaborator hooks.
pub type HookResult = std::result::Result<(), HookError>;

/// An entity with a stored payload.
///
/// Hooks take `&self`: implementations that record state use interior
/// mutability or forward to their own persistence layer.
pub trait StoredEntity {
    /// The partner this entity's artifacts are filed under.
    fn partner(&self) -> &PartnerCode;

    /// The entity's identifier; must match the `id` inside its payload.
    fn entity_id(&self) -> &EntityId;

    /// Current lifecycle state of the entity's working artifact.
    fn lifecycle(&self) -> Lifecycle;

    /// Record that the payload was stored in the named bucket.
    fn record_stored_event(&self, bucket_name: &str) -> HookResult;

    /// Bump the entity's last-modified timestamp.
    fn touch_updated_at(&self) -> HookResult;

    /// Run bookkeeping and the artifact write atomically.
    ///
    /// `body` records the stored event, bumps the timestamp, then writes the
    /// artifact; it returns an error if any step fails. Hosts with a database
    /// wrap it in a transaction and roll back on error, so the bookkeeping
    /// and the stored bytes land together or not at all. The default runs
    /// `body` directly and cannot undo hooks that ran before a failed write.
    fn in_transaction(&self, body: &mut dyn FnMut() -> HookResult) -> HookResult {
        body()
    }

    /// Path of this entity's artifact in the given lifecycle state.
    fn artifact_path(&self, lifecycle: Lifecycle) -> ArtifactPath {
        ArtifactPath::new(self.partner().clone(), self.entity_id().clone(), lifecycle)
    }

    /// Path of this entity's current working artifact.
    fn payload_path(&self) -> ArtifactPath {
        self.artifact_path(self.lifecycle())
    }
}

/// Status of a claim, as far as its artifacts are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Still being filled in; stored symmetrically at the partial path.
    InProgress,
    /// Submitted; stored for the partner under its public key.
    Completed,
    /// Removed; its artifacts are gone.
    Deleted,
}

/// A claim: a stored entity with a submission status.
pub trait ClaimEntity: StoredEntity {
    fn status(&self) -> ClaimStatus;

    /// Whether the claim's working artifact is still symmetrically encrypted.
    fn is_partial(&self) -> bool {
        self.status() == ClaimStatus::InProgress
    }
}

/// Class of a stored artifact, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactClass {
    ClaimantFile,
    PartialClaim,
    CompletedClaim,
}

impl fmt::Display for ArtifactClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactClass::ClaimantFile => f.write_str("claimant file"),
            ArtifactClass::PartialClaim => f.write_str("partial claim"),
            ArtifactClass::CompletedClaim => f.write_str("completed claim"),
        }
    }
}
