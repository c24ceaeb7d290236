//! # Claim Vault Core
//!
//! Pure types for the claim artifact layer: identifiers, the path & naming
//! policy, and the capability traits the host's entities implement.
//!
//! This crate contains no I/O and no cryptography.
//!
//! ## Key Types
//!
//! - [`EntityId`] / [`PartnerCode`] - validated path segments
//! - [`ArtifactPath`] - deterministic `{partner}/{id}[.partial].json` location
//! - [`StoredEntity`] - what the storage layer needs from a claim or file
//! - [`ClaimEntity`] - a stored entity with a submission status

pub mod entity;
pub mod error;
pub mod naming;
pub mod types;

pub use entity::{ArtifactClass, ClaimEntity, ClaimStatus, HookResult, StoredEntity};
pub use error::{CoreError, HookError, Result};
pub use naming::{ArtifactPath, Lifecycle};
pub use types::{BucketKind, EntityId, PartnerCode};
