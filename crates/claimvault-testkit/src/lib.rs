//! # Claim Vault Testkit
//!
//! Testing utilities for Claim Vault.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Known-answer vectors**: RFC vectors for key wrap and Concat KDF, and
//!   fixed-key thumbprints, so every implementation agrees on ciphertext
//!   framing and `kid`s
//! - **Generators**: Proptest strategies for ids, keys and claim payloads
//! - **Fixtures**: Host entities with recorded hooks, and a store that fails
//!   on demand
//!
//! ## Known-Answer Vectors
//!
//! ```rust
//! use claimvault_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, computed) in verify_all_vectors() {
//!     assert!(matches, "{name}: {computed}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use claimvault_testkit::generators::{claim, symmetric_key};
//!
//! proptest! {
//!     #[test]
//!     fn sealed_claims_open((id, payload) in claim(), key in symmetric_key()) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use claimvault_testkit::fixtures::{TestClaim, TestFixture, PARTNER};
//!
//! let fixture = TestFixture::new();
//! let claim = TestClaim::new(PARTNER, "123-abc");
//! assert!(fixture.vault.save_partial(&claim, &claim.payload()).unwrap());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{
    claim_payload, FaultyStore, RecordingObserver, TestClaim, TestClaimant, TestFile,
    TestFixture, PARTNER, SECRET_MARKER,
};
pub use vectors::verify_all_vectors;
