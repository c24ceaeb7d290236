//! # Claim Vault Store
//!
//! Object storage abstraction for Claim Vault. Provides a trait-based
//! interface for artifact persistence with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`ObjectStore`] - The blocking trait for all storage operations
//! - [`SqliteObjectStore`] - SQLite-based persistent storage
//! - [`MemoryObjectStore`] - In-memory storage for tests
//! - [`BatchDeleteResult`] - Per-key outcome of a bulk delete
//! - [`ObjectMeta`] - Key, size and Blake3 digest of a stored object
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use claimvault_store::{ObjectStore, SqliteObjectStore, StoreConfig};
//!
//! let store = SqliteObjectStore::open("claims.db", &StoreConfig::default())?;
//! store.create_bucket("claims-working")?;
//! store.put("claims-working", "KS/123-abc.partial.json", Bytes::from_static(b"{}"))?;
//! # Ok::<(), claimvault_store::StoreError>(())
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use memory::MemoryObjectStore;
pub use sqlite::SqliteObjectStore;
pub use traits::{content_digest, BatchDeleteResult, DeleteError, ObjectMeta, ObjectStore};
