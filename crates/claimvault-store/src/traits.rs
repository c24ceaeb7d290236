//! ObjectStore trait: the abstract interface for artifact persistence.
//!
//! Modeled on a bucketed object store: opaque keys, whole-object writes,
//! batch deletes with per-key outcomes, prefix listing.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;

/// Metadata for a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// The object key within its bucket.
    pub key: String,
    /// Body length in bytes.
    pub size: u64,
    /// Blake3 hash of the body, lowercase hex.
    pub digest: String,
    /// Last write time (Unix ms).
    pub modified_at: i64,
}

impl ObjectMeta {
    /// Describe `body` stored under `key`.
    pub fn describe(key: impl Into<String>, body: &[u8], modified_at: i64) -> Self {
        Self {
            key: key.into(),
            size: body.len() as u64,
            digest: content_digest(body),
            modified_at,
        }
    }
}

/// Blake3 digest of an object body as lowercase hex.
pub fn content_digest(body: &[u8]) -> String {
    hex::encode(blake3::hash(body).as_bytes())
}

/// A key the backend failed to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteError {
    pub key: String,
    pub message: String,
}

/// Per-key outcome of a batch delete.
///
/// A key that did not exist counts as deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDeleteResult {
    pub deleted: Vec<String>,
    pub errors: Vec<DeleteError>,
}

/// The ObjectStore trait: blocking interface for bucketed object storage.
///
/// # Design Notes
///
/// - **Not found is not an error**: `get` returns `Ok(None)` for a missing key.
/// - **Last write wins**: `put` overwrites without any version check.
/// - **Idempotent deletes**: deleting an absent key is reported as deleted.
/// - **Buckets are explicit**: writing to a bucket that was never created
///   fails with [`StoreError::NoSuchBucket`](crate::StoreError::NoSuchBucket).
pub trait ObjectStore: Send + Sync {
    /// Write `body` at `key`, replacing any existing object.
    fn put(&self, bucket: &str, key: &str, body: Bytes) -> Result<()>;

    /// Read the object at `key`.
    fn get(&self, bucket: &str, key: &str) -> Result<Option<Bytes>>;

    /// Delete many keys, reporting each key's outcome.
    fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<BatchDeleteResult>;

    /// List objects whose key starts with `prefix`, ordered by key.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>>;

    /// Check whether a bucket exists.
    fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Create a bucket. Creating an existing bucket is a no-op.
    fn create_bucket(&self, bucket: &str) -> Result<()>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    fn put(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        (**self).put(bucket, key, body)
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Option<Bytes>> {
        (**self).get(bucket, key)
    }

    fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<BatchDeleteResult> {
        (**self).delete_batch(bucket, keys)
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>> {
        (**self).list(bucket, prefix)
    }

    fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        (**self).bucket_exists(bucket)
    }

    fn create_bucket(&self, bucket: &str) -> Result<()> {
        (**self).create_bucket(bucket)
    }
}
