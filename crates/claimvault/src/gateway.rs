//! Artifact Store Gateway.
//!
//! Wraps an [`ObjectStore`] backend with the vault's failure policy: backend
//! errors are logged and turned into `false`/`None` so callers decide
//! whether to retry. Nothing here raises except setup.

use bytes::Bytes;
use tracing::{debug, error, warn};

use claimvault_core::{BucketKind, HookError, Lifecycle, StoredEntity};
use claimvault_store::{DeleteError, ObjectMeta, ObjectStore};

use crate::config::BucketConfig;
use crate::error::Result;

/// Outcome of a bulk delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    /// Number of paths asked for.
    pub requested: usize,
    /// Paths the backend reports as gone.
    pub deleted: Vec<String>,
    /// Paths the backend failed to delete.
    pub errors: Vec<DeleteError>,
}

impl DeleteReport {
    /// Whether every requested path was deleted.
    pub fn is_complete(&self) -> bool {
        self.deleted.len() == self.requested
    }
}

/// Bucketed artifact storage with logged, non-raising failures.
pub struct ArtifactStore<B: ObjectStore> {
    backend: B,
    buckets: BucketConfig,
}

impl<B: ObjectStore> ArtifactStore<B> {
    pub fn new(backend: B, buckets: BucketConfig) -> Self {
        Self { backend, buckets }
    }

    /// Get the backend reference.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Backend name of a logical bucket.
    pub fn bucket_name(&self, bucket: BucketKind) -> &str {
        self.buckets.name(bucket)
    }

    /// Create any missing bucket. Intended for setup, not the request path.
    pub fn ensure_buckets(&self) -> Result<()> {
        for kind in [BucketKind::Working, BucketKind::Archive] {
            let name = self.bucket_name(kind);
            if !self.backend.bucket_exists(name)? {
                self.backend.create_bucket(name)?;
                debug!(bucket = name, "created bucket");
            }
        }
        Ok(())
    }

    /// Write `body` at `path`, replacing what is there.
    pub fn write(&self, bucket: BucketKind, path: &str, body: impl Into<Bytes>) -> bool {
        let name = self.bucket_name(bucket);
        match self.backend.put(name, path, body.into()) {
            Ok(()) => {
                debug!(bucket = name, path, "wrote artifact");
                true
            }
            Err(e) => {
                error!(bucket = name, path, error = %e, "failed to write artifact");
                false
            }
        }
    }

    /// Read the artifact at `path`.
    ///
    /// `None` both when nothing is stored and when the backend fails; only
    /// the latter is logged as an error.
    pub fn read(&self, bucket: BucketKind, path: &str) -> Option<Bytes> {
        let name = self.bucket_name(bucket);
        match self.backend.get(name, path) {
            Ok(Some(body)) => Some(body),
            Ok(None) => {
                debug!(bucket = name, path, "artifact not found");
                None
            }
            Err(e) => {
                error!(bucket = name, path, error = %e, "failed to read artifact");
                None
            }
        }
    }

    /// Whether a non-empty artifact can be read at `path`.
    pub fn exists(&self, bucket: BucketKind, path: &str) -> bool {
        self.read(bucket, path).is_some_and(|body| !body.is_empty())
    }

    /// Delete many paths at once.
    ///
    /// `None` if the backend call failed outright. A report that is not
    /// [complete](DeleteReport::is_complete) means some paths survived.
    pub fn delete(&self, bucket: BucketKind, paths: &[String]) -> Option<DeleteReport> {
        let name = self.bucket_name(bucket);
        if paths.is_empty() {
            return Some(DeleteReport {
                requested: 0,
                deleted: Vec::new(),
                errors: Vec::new(),
            });
        }

        match self.backend.delete_batch(name, paths) {
            Ok(result) => {
                let report = DeleteReport {
                    requested: paths.len(),
                    deleted: result.deleted,
                    errors: result.errors,
                };
                if !report.is_complete() {
                    let failed: Vec<&str> = report.errors.iter().map(|e| e.key.as_str()).collect();
                    warn!(
                        bucket = name,
                        requested = report.requested,
                        deleted = report.deleted.len(),
                        ?failed,
                        "partial delete"
                    );
                }
                Some(report)
            }
            Err(e) => {
                error!(bucket = name, count = paths.len(), error = %e, "failed to delete artifacts");
                None
            }
        }
    }

    /// Delete many paths; `true` only if all of them are gone.
    pub fn delete_all(&self, bucket: BucketKind, paths: &[String]) -> bool {
        self.delete(bucket, paths)
            .is_some_and(|report| report.is_complete())
    }

    /// List artifacts under `prefix`.
    pub fn list(&self, bucket: BucketKind, prefix: &str) -> Option<Vec<ObjectMeta>> {
        let name = self.bucket_name(bucket);
        match self.backend.list(name, prefix) {
            Ok(objects) => Some(objects),
            Err(e) => {
                error!(bucket = name, prefix, error = %e, "failed to list artifacts");
                None
            }
        }
    }

    /// Store an entity's payload and record the write on the entity.
    ///
    /// Working-bucket artifacts go to the entity's current payload path;
    /// archive copies always use the completed path. The stored event, the
    /// `updated_at` bump and the write all run inside the entity's
    /// transaction, write last. A hook failure skips the write; a write
    /// failure fails the transaction so the host rolls the hooks back.
    pub fn store_entity<E>(&self, entity: &E, bucket: BucketKind, body: impl Into<Bytes>) -> bool
    where
        E: StoredEntity + ?Sized,
    {
        let path = match bucket {
            BucketKind::Working => entity.payload_path(),
            BucketKind::Archive => entity.artifact_path(Lifecycle::Final),
        }
        .to_string();
        let body: Bytes = body.into();

        let bucket_name = self.bucket_name(bucket);
        let stored = entity.in_transaction(&mut || {
            entity.record_stored_event(bucket_name)?;
            entity.touch_updated_at()?;
            if !self.write(bucket, &path, body.clone()) {
                let message = format!("could not write {bucket_name}/{path}");
                return Err(HookError::new("write", message));
            }
            Ok(())
        });

        match stored {
            Ok(()) => true,
            Err(e) => {
                error!(bucket = bucket_name, path = %path, error = %e, "failed to store artifact");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimvault_store::MemoryObjectStore;

    fn gateway() -> ArtifactStore<MemoryObjectStore> {
        let store = ArtifactStore::new(MemoryObjectStore::new(), BucketConfig::default());
        store.ensure_buckets().unwrap();
        store
    }

    #[test]
    fn test_ensure_buckets_is_idempotent() {
        let store = gateway();
        store.ensure_buckets().unwrap();
        assert!(store.backend().bucket_exists("claims-working").unwrap());
        assert!(store.backend().bucket_exists("claims-archive").unwrap());
    }

    #[test]
    fn test_write_read_exists() {
        let store = gateway();
        assert!(!store.exists(BucketKind::Working, "KS/a.json"));
        assert_eq!(store.read(BucketKind::Working, "KS/a.json"), None);

        assert!(store.write(BucketKind::Working, "KS/a.json", b"{}".to_vec()));
        assert!(store.exists(BucketKind::Working, "KS/a.json"));
        assert!(!store.exists(BucketKind::Archive, "KS/a.json"));
    }

    #[test]
    fn test_empty_body_does_not_exist() {
        let store = gateway();
        assert!(store.write(BucketKind::Working, "KS/empty.json", Bytes::new()));
        assert!(!store.exists(BucketKind::Working, "KS/empty.json"));
    }

    #[test]
    fn test_backend_failure_is_not_raised() {
        let store = ArtifactStore::new(MemoryObjectStore::new(), BucketConfig::default());
        assert!(!store.write(BucketKind::Working, "KS/a.json", b"x".to_vec()));
        assert_eq!(store.read(BucketKind::Working, "KS/a.json"), None);
        assert_eq!(store.list(BucketKind::Working, ""), None);
        assert_eq!(store.delete(BucketKind::Working, &["KS/a.json".to_string()]), None);
    }

    #[test]
    fn test_delete_all() {
        let store = gateway();
        store.write(BucketKind::Working, "KS/a.json", b"x".to_vec());
        let paths = vec!["KS/a.json".to_string(), "KS/missing.json".to_string()];

        let report = store.delete(BucketKind::Working, &paths).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.requested, 2);
        assert!(store.delete_all(BucketKind::Working, &paths));
        assert!(store.delete_all(BucketKind::Working, &[]));
    }

    #[test]
    fn test_list_prefix() {
        let store = gateway();
        store.write(BucketKind::Working, "KS/a.json", b"x".to_vec());
        store.write(BucketKind::Working, "KT/b.json", b"y".to_vec());

        let listed = store.list(BucketKind::Working, "KS/").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "KS/a.json");
    }
}
