//! In-memory implementation of the ObjectStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::migration::now_millis;
use crate::traits::{BatchDeleteResult, ObjectMeta, ObjectStore};

/// In-memory object store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryObjectStore {
    buckets: RwLock<HashMap<String, Bucket>>,
}

/// Objects in one bucket, ordered by key for listing.
type Bucket = BTreeMap<String, StoredObject>;

struct StoredObject {
    body: Bytes,
    modified_at: i64,
}

impl MemoryObjectStore {
    /// Create a new store with no buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with the given buckets already present.
    pub fn with_buckets<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let buckets = names
            .into_iter()
            .map(|name| (name.into(), Bucket::new()))
            .collect();
        Self {
            buckets: RwLock::new(buckets),
        }
    }

    /// Number of objects in a bucket (0 if the bucket does not exist).
    pub fn object_count(&self, bucket: &str) -> usize {
        self.read()
            .map(|buckets| buckets.get(bucket).map_or(0, Bucket::len))
            .unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Bucket>>> {
        self.buckets
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Bucket>>> {
        self.buckets
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let mut buckets = self.write()?;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                body,
                modified_at: now_millis(),
            },
        );
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Option<Bytes>> {
        let buckets = self.read()?;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        Ok(objects.get(key).map(|o| o.body.clone()))
    }

    fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<BatchDeleteResult> {
        let mut buckets = self.write()?;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;

        let mut result = BatchDeleteResult::default();
        for key in keys {
            objects.remove(key);
            result.deleted.push(key.clone());
        }
        Ok(result)
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let buckets = self.read()?;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;

        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, o)| ObjectMeta::describe(key.as_str(), &o.body, o.modified_at))
            .collect())
    }

    fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(bucket))
    }

    fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.write()?.entry(bucket.to_string()).or_default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryObjectStore {
        MemoryObjectStore::with_buckets(["working"])
    }

    #[test]
    fn test_put_get_overwrite() {
        let store = store();
        assert_eq!(store.get("working", "KS/a.json").unwrap(), None);

        store.put("working", "KS/a.json", Bytes::from_static(b"one")).unwrap();
        store.put("working", "KS/a.json", Bytes::from_static(b"two")).unwrap();

        assert_eq!(
            store.get("working", "KS/a.json").unwrap(),
            Some(Bytes::from_static(b"two"))
        );
        assert_eq!(store.object_count("working"), 1);
    }

    #[test]
    fn test_missing_bucket() {
        let store = store();
        assert!(matches!(
            store.put("nope", "k", Bytes::new()),
            Err(StoreError::NoSuchBucket(_))
        ));
        assert!(!store.bucket_exists("nope").unwrap());

        store.create_bucket("nope").unwrap();
        store.create_bucket("nope").unwrap();
        assert!(store.bucket_exists("nope").unwrap());
        store.put("nope", "k", Bytes::new()).unwrap();
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            store().put("working", "", Bytes::new()),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = store();
        store.put("working", "a", Bytes::from_static(b"x")).unwrap();

        let keys = vec!["a".to_string(), "b".to_string()];
        let result = store.delete_batch("working", &keys).unwrap();
        assert_eq!(result.deleted, keys);
        assert!(result.errors.is_empty());
        assert_eq!(store.get("working", "a").unwrap(), None);
    }

    #[test]
    fn test_list_prefix() {
        let store = store();
        for key in ["KS/b.json", "KS/a.partial.json", "KT/a.json", "KSX/c.json"] {
            store.put("working", key, Bytes::from(key.as_bytes().to_vec())).unwrap();
        }

        let keys: Vec<String> = store
            .list("working", "KS/")
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, vec!["KS/a.partial.json", "KS/b.json"]);

        assert_eq!(store.list("working", "").unwrap().len(), 4);
    }
}
