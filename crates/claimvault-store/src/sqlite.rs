//! SQLite implementation of the ObjectStore trait.
//!
//! The durable single-node backend. Uses rusqlite with bundled SQLite; every
//! call runs on the caller's thread under an internal mutex.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{content_digest, BatchDeleteResult, DeleteError, ObjectMeta, ObjectStore};

/// SQLite-based object store.
///
/// Thread-safe via internal Mutex.
pub struct SqliteObjectStore {
    conn: Mutex<Connection>,
}

impl SqliteObjectStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>, config: &StoreConfig) -> Result<Self> {
        Self::init(Connection::open(path)?, config)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, &StoreConfig::default())
    }

    fn init(mut conn: Connection, config: &StoreConfig) -> Result<Self> {
        conn.busy_timeout(config.busy_timeout())?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migration::migrate(&mut conn)?;
        debug!(busy_timeout_ms = config.busy_timeout_ms, "sqlite object store ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

fn require_bucket(conn: &Connection, bucket: &str) -> Result<()> {
    if bucket_exists(conn, bucket)? {
        Ok(())
    } else {
        Err(StoreError::NoSuchBucket(bucket.to_string()))
    }
}

fn bucket_exists(conn: &Connection, bucket: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM buckets WHERE name = ?1",
            params![bucket],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

impl ObjectStore for SqliteObjectStore {
    fn put(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let conn = self.lock()?;
        require_bucket(&conn, bucket)?;
        conn.execute(
            "INSERT INTO objects (bucket, key, body, size, digest, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (bucket, key) DO UPDATE SET
                body = excluded.body,
                size = excluded.size,
                digest = excluded.digest,
                modified_at = excluded.modified_at",
            params![
                bucket,
                key,
                &body[..],
                body.len() as i64,
                content_digest(&body),
                now_millis()
            ],
        )?;
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Option<Bytes>> {
        let conn = self.lock()?;
        require_bucket(&conn, bucket)?;
        let body: Option<Vec<u8>> = conn
            .query_row(
                "SELECT body FROM objects WHERE bucket = ?1 AND key = ?2",
                params![bucket, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body.map(Bytes::from))
    }

    fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<BatchDeleteResult> {
        let mut conn = self.lock()?;
        require_bucket(&conn, bucket)?;

        let tx = conn.transaction()?;
        let mut result = BatchDeleteResult::default();
        {
            let mut stmt = tx.prepare("DELETE FROM objects WHERE bucket = ?1 AND key = ?2")?;
            for key in keys {
                match stmt.execute(params![bucket, key]) {
                    Ok(_) => result.deleted.push(key.clone()),
                    Err(e) => result.errors.push(DeleteError {
                        key: key.clone(),
                        message: e.to_string(),
                    }),
                }
            }
        }
        tx.commit()?;
        Ok(result)
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let conn = self.lock()?;
        require_bucket(&conn, bucket)?;

        // substr() rather than LIKE so `%` and `_` in keys need no escaping.
        let mut stmt = conn.prepare(
            "SELECT key, size, digest, modified_at FROM objects
             WHERE bucket = ?1 AND substr(key, 1, length(?2)) = ?2
             ORDER BY key",
        )?;
        let rows = stmt.query_map(params![bucket, prefix], |row| {
            Ok(ObjectMeta {
                key: row.get(0)?,
                size: row.get::<_, i64>(1)? as u64,
                digest: row.get(2)?,
                modified_at: row.get(3)?,
            })
        })?;

        let mut objects = Vec::new();
        for row in rows {
            objects.push(row?);
        }
        Ok(objects)
    }

    fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let conn = self.lock()?;
        bucket_exists(&conn, bucket)
    }

    fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.lock()?.execute(
            "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
            params![bucket, now_millis()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteObjectStore {
        let store = SqliteObjectStore::open_memory().unwrap();
        store.create_bucket("working").unwrap();
        store
    }

    #[test]
    fn test_put_get_overwrite() {
        let store = store();
        assert_eq!(store.get("working", "KS/a.json").unwrap(), None);

        store.put("working", "KS/a.json", Bytes::from_static(b"one")).unwrap();
        store.put("working", "KS/a.json", Bytes::from_static(b"two!")).unwrap();

        assert_eq!(
            store.get("working", "KS/a.json").unwrap(),
            Some(Bytes::from_static(b"two!"))
        );
        let listed = store.list("working", "KS/").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].size, 4);
        assert_eq!(listed[0].digest, content_digest(b"two!"));
    }

    #[test]
    fn test_missing_bucket() {
        let store = store();
        assert!(matches!(
            store.put("archive", "k", Bytes::new()),
            Err(StoreError::NoSuchBucket(_))
        ));
        assert!(matches!(
            store.get("archive", "k"),
            Err(StoreError::NoSuchBucket(_))
        ));

        store.create_bucket("archive").unwrap();
        store.create_bucket("archive").unwrap();
        assert!(store.bucket_exists("archive").unwrap());
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
    fn test_list_prefix_with_wildcards() {
        let store = store();
        for key in ["K_/a.json", "KS/b.json", "K%/c.json"] {
            store.put("working", key, Bytes::from_static(b"{}")).unwrap();
        }

        let keys: Vec<String> = store
            .list("working", "K_/")
            .unwrap()
            .into_iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, vec!["K_/a.json"]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.db");
        let config = StoreConfig::default();

        {
            let store = SqliteObjectStore::open(&path, &config).unwrap();
            store.create_bucket("working").unwrap();
            store.put("working", "KS/x.json", Bytes::from_static(b"kept")).unwrap();
        }

        let store = SqliteObjectStore::open(&path, &config).unwrap();
        assert_eq!(
            store.get("working", "KS/x.json").unwrap(),
            Some(Bytes::from_static(b"kept"))
        );
    }
}
