//! Test fixtures and helpers.
//!
//! Host-side entities with recorded hooks, a claimant that owns them, and a
//! backend that fails on demand.

use std::cell::{Cell, RefCell};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use rand::RngCore;
use serde_json::{json, Value};

use claimvault::{ClaimVault, Principal, RotationObserver, VaultConfig};
use claimvault_core::{
    ArtifactPath, ClaimEntity, ClaimStatus, EntityId, HookError, HookResult, Lifecycle,
    PartnerCode, StoredEntity,
};
use claimvault_crypto::{ClaimPayload, Envelope, KeyRing, PartnerSecretKey, SymmetricKey};
use claimvault_store::{
    BatchDeleteResult, DeleteError, MemoryObjectStore, ObjectMeta, ObjectStore, Result,
    StoreError,
};

/// Partner code used throughout the tests.
pub const PARTNER: &str = "KS";

/// A value that must never appear in stored ciphertext.
pub const SECRET_MARKER: &str = "secret";

/// Build a partner code, panicking on invalid input.
pub fn partner(code: &str) -> PartnerCode {
    PartnerCode::new(code).unwrap()
}

/// Build an entity id, panicking on invalid input.
pub fn entity_id(id: &str) -> EntityId {
    EntityId::new(id).unwrap()
}

/// A fresh random entity id, formatted like a UUID.
pub fn random_entity_id() -> EntityId {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    let hex = hex::encode(bytes);
    entity_id(&format!(
        "{}-{}-{}-{}-{}",
        &hex[..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..]
    ))
}

/// A claim payload for `id` carrying personal data.
pub fn claim_payload(id: &str) -> ClaimPayload {
    payload_from(json!({
        "id": id,
        "claimant": {
            "first_name": "Jane",
            "last_name": "Doe",
            "ssn": format!("{SECRET_MARKER}-900-00-0000"),
        },
        "weekly_earnings": 412.5,
        "is_student": false,
    }))
}

/// Turn a JSON object literal into a payload.
pub fn payload_from(value: Value) -> ClaimPayload {
    match value {
        Value::Object(map) => map,
        other => panic!("payload must be a JSON object, got {other}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entities
// ─────────────────────────────────────────────────────────────────────────────

/// Bookkeeping calls recorded by a test entity.
#[derive(Debug, Default)]
pub struct HookLog {
    /// Bucket names passed to `record_stored_event`, in order.
    pub stored_events: RefCell<Vec<String>>,
    /// Number of `touch_updated_at` calls.
    pub touches: Cell<usize>,
    /// Number of transactions opened.
    pub transactions: Cell<usize>,
    /// Number of transactions rolled back.
    pub rollbacks: Cell<usize>,
    /// Name of a hook that should fail.
    pub fail_hook: Cell<Option<&'static str>>,
}

impl HookLog {
    fn check(&self, hook: &'static str) -> HookResult {
        if self.fail_hook.get() == Some(hook) {
            Err(HookError::new(hook, "injected failure"))
        } else {
            Ok(())
        }
    }

    fn record_stored_event(&self, bucket_name: &str) -> HookResult {
        self.check("record_stored_event")?;
        self.stored_events.borrow_mut().push(bucket_name.to_string());
        Ok(())
    }

    fn touch_updated_at(&self) -> HookResult {
        self.check("touch_updated_at")?;
        self.touches.set(self.touches.get() + 1);
        Ok(())
    }

    /// Runs `body` and restores the log if it fails, like a database
    /// transaction would.
    fn in_transaction(&self, body: &mut dyn FnMut() -> HookResult) -> HookResult {
        self.transactions.set(self.transactions.get() + 1);
        let events = self.stored_events.borrow().len();
        let touches = self.touches.get();

        let result = body();
        if result.is_err() {
            self.stored_events.borrow_mut().truncate(events);
            self.touches.set(touches);
            self.rollbacks.set(self.rollbacks.get() + 1);
        }
        result
    }

    /// Bucket names recorded so far.
    pub fn stored_in(&self) -> Vec<String> {
        self.stored_events.borrow().clone()
    }
}

/// A claimant-uploaded file.
#[derive(Debug)]
pub struct TestFile {
    pub partner: PartnerCode,
    pub id: EntityId,
    pub hooks: HookLog,
}

impl TestFile {
    pub fn new(partner_code: &str, id: &str) -> Self {
        Self {
            partner: partner(partner_code),
            id: entity_id(id),
            hooks: HookLog::default(),
        }
    }

    /// The file's payload.
    pub fn payload(&self) -> ClaimPayload {
        payload_from(json!({
            "id": self.id.as_str(),
            "filename": "paystub.pdf",
            "content_type": "application/pdf",
            "note": format!("{SECRET_MARKER} pay details"),
        }))
    }
}

impl StoredEntity for TestFile {
    fn partner(&self) -> &PartnerCode {
        &self.partner
    }

    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::Final
    }

    fn record_stored_event(&self, bucket_name: &str) -> HookResult {
        self.hooks.record_stored_event(bucket_name)
    }

    fn touch_updated_at(&self) -> HookResult {
        self.hooks.touch_updated_at()
    }

    fn in_transaction(&self, body: &mut dyn FnMut() -> HookResult) -> HookResult {
        self.hooks.in_transaction(body)
    }
}

/// A claim whose status can be moved along.
#[derive(Debug)]
pub struct TestClaim {
    pub partner: PartnerCode,
    pub id: EntityId,
    pub status: Cell<ClaimStatus>,
    pub hooks: HookLog,
}

impl TestClaim {
    /// An in-progress claim.
    pub fn new(partner_code: &str, id: &str) -> Self {
        Self {
            partner: partner(partner_code),
            id: entity_id(id),
            status: Cell::new(ClaimStatus::InProgress),
            hooks: HookLog::default(),
        }
    }

    /// An in-progress claim with a random id.
    pub fn random(partner_code: &str) -> Self {
        let id = random_entity_id();
        Self::new(partner_code, id.as_str())
    }

    /// Same claim, different status.
    pub fn with_status(self, status: ClaimStatus) -> Self {
        self.status.set(status);
        self
    }

    /// Mark the claim submitted.
    pub fn complete(&self) {
        self.status.set(ClaimStatus::Completed);
    }

    /// This claim's payload.
    pub fn payload(&self) -> ClaimPayload {
        claim_payload(self.id.as_str())
    }
}

impl StoredEntity for TestClaim {
    fn partner(&self) -> &PartnerCode {
        &self.partner
    }

    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    fn lifecycle(&self) -> Lifecycle {
        if self.is_partial() {
            Lifecycle::Partial
        } else {
            Lifecycle::Final
        }
    }

    fn record_stored_event(&self, bucket_name: &str) -> HookResult {
        self.hooks.record_stored_event(bucket_name)
    }

    fn touch_updated_at(&self) -> HookResult {
        self.hooks.touch_updated_at()
    }

    fn in_transaction(&self, body: &mut dyn FnMut() -> HookResult) -> HookResult {
        self.hooks.in_transaction(body)
    }
}

impl ClaimEntity for TestClaim {
    fn status(&self) -> ClaimStatus {
        self.status.get()
    }
}

/// A claimant with files and claims.
#[derive(Debug)]
pub struct TestClaimant {
    pub id: String,
    pub files: Vec<TestFile>,
    pub claims: Vec<TestClaim>,
}

impl TestClaimant {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            files: Vec::new(),
            claims: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: TestFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_claim(mut self, claim: TestClaim) -> Self {
        self.claims.push(claim);
        self
    }
}

impl Principal for TestClaimant {
    fn principal_id(&self) -> String {
        self.id.clone()
    }

    fn files(&self) -> Vec<&dyn StoredEntity> {
        self.files.iter().map(|f| f as &dyn StoredEntity).collect()
    }

    fn claims(&self) -> Vec<&dyn ClaimEntity> {
        self.claims.iter().map(|c| c as &dyn ClaimEntity).collect()
    }
}

/// Records every rotated artifact as `(path, old kid, new kid)`.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub rotated: RefCell<Vec<(String, String, String)>>,
}

impl RotationObserver for RecordingObserver {
    fn artifact_rotated(&self, path: &ArtifactPath, before: &Envelope, after: &Envelope) {
        self.rotated.borrow_mut().push((
            path.to_string(),
            before.kid().to_string(),
            after.kid().to_string(),
        ));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Vault
// ─────────────────────────────────────────────────────────────────────────────

/// A vault over a fault-injecting memory store, with its keys at hand.
pub struct TestFixture {
    pub backend: Arc<FaultyStore>,
    pub key: SymmetricKey,
    pub partner_key: PartnerSecretKey,
    pub vault: ClaimVault<Arc<FaultyStore>>,
}

impl TestFixture {
    /// Create a fixture with random keys and the default configuration.
    pub fn new() -> Self {
        Self::with_config(VaultConfig::default())
    }

    /// Create a fixture with random keys and the given configuration.
    pub fn with_config(config: VaultConfig) -> Self {
        let backend = Arc::new(FaultyStore::new());
        let key = SymmetricKey::generate();
        let keys = KeyRing::new(vec![key.clone()]).unwrap();
        let vault = ClaimVault::new(Arc::clone(&backend), keys, config);
        vault.ensure_buckets().unwrap();
        Self {
            backend,
            key,
            partner_key: PartnerSecretKey::generate(),
            vault,
        }
    }

    /// Raw bytes stored in the working bucket at `path`.
    pub fn working_bytes(&self, path: &str) -> Option<Vec<u8>> {
        let bucket = &self.vault.config().buckets.working;
        self.backend
            .inner()
            .get(bucket, path)
            .ok()
            .flatten()
            .map(|b| b.to_vec())
    }

    /// Raw bytes stored in the archive bucket at `path`.
    pub fn archive_bytes(&self, path: &str) -> Option<Vec<u8>> {
        let bucket = &self.vault.config().buckets.archive;
        self.backend
            .inner()
            .get(bucket, path)
            .ok()
            .flatten()
            .map(|b| b.to_vec())
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fault injection
// ─────────────────────────────────────────────────────────────────────────────

/// Keys matching any pattern in the list fail the corresponding operation.
#[derive(Debug, Default)]
struct Faults {
    puts: Vec<String>,
    gets: Vec<String>,
    deletes: Vec<String>,
    unavailable: bool,
}

impl Faults {
    fn matches(patterns: &[String], key: &str) -> bool {
        patterns.iter().any(|p| key.contains(p.as_str()))
    }
}

/// A memory store that fails selected operations.
///
/// Patterns are substrings of object keys. Deletes fail per key, so a batch
/// can come back partially deleted.
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryObjectStore,
    faults: Mutex<Faults>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped store, for inspecting what actually landed.
    pub fn inner(&self) -> &MemoryObjectStore {
        &self.inner
    }

    /// Fail writes to keys containing `pattern`.
    pub fn fail_puts(&self, pattern: &str) {
        self.faults().puts.push(pattern.to_string());
    }

    /// Fail reads of keys containing `pattern`.
    pub fn fail_gets(&self, pattern: &str) {
        self.faults().gets.push(pattern.to_string());
    }

    /// Fail deletes of keys containing `pattern`.
    pub fn fail_deletes(&self, pattern: &str) {
        self.faults().deletes.push(pattern.to_string());
    }

    /// Fail every call.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults().unavailable = unavailable;
    }

    /// Remove every injected fault.
    pub fn heal(&self) {
        *self.faults() = Faults::default();
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<()> {
        if self.faults().unavailable {
            Err(StoreError::Backend("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ObjectStore for FaultyStore {
    fn put(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        self.check_available()?;
        if Faults::matches(&self.faults().puts, key) {
            return Err(StoreError::Backend(format!("injected put failure for {key}")));
        }
        self.inner.put(bucket, key, body)
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Option<Bytes>> {
        self.check_available()?;
        if Faults::matches(&self.faults().gets, key) {
            return Err(StoreError::Backend(format!("injected get failure for {key}")));
        }
        self.inner.get(bucket, key)
    }

    fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<BatchDeleteResult> {
        self.check_available()?;
        let (failing, passing): (Vec<String>, Vec<String>) = {
            let faults = self.faults();
            keys.iter()
                .cloned()
                .partition(|key| Faults::matches(&faults.deletes, key))
        };

        let mut result = self.inner.delete_batch(bucket, &passing)?;
        result.errors.extend(failing.into_iter().map(|key| DeleteError {
            message: format!("injected delete failure for {key}"),
            key,
        }));
        Ok(result)
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>> {
        self.check_available()?;
        self.inner.list(bucket, prefix)
    }

    fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        self.check_available()?;
        self.inner.bucket_exists(bucket)
    }

    fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.check_available()?;
        self.inner.create_bucket(bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FaultyStore {
        let store = FaultyStore::new();
        store.create_bucket("working").unwrap();
        store
    }

    #[test]
    fn test_put_fault_is_scoped_to_pattern() {
        let store = store();
        store.fail_puts("123-abc");

        assert!(store.put("working", "KS/123-abc.json", Bytes::new()).is_err());
        store.put("working", "KS/456-def.json", Bytes::new()).unwrap();

        store.heal();
        store.put("working", "KS/123-abc.json", Bytes::new()).unwrap();
    }

    #[test]
    fn test_partial_delete() {
        let store = store();
        store.put("working", "a", Bytes::from_static(b"x")).unwrap();
        store.put("working", "b", Bytes::from_static(b"y")).unwrap();
        store.fail_deletes("b");

        let result = store
            .delete_batch("working", &["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(result.deleted, vec!["a".to_string()]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].key, "b");
        assert_eq!(store.inner().object_count("working"), 1);
    }

    #[test]
    fn test_unavailable() {
        let store = store();
        store.set_unavailable(true);
        assert!(store.bucket_exists("working").is_err());
        store.set_unavailable(false);
        assert!(store.bucket_exists("working").unwrap());
    }

    #[test]
    fn test_random_entity_ids_differ() {
        let a = random_entity_id();
        let b = random_entity_id();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_claim_follows_status() {
        let claim = TestClaim::new(PARTNER, "123-abc");
        assert_eq!(claim.payload_path().to_string(), "KS/123-abc.partial.json");
        claim.complete();
        assert_eq!(claim.payload_path().to_string(), "KS/123-abc.json");
    }

    #[test]
    fn test_hook_failure_is_injected() {
        let file = TestFile::new(PARTNER, "f-1");
        file.hooks.fail_hook.set(Some("touch_updated_at"));
        assert!(file.touch_updated_at().is_err());
        file.record_stored_event("claims-working").unwrap();
        assert_eq!(file.hooks.stored_in(), vec!["claims-working".to_string()]);
    }

    #[test]
    fn test_failed_transaction_restores_log() {
        let file = TestFile::new(PARTNER, "f-1");
        file.record_stored_event("claims-working").unwrap();

        let result = file.in_transaction(&mut || {
            file.record_stored_event("claims-archive")?;
            file.touch_updated_at()?;
            Err(HookError::new("write", "down"))
        });

        assert!(result.is_err());
        assert_eq!(file.hooks.stored_in(), vec!["claims-working".to_string()]);
        assert_eq!(file.hooks.touches.get(), 0);
        assert_eq!(file.hooks.rollbacks.get(), 1);
    }
}
