//! End-to-end scenarios over the public API.
//!
//! Claims are saved, read back, submitted, archived, rotated and deleted
//! against a fault-injecting memory store and against SQLite on disk.

use std::sync::Arc;

use proptest::prelude::*;

use claimvault::crypto::{ClaimDecryptor, PartnerClaimDecryptor};
use claimvault::{
    ArtifactClass, BucketKind, ClaimStatus, ClaimVault, CryptoError, Envelope, KeyRing,
    PartnerPublicKey, RotationError, SqliteObjectStore, StorageOp, SymmetricKey, VaultConfig,
    VaultError,
};
use claimvault_testkit::generators::{claim, content_encryption};
use claimvault_testkit::{
    FaultyStore, RecordingObserver, TestClaim, TestClaimant, TestFile, TestFixture, PARTNER,
    SECRET_MARKER,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Save and load
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn partial_claim_is_encrypted_at_rest() {
    init_tracing();
    let fixture = TestFixture::new();
    let claim = TestClaim::new(PARTNER, "123-abc");

    assert!(fixture.vault.save_partial(&claim, &claim.payload()).unwrap());

    let stored = fixture.working_bytes("KS/123-abc.partial.json").unwrap();
    let text = String::from_utf8(stored).unwrap();
    assert!(!text.contains(SECRET_MARKER));

    let envelope = Envelope::from_bytes(text.as_bytes()).unwrap();
    assert_eq!(envelope.claim_id(), "123-abc");
    assert_eq!(envelope.kid(), fixture.key.kid());

    assert_eq!(
        fixture.vault.load_partial(&claim).unwrap(),
        Some(claim.payload())
    );
}

#[test]
fn minimal_claim_roundtrips_without_leaking() {
    let fixture = TestFixture::new();
    let claim = TestClaim::new(PARTNER, "123-abc");
    let payload = claimvault_testkit::fixtures::payload_from(serde_json::json!({
        "id": "123-abc",
        "foo": "secret",
    }));

    assert!(fixture.vault.save_partial(&claim, &payload).unwrap());
    let stored = fixture.working_bytes("KS/123-abc.partial.json").unwrap();
    assert!(!String::from_utf8_lossy(&stored).contains("secret"));
    assert_eq!(fixture.vault.load_partial(&claim).unwrap(), Some(payload));
}

#[test]
fn overwrite_is_last_write_wins() {
    let fixture = TestFixture::new();
    let claim = TestClaim::new(PARTNER, "123-abc");
    let mut updated = claim.payload();
    updated.insert("weekly_earnings".into(), 500.into());

    fixture.vault.save_partial(&claim, &claim.payload()).unwrap();
    fixture.vault.save_partial(&claim, &updated).unwrap();

    assert_eq!(fixture.vault.load_partial(&claim).unwrap(), Some(updated));
    assert_eq!(claim.hooks.stored_in().len(), 2);
}

#[test]
fn chacha_content_encryption_roundtrips() {
    let config = VaultConfig::from_json(r#"{"content_encryption": "C20P"}"#).unwrap();
    let fixture = TestFixture::with_config(config);
    let claim = TestClaim::new(PARTNER, "123-abc");

    fixture.vault.save_partial(&claim, &claim.payload()).unwrap();
    let text = String::from_utf8(fixture.working_bytes("KS/123-abc.partial.json").unwrap()).unwrap();

    let envelope = Envelope::from_bytes(text.as_bytes()).unwrap();
    let header = envelope.claim.header().unwrap();
    assert_eq!(header.enc, "C20P");
    assert_eq!(
        fixture.vault.load_partial(&claim).unwrap(),
        Some(claim.payload())
    );
}

#[test]
fn trial_decryption_across_key_ring() {
    let backend = Arc::new(FaultyStore::new());
    let old_key = SymmetricKey::generate();
    let new_key = SymmetricKey::generate();

    let writer = ClaimVault::new(
        Arc::clone(&backend),
        KeyRing::new(vec![old_key.clone()]).unwrap(),
        VaultConfig::default(),
    );
    writer.ensure_buckets().unwrap();
    let claim = TestClaim::new(PARTNER, "123-abc");
    writer.save_partial(&claim, &claim.payload()).unwrap();

    // A reader that knows both keys opens it; one that only knows the new key cannot.
    let both = ClaimVault::new(
        Arc::clone(&backend),
        KeyRing::new(vec![new_key.clone(), old_key]).unwrap(),
        VaultConfig::default(),
    );
    assert_eq!(both.load_partial(&claim).unwrap(), Some(claim.payload()));

    let new_only = ClaimVault::new(
        backend,
        KeyRing::new(vec![new_key]).unwrap(),
        VaultConfig::default(),
    );
    assert!(matches!(
        new_only.load_partial(&claim),
        Err(VaultError::Crypto(CryptoError::NoMatchingKey { .. }))
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Submission
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn submitted_claim_is_sealed_for_partner_and_archived() {
    let fixture = TestFixture::new();
    let claim = TestClaim::new(PARTNER, "123-abc");
    fixture.vault.save_partial(&claim, &claim.payload()).unwrap();

    // The partner publishes its key as PEM.
    let partner_pem = fixture.partner_key.public_key().to_pem();
    let partner_key = PartnerPublicKey::parse(&partner_pem).unwrap();

    claim.complete();
    assert!(fixture
        .vault
        .save_completed(&claim, &claim.payload(), &partner_key)
        .unwrap());
    assert!(fixture.vault.archive_completed(&claim, &claim.payload()));

    let sealed = fixture.working_bytes("KS/123-abc.json").unwrap();
    assert!(!String::from_utf8_lossy(&sealed).contains(SECRET_MARKER));
    let archived = fixture.archive_bytes("KS/123-abc.json").unwrap();
    assert!(String::from_utf8_lossy(&archived).contains(SECRET_MARKER));

    let envelope = Envelope::from_bytes(&sealed).unwrap();
    let opened = PartnerClaimDecryptor::new(fixture.partner_key)
        .decrypt(&envelope)
        .unwrap();
    assert_eq!(opened, claim.payload());

    assert_eq!(
        claim.hooks.stored_in(),
        vec!["claims-working", "claims-working", "claims-archive"]
    );
}

#[test]
fn wrong_partner_key_fails_integrity() {
    let fixture = TestFixture::new();
    let claim = TestClaim::new(PARTNER, "123-abc").with_status(ClaimStatus::Completed);
    fixture
        .vault
        .save_completed(&claim, &claim.payload(), &fixture.partner_key.public_key())
        .unwrap();

    let envelope = Envelope::from_bytes(&fixture.working_bytes("KS/123-abc.json").unwrap()).unwrap();
    let other = PartnerClaimDecryptor::new(claimvault::PartnerSecretKey::generate());
    assert!(matches!(
        other.decrypt(&envelope),
        Err(CryptoError::Integrity(_))
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Deletion
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn partial_delete_can_be_retried() {
    let fixture = TestFixture::new();
    let a = TestClaim::new(PARTNER, "a");
    let b = TestClaim::new(PARTNER, "b");
    fixture.vault.save_partial(&a, &a.payload()).unwrap();
    fixture.vault.save_partial(&b, &b.payload()).unwrap();

    fixture.backend.fail_deletes("KS/b.");
    let paths = vec!["KS/a.partial.json".to_string(), "KS/b.partial.json".to_string()];
    let report = fixture.vault.store().delete(BucketKind::Working, &paths).unwrap();
    assert!(!report.is_complete());
    assert_eq!(report.deleted, vec!["KS/a.partial.json".to_string()]);
    assert_eq!(report.errors[0].key, "KS/b.partial.json");

    fixture.backend.heal();
    assert!(fixture
        .vault
        .store()
        .delete_all(BucketKind::Working, &paths[1..]));
    assert_eq!(fixture.working_bytes("KS/b.partial.json"), None);
}

// ─────────────────────────────────────────────────────────────────────────────
// Rotation
// ─────────────────────────────────────────────────────────────────────────────

fn claimant(id: &str) -> TestClaimant {
    TestClaimant::new(id)
        .with_file(TestFile::new(PARTNER, &format!("{id}-file")))
        .with_claim(TestClaim::new(PARTNER, &format!("{id}-draft")))
        .with_claim(
            TestClaim::new(PARTNER, &format!("{id}-done")).with_status(ClaimStatus::Completed),
        )
        .with_claim(
            TestClaim::new(PARTNER, &format!("{id}-gone")).with_status(ClaimStatus::Deleted),
        )
}

fn save_all(fixture: &TestFixture, claimant: &TestClaimant) {
    for file in &claimant.files {
        assert!(fixture.vault.save_partial(file, &file.payload()).unwrap());
    }
    for claim in claimant.claims.iter().filter(|c| c.status.get() == ClaimStatus::InProgress) {
        assert!(fixture.vault.save_partial(claim, &claim.payload()).unwrap());
    }
}

#[test]
fn rotation_moves_artifacts_to_new_key() {
    init_tracing();
    let mut fixture = TestFixture::new();
    let alice = claimant("alice");
    save_all(&fixture, &alice);

    let new_key = SymmetricKey::generate();
    let observer = RecordingObserver::default();
    let report = fixture
        .vault
        .rotation(&fixture.key, &new_key)
        .with_observer(&observer)
        .rotate(&alice)
        .unwrap();

    assert_eq!(report.rotated, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.migrated_key_hash(), new_key.kid());

    let rotated = observer.rotated.borrow();
    assert_eq!(rotated[0].0, "KS/alice-file.json");
    assert_eq!(rotated[1].0, "KS/alice-draft.partial.json");
    assert!(rotated.iter().all(|(_, before, after)| {
        before == fixture.key.kid() && after == new_key.kid()
    }));
    drop(rotated);

    // The stored artifacts now open with the new key only.
    let draft = &alice.claims[0];
    let stored = fixture.working_bytes("KS/alice-draft.partial.json").unwrap();
    let envelope = Envelope::from_bytes(&stored).unwrap();
    assert_eq!(envelope.kid(), new_key.kid());
    assert!(matches!(
        claimvault::crypto::SymmetricClaimDecryptor::new(fixture.key.clone()).decrypt(&envelope),
        Err(CryptoError::KeyMismatch { .. })
    ));

    fixture.vault.promote_key(new_key);
    assert_eq!(
        fixture.vault.load_partial(draft).unwrap(),
        Some(draft.payload())
    );
}

#[test]
fn rotation_resumes_after_failure() {
    let fixture = TestFixture::new();
    let alice = claimant("alice");
    save_all(&fixture, &alice);
    let new_key = SymmetricKey::generate();
    let rotation = fixture.vault.rotation(&fixture.key, &new_key);

    fixture.backend.fail_puts("alice-draft");
    let err = rotation.rotate(&alice).unwrap_err();
    assert!(matches!(
        err,
        RotationError::Storage {
            op: StorageOp::Write,
            class: ArtifactClass::PartialClaim,
            ..
        }
    ));
    assert_eq!(err.path().to_string(), "KS/alice-draft.partial.json");

    // The file was rotated before the failure and is left rotated.
    let file = Envelope::from_bytes(&fixture.working_bytes("KS/alice-file.json").unwrap()).unwrap();
    assert_eq!(file.kid(), new_key.kid());

    fixture.backend.heal();
    let report = rotation.rotate(&alice).unwrap();
    assert_eq!(report.already_current, 1);
    assert_eq!(report.rotated, 1);
}

#[test]
fn rotate_all_continues_past_failing_principal() {
    let fixture = TestFixture::new();
    let alice = claimant("alice");
    let bob = claimant("bob");
    let carol = claimant("carol");
    for c in [&alice, &bob, &carol] {
        save_all(&fixture, c);
    }
    fixture.backend.fail_puts("bob-file");

    let new_key = SymmetricKey::generate();
    let outcomes = fixture
        .vault
        .rotation(&fixture.key, &new_key)
        .rotate_all([&alice, &bob, &carol]);

    let migrated: Vec<(&str, bool)> = outcomes
        .iter()
        .map(|o| (o.principal.as_str(), o.is_migrated()))
        .collect();
    assert_eq!(migrated, vec![("alice", true), ("bob", false), ("carol", true)]);
    assert_eq!(outcomes[0].migrated_key_hash(), Some(new_key.kid()));
    assert_eq!(outcomes[1].migrated_key_hash(), None);

    let bob_err = outcomes[1].result.as_ref().unwrap_err();
    assert_eq!(bob_err.class(), ArtifactClass::ClaimantFile);
    assert_eq!(
        bob_err.to_string(),
        "could not write re-encrypted claimant file at KS/bob-file.json"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn sqlite_vault_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("claims.db");
    let key = SymmetricKey::generate();
    let claim = TestClaim::new(PARTNER, "123-abc");

    {
        let config = VaultConfig::default();
        let backend = SqliteObjectStore::open(&path, &config.store).unwrap();
        let vault = ClaimVault::new(backend, KeyRing::new(vec![key.clone()]).unwrap(), config);
        vault.ensure_buckets().unwrap();
        assert!(vault.save_partial(&claim, &claim.payload()).unwrap());
    }

    let config = VaultConfig::default();
    let backend = SqliteObjectStore::open(&path, &config.store).unwrap();
    let vault = ClaimVault::new(backend, KeyRing::new(vec![key]).unwrap(), config);
    assert_eq!(vault.load_partial(&claim).unwrap(), Some(claim.payload()));

    let listed = vault.store().list(BucketKind::Working, "KS/").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].key, "KS/123-abc.partial.json");
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_claim_roundtrips((id, payload) in claim(), enc in content_encryption()) {
        let config = VaultConfig { content_encryption: enc, ..VaultConfig::default() };
        let fixture = TestFixture::with_config(config);
        let entity = TestClaim::new(PARTNER, id.as_str());

        prop_assert!(fixture.vault.save_partial(&entity, &payload).unwrap());
        prop_assert_eq!(fixture.vault.load_partial(&entity).unwrap(), Some(payload));
    }
}
