//! The ClaimVault: encrypt, store and read back claim artifacts.

use tracing::{debug, error};

use claimvault_core::{BucketKind, Lifecycle, StoredEntity};
use claimvault_crypto::{
    payload_id, AsymmetricClaimEncryptor, ClaimDecryptor, ClaimEncryptor, ClaimPayload,
    CryptoError, Envelope, KeyRing, PartnerPublicKey, RotatableDecryptor,
    SymmetricClaimEncryptor, SymmetricKey,
};
use claimvault_store::ObjectStore;

use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::gateway::ArtifactStore;
use crate::rotation::KeyRotation;

/// The main ClaimVault struct.
///
/// Composes the envelope codec with the artifact gateway:
/// - server-readable artifacts (in-progress claims, claimant files) are
///   sealed with the current key of the ring
/// - completed claims are sealed to the partner's public key
/// - archive copies are stored as plaintext JSON
///
/// Cryptographic failures raise; storage failures come back as `false` or
/// `None`.
pub struct ClaimVault<B: ObjectStore> {
    store: ArtifactStore<B>,
    keys: KeyRing,
    config: VaultConfig,
}

impl<B: ObjectStore> ClaimVault<B> {
    /// Create a vault over `backend` with the given keys.
    pub fn new(backend: B, keys: KeyRing, config: VaultConfig) -> Self {
        Self {
            store: ArtifactStore::new(backend, config.buckets.clone()),
            keys,
            config,
        }
    }

    /// Get the gateway reference.
    pub fn store(&self) -> &ArtifactStore<B> {
        &self.store
    }

    /// Get the key ring.
    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    /// Get the configuration.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Make `key` current. Previous keys stay valid for reads.
    pub fn promote_key(&mut self, key: SymmetricKey) {
        self.keys.promote(key);
    }

    /// Create any missing bucket.
    pub fn ensure_buckets(&self) -> Result<()> {
        self.store.ensure_buckets()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Working bucket
    // ─────────────────────────────────────────────────────────────────────────

    /// Seal `payload` with the current key and store it at the entity's
    /// payload path.
    ///
    /// Used for in-progress claims and claimant files, which the server
    /// must be able to read back.
    pub fn save_partial<E>(&self, entity: &E, payload: &ClaimPayload) -> Result<bool>
    where
        E: StoredEntity + ?Sized,
    {
        check_id(entity, payload)?;
        let encryptor = SymmetricClaimEncryptor::with_content_encryption(
            self.keys.current().clone(),
            self.config.content_encryption,
        );
        let envelope = encryptor.packaged_claim(payload)?;
        self.store_envelope(entity, &envelope)
    }

    /// Read back a server-readable artifact, trying every key in the ring.
    ///
    /// `None` if nothing is stored (or the backend is unavailable).
    pub fn load_partial<E>(&self, entity: &E) -> Result<Option<ClaimPayload>>
    where
        E: StoredEntity + ?Sized,
    {
        let path = entity.payload_path().to_string();
        let Some(bytes) = self.store.read(BucketKind::Working, &path) else {
            return Ok(None);
        };

        let envelope = Envelope::from_bytes(&bytes)?;
        if envelope.claim_id() != entity.entity_id().as_str() {
            error!(path = %path, claim_id = envelope.claim_id(), "envelope filed under another entity");
            return Err(CryptoError::Integrity(format!(
                "envelope for {} stored at {path}",
                envelope.claim_id()
            ))
            .into());
        }

        let payload = RotatableDecryptor::from_ring(&self.keys).decrypt(&envelope)?;
        debug!(path = %path, kid = envelope.kid(), "opened artifact");
        Ok(Some(payload))
    }

    /// Seal `payload` to the partner's public key and store it at the
    /// entity's payload path. The vault cannot read it back.
    pub fn save_completed<E>(
        &self,
        entity: &E,
        payload: &ClaimPayload,
        partner_key: &PartnerPublicKey,
    ) -> Result<bool>
    where
        E: StoredEntity + ?Sized,
    {
        check_id(entity, payload)?;
        let encryptor = AsymmetricClaimEncryptor::with_content_encryption(
            *partner_key,
            self.config.content_encryption,
        );
        let envelope = encryptor.packaged_claim(payload)?;
        self.store_envelope(entity, &envelope)
    }

    fn store_envelope<E>(&self, entity: &E, envelope: &Envelope) -> Result<bool>
    where
        E: StoredEntity + ?Sized,
    {
        let bytes = envelope.to_bytes()?;
        Ok(self.store.store_entity(entity, BucketKind::Working, bytes))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Archive bucket
    // ─────────────────────────────────────────────────────────────────────────

    /// Store the plaintext audit copy of a completed claim.
    pub fn archive_completed<E>(&self, entity: &E, payload: &ClaimPayload) -> bool
    where
        E: StoredEntity + ?Sized,
    {
        match serde_json::to_vec(payload) {
            Ok(bytes) => self.store.store_entity(entity, BucketKind::Archive, bytes),
            Err(e) => {
                error!(entity = %entity.entity_id(), error = %e, "failed to serialize archive copy");
                false
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Deletion
    // ─────────────────────────────────────────────────────────────────────────

    /// Delete both the partial and the completed working artifacts of every
    /// entity. `true` only if all of them are gone.
    pub fn delete_artifacts<'a, E, I>(&self, entities: I) -> bool
    where
        E: StoredEntity + ?Sized + 'a,
        I: IntoIterator<Item = &'a E>,
    {
        let paths: Vec<String> = entities
            .into_iter()
            .flat_map(|entity| {
                [Lifecycle::Partial, Lifecycle::Final]
                    .map(|lifecycle| entity.artifact_path(lifecycle).to_string())
            })
            .collect();
        self.store.delete_all(BucketKind::Working, &paths)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rotation
    // ─────────────────────────────────────────────────────────────────────────

    /// Prepare a rotation from `old_key` to `new_key` over this vault's
    /// working bucket.
    pub fn rotation<'a>(
        &'a self,
        old_key: &SymmetricKey,
        new_key: &SymmetricKey,
    ) -> KeyRotation<'a, B> {
        KeyRotation::new(&self.store, old_key.clone(), new_key.clone())
            .with_content_encryption(self.config.content_encryption)
    }
}

fn check_id<E: StoredEntity + ?Sized>(entity: &E, payload: &ClaimPayload) -> Result<()> {
    let id = payload_id(payload)?;
    if id != entity.entity_id().as_str() {
        return Err(VaultError::IdMismatch {
            entity: entity.entity_id().clone(),
            payload: id.to_string(),
        });
    }
    Ok(())
}
