//! Key rotation: re-encrypt a principal's server-readable artifacts.
//!
//! For each principal, every claimant file and then every in-progress claim
//! is read, opened with the old key, sealed with the new key and written
//! back to the same path. Completed and deleted claims are skipped; they are
//! sealed to the partner's key and never opened here.
//!
//! Rotation is not atomic. A failure stops the principal where it is and
//! leaves rotated artifacts rotated. Running the same rotation again is the
//! recovery path: artifacts already under the new key are counted and left
//! alone.

use tracing::{debug, info, warn};

use claimvault_core::{
    ArtifactClass, ArtifactPath, BucketKind, ClaimEntity, ClaimStatus, StoredEntity,
};
use claimvault_crypto::{
    ClaimDecryptor, ClaimEncryptor, ContentEncryption, CryptoError, Envelope,
    SymmetricClaimDecryptor, SymmetricClaimEncryptor, SymmetricKey,
};
use claimvault_store::ObjectStore;

use crate::error::{RotationError, StorageOp};
use crate::gateway::ArtifactStore;

/// A claimant and the artifacts they own.
pub trait Principal {
    /// Identifier used in logs and outcomes.
    fn principal_id(&self) -> String;

    /// The principal's uploaded files.
    fn files(&self) -> Vec<&dyn StoredEntity>;

    /// The principal's claims, in any status.
    fn claims(&self) -> Vec<&dyn ClaimEntity>;
}

/// Receives every rotated artifact, for audit logging.
pub trait RotationObserver {
    fn artifact_rotated(&self, path: &ArtifactPath, before: &Envelope, after: &Envelope);
}

/// Counts for one principal's completed rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationReport {
    /// Artifacts re-encrypted by this run.
    pub rotated: usize,
    /// Artifacts that were already under the new key.
    pub already_current: usize,
    /// Completed or deleted claims left untouched.
    pub skipped: usize,
    new_kid: String,
}

impl RotationReport {
    fn new(new_kid: &str) -> Self {
        Self {
            rotated: 0,
            already_current: 0,
            skipped: 0,
            new_kid: new_kid.to_string(),
        }
    }

    /// Thumbprint of the key every server-readable artifact is now under.
    ///
    /// The caller records this as the principal's migrated key hash.
    pub fn migrated_key_hash(&self) -> &str {
        &self.new_kid
    }
}

/// Result of rotating one principal as part of a batch.
#[derive(Debug)]
pub struct PrincipalOutcome {
    pub principal: String,
    pub result: Result<RotationReport, RotationError>,
}

impl PrincipalOutcome {
    /// Whether the principal may be marked as migrated.
    pub fn is_migrated(&self) -> bool {
        self.result.is_ok()
    }

    /// The key hash to record, if migrated.
    pub fn migrated_key_hash(&self) -> Option<&str> {
        self.result.as_ref().ok().map(RotationReport::migrated_key_hash)
    }
}

/// A rotation from one shared secret to another over a gateway.
pub struct KeyRotation<'a, B: ObjectStore> {
    store: &'a ArtifactStore<B>,
    decryptor: SymmetricClaimDecryptor,
    encryptor: SymmetricClaimEncryptor,
    new_kid: String,
    observer: Option<&'a dyn RotationObserver>,
}

impl<'a, B: ObjectStore> KeyRotation<'a, B> {
    pub fn new(store: &'a ArtifactStore<B>, old_key: SymmetricKey, new_key: SymmetricKey) -> Self {
        Self {
            store,
            decryptor: SymmetricClaimDecryptor::new(old_key),
            new_kid: new_key.kid().to_string(),
            encryptor: SymmetricClaimEncryptor::new(new_key),
            observer: None,
        }
    }

    /// Cipher for the re-sealed envelopes.
    pub fn with_content_encryption(mut self, enc: ContentEncryption) -> Self {
        self.encryptor =
            SymmetricClaimEncryptor::with_content_encryption(self.encryptor.key().clone(), enc);
        self
    }

    /// Report every rotated artifact to `observer`.
    pub fn with_observer(mut self, observer: &'a dyn RotationObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Rotate all of one principal's server-readable artifacts.
    ///
    /// Files are rotated before claims. The first failure aborts the
    /// principal.
    pub fn rotate<P: Principal + ?Sized>(&self, principal: &P) -> Result<RotationReport, RotationError> {
        let principal_id = principal.principal_id();
        let mut report = RotationReport::new(&self.new_kid);

        let result = self.rotate_into(principal, &mut report);
        match &result {
            Ok(()) => info!(
                principal = %principal_id,
                rotated = report.rotated,
                already_current = report.already_current,
                skipped = report.skipped,
                kid = %self.new_kid,
                "rotated principal"
            ),
            Err(e) => warn!(
                principal = %principal_id,
                rotated = report.rotated,
                error = %e,
                "rotation aborted"
            ),
        }
        result.map(|()| report)
    }

    fn rotate_into<P: Principal + ?Sized>(
        &self,
        principal: &P,
        report: &mut RotationReport,
    ) -> Result<(), RotationError> {
        for file in principal.files() {
            self.rotate_artifact(file, ArtifactClass::ClaimantFile, report)?;
        }

        for claim in principal.claims() {
            match claim.status() {
                ClaimStatus::InProgress => {
                    self.rotate_artifact(claim, ArtifactClass::PartialClaim, report)?
                }
                ClaimStatus::Completed | ClaimStatus::Deleted => report.skipped += 1,
            }
        }
        Ok(())
    }

    fn rotate_artifact<E: StoredEntity + ?Sized>(
        &self,
        entity: &E,
        class: ArtifactClass,
        report: &mut RotationReport,
    ) -> Result<(), RotationError> {
        let path = entity.payload_path();
        let key = path.to_string();
        let crypto_error = |source: CryptoError| RotationError::Crypto {
            class,
            path: path.clone(),
            source,
        };

        let bytes = self
            .store
            .read(BucketKind::Working, &key)
            .ok_or_else(|| RotationError::Storage {
                op: StorageOp::Read,
                class,
                path: path.clone(),
            })?;

        let before = Envelope::from_bytes(&bytes).map_err(crypto_error)?;
        if before.claim_id() != entity.entity_id().as_str() {
            return Err(crypto_error(CryptoError::Integrity(format!(
                "envelope for {} stored at {key}",
                before.claim_id()
            ))));
        }

        if before.kid() == self.new_kid {
            debug!(path = %key, "already under new key");
            report.already_current += 1;
            return Ok(());
        }

        let payload = self.decryptor.decrypt(&before).map_err(crypto_error)?;
        let after = self.encryptor.packaged_claim(&payload).map_err(crypto_error)?;
        let body = after.to_bytes().map_err(crypto_error)?;

        if !self.store.write(BucketKind::Working, &key, body) {
            return Err(RotationError::Storage {
                op: StorageOp::Write,
                class,
                path,
            });
        }

        if let Some(observer) = self.observer {
            observer.artifact_rotated(&path, &before, &after);
        }
        report.rotated += 1;
        Ok(())
    }

    /// Rotate many principals independently.
    ///
    /// A failing principal does not stop the batch.
    pub fn rotate_all<'p, P, I>(&self, principals: I) -> Vec<PrincipalOutcome>
    where
        P: Principal + ?Sized + 'p,
        I: IntoIterator<Item = &'p P>,
    {
        let outcomes: Vec<PrincipalOutcome> = principals
            .into_iter()
            .map(|principal| PrincipalOutcome {
                principal: principal.principal_id(),
                result: self.rotate(principal),
            })
            .collect();

        let migrated = outcomes.iter().filter(|o| o.is_migrated()).count();
        info!(
            principals = outcomes.len(),
            migrated,
            failed = outcomes.len() - migrated,
            "rotation batch finished"
        );
        outcomes
    }
}
