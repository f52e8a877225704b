//! In-memory file vault: users, stored files and grants.
//!
//! The vault is a reference caller of the envelope protocol. It plays the
//! part of the application layer: it keeps each user's key pair, persists the
//! `EncryptedFile` tuple for every upload, keeps one `Grant` per
//! (file, grantee), and records every operation in an `AuditLog`.
//!
//! File lifecycle:
//!
//! ```text
//! Uploaded -> Shared(n) -> Shared(n ± 1) -> ... -> Deleted
//! ```
//!
//! Sharing re-wraps the file key; revoking deletes a grant. Neither touches
//! the ciphertext.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditAction, AuditLog, AuditRecord, AuditSink};
use crate::config::EnvelopeConfig;
use crate::envelope::WrappedKey;
use crate::error::{Result, SharevaultError};
use crate::integrity::FileDigest;
use crate::keys::{KeyPair, PublicKeyPem};
use crate::manager::EnvelopeManager;

/// A unique identifier for a stored file.
pub type FileId = u64;

/// What a grantee may do with a shared file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Edit,
}

/// Where a live file is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Stored, not shared with anyone.
    Uploaded,
    /// Shared with this many grantees (always at least one).
    Shared(usize),
    /// Ciphertext, owner key and every grant are gone.
    Deleted,
}

/// The persisted record of one upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: FileId,
    pub owner: String,
    pub filename: String,
    pub ciphertext: Vec<u8>,
    pub owner_wrapped_key: WrappedKey,
    pub digest: FileDigest,
    /// Size of the stored ciphertext in bytes.
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Authorises one grantee to read one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub file_id: FileId,
    pub grantee: String,
    pub permission: Permission,
    /// The file key wrapped under the grantee's public key.
    pub wrapped_key: WrappedKey,
    pub granted_at: DateTime<Utc>,
}

/// Outcome of `Vault::repair_grants`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub repaired: usize,
    pub failed: usize,
}

/// Users, files and grants behind one envelope manager.
#[derive(Debug)]
pub struct Vault {
    manager: EnvelopeManager,
    users: HashMap<String, KeyPair>,
    files: BTreeMap<FileId, StoredFile>,
    grants: BTreeMap<(FileId, String), Grant>,
    deleted: BTreeSet<FileId>,
    next_file_id: FileId,
    audit: AuditLog,
}

impl Vault {
    pub fn new(config: EnvelopeConfig) -> Result<Self> {
        Ok(Self::with_manager(EnvelopeManager::new(config)?))
    }

    pub fn with_manager(manager: EnvelopeManager) -> Self {
        Self {
            manager,
            users: HashMap::new(),
            files: BTreeMap::new(),
            grants: BTreeMap::new(),
            deleted: BTreeSet::new(),
            next_file_id: 1,
            audit: AuditLog::new(),
        }
    }

    pub fn manager(&self) -> &EnvelopeManager {
        &self.manager
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Forward every audit record to `sink` as well as the in-memory log.
    pub fn add_audit_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.audit.add_forward_sink(sink);
    }

    fn record(
        &mut self,
        action: AuditAction,
        actor: &str,
        file_id: Option<FileId>,
        description: impl Into<String>,
    ) {
        self.audit
            .append(AuditRecord::now(action, Some(actor), file_id, description));
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Create a user and generate their key pair.
    pub fn register_user(&mut self, username: &str) -> Result<&PublicKeyPem> {
        if self.users.contains_key(username) {
            return Err(SharevaultError::UserAlreadyExists(username.to_string()));
        }

        let pair = self.manager.generate_key_pair()?;
        self.users.insert(username.to_string(), pair);
        self.record(AuditAction::Registration, username, None, "key pair generated");
        tracing::debug!(user = username, "registered user");

        self.public_key(username)
    }

    pub fn public_key(&self, username: &str) -> Result<&PublicKeyPem> {
        self.key_pair(username).map(KeyPair::public_key)
    }

    fn key_pair(&self, username: &str) -> Result<&KeyPair> {
        self.users
            .get(username)
            .ok_or_else(|| SharevaultError::UserNotFound(username.to_string()))
    }

    // -----------------------------------------------------------------------
    // Files
    // -----------------------------------------------------------------------

    /// Encrypt `data` for `owner` and store it.
    pub fn upload(&mut self, owner: &str, filename: &str, data: &[u8]) -> Result<FileId> {
        let owner_public = self.key_pair(owner)?.load_public()?;
        let encrypted = self.manager.encrypt_for_owner(data, &owner_public)?;

        let id = self.next_file_id;
        self.next_file_id += 1;

        let size = encrypted.ciphertext.len() as u64;
        self.files.insert(
            id,
            StoredFile {
                id,
                owner: owner.to_string(),
                filename: filename.to_string(),
                ciphertext: encrypted.ciphertext,
                owner_wrapped_key: encrypted.owner_wrapped_key,
                digest: encrypted.digest,
                size,
                uploaded_at: Utc::now(),
            },
        );

        self.record(
            AuditAction::FileUpload,
            owner,
            Some(id),
            format!("uploaded {filename} ({size} bytes encrypted)"),
        );
        tracing::debug!(file_id = id, owner, size, "stored encrypted file");
        Ok(id)
    }

    /// Decrypt a file for `user`, who must be its owner or a grantee.
    ///
    /// Integrity, key and decryption failures are audited before they are
    /// returned.
    pub fn download(&mut self, user: &str, file_id: FileId) -> Result<Vec<u8>> {
        let file = self.file(file_id)?;

        let wrapped_key = if file.owner == user {
            file.owner_wrapped_key.clone()
        } else if let Some(grant) = self.grants.get(&(file_id, user.to_string())) {
            grant.wrapped_key.clone()
        } else {
            self.record(
                AuditAction::UnauthorizedDownload,
                user,
                Some(file_id),
                "no grant for this user",
            );
            tracing::warn!(file_id, user, "download attempted without a grant");
            return Err(SharevaultError::AccessDenied);
        };

        let holder = self.key_pair(user)?.load_private()?;
        let file = self.file(file_id)?;
        let outcome = self.manager.decrypt_for_holder(
            &file.ciphertext,
            &wrapped_key,
            &file.digest,
            &holder,
        );
        drop(holder);

        match &outcome {
            Ok(plaintext) => {
                let description = format!("downloaded {} bytes", plaintext.len());
                self.record(AuditAction::FileDownload, user, Some(file_id), description);
            }
            Err(SharevaultError::IntegrityViolation) => {
                self.record(
                    AuditAction::FileIntegrityViolation,
                    user,
                    Some(file_id),
                    "stored ciphertext does not match its digest",
                );
                tracing::warn!(file_id, user, "integrity violation");
            }
            Err(e) => {
                self.record(AuditAction::FileDecryptionError, user, Some(file_id), e.to_string());
                tracing::warn!(file_id, user, error = %e, "decryption failed");
            }
        }
        outcome
    }

    /// Remove a file, its owner key and every grant on it.
    pub fn delete(&mut self, owner: &str, file_id: FileId) -> Result<()> {
        self.require_owner(owner, file_id)?;

        self.files.remove(&file_id);
        let before = self.grants.len();
        self.grants.retain(|(id, _), _| *id != file_id);
        let dropped = before - self.grants.len();
        self.deleted.insert(file_id);

        self.record(
            AuditAction::FileDeleted,
            owner,
            Some(file_id),
            format!("deleted with {dropped} grant(s)"),
        );
        tracing::debug!(file_id, dropped, "deleted file");
        Ok(())
    }

    pub fn state(&self, file_id: FileId) -> Result<FileState> {
        if self.deleted.contains(&file_id) {
            return Ok(FileState::Deleted);
        }
        self.file(file_id)?;
        Ok(match self.grant_count(file_id) {
            0 => FileState::Uploaded,
            n => FileState::Shared(n),
        })
    }

    pub fn stored_file(&self, file_id: FileId) -> Result<&StoredFile> {
        self.file(file_id)
    }

    /// Raw mutable access to a stored record, the same access a storage
    /// backend has. Changing it does not update the digest.
    pub fn stored_file_mut(&mut self, file_id: FileId) -> Result<&mut StoredFile> {
        self.files
            .get_mut(&file_id)
            .ok_or(SharevaultError::FileNotFound(file_id))
    }

    pub fn files_owned_by(&self, user: &str) -> Vec<&StoredFile> {
        self.files.values().filter(|f| f.owner == user).collect()
    }

    pub fn files_shared_with(&self, user: &str) -> Vec<&StoredFile> {
        self.grants
            .keys()
            .filter(|(_, grantee)| grantee == user)
            .filter_map(|(id, _)| self.files.get(id))
            .collect()
    }

    fn file(&self, file_id: FileId) -> Result<&StoredFile> {
        self.files
            .get(&file_id)
            .ok_or(SharevaultError::FileNotFound(file_id))
    }

    fn require_owner(&self, user: &str, file_id: FileId) -> Result<&StoredFile> {
        let file = self.file(file_id)?;
        if file.owner != user {
            return Err(SharevaultError::AccessDenied);
        }
        Ok(file)
    }

    // -----------------------------------------------------------------------
    // Grants
    // -----------------------------------------------------------------------

    /// Share a file with `grantee`.
    ///
    /// Sharing again with the same grantee replaces the existing grant,
    /// including its permission.
    pub fn share(
        &mut self,
        owner: &str,
        file_id: FileId,
        grantee: &str,
        permission: Permission,
    ) -> Result<()> {
        self.require_owner(owner, file_id)?;
        if owner == grantee {
            return Err(SharevaultError::InvalidGrant(
                "owner cannot share a file with themselves".to_string(),
            ));
        }

        let wrapped_key = self.rewrap_for(file_id, grantee)?;
        let replaced = self
            .grants
            .insert(
                (file_id, grantee.to_string()),
                Grant {
                    file_id,
                    grantee: grantee.to_string(),
                    permission,
                    wrapped_key,
                    granted_at: Utc::now(),
                },
            )
            .is_some();

        self.record(
            AuditAction::FileShared,
            owner,
            Some(file_id),
            format!("shared with {grantee} ({permission:?})"),
        );
        tracing::debug!(file_id, grantee, replaced, "granted access");
        Ok(())
    }

    /// Owner withdraws `grantee`'s access.
    pub fn revoke(&mut self, owner: &str, file_id: FileId, grantee: &str) -> Result<()> {
        self.require_owner(owner, file_id)?;
        self.remove_grant(file_id, grantee)?;

        self.record(
            AuditAction::ShareRevoked,
            owner,
            Some(file_id),
            format!("revoked {grantee}"),
        );
        Ok(())
    }

    /// Grantee removes a shared file from their own list.
    pub fn remove_shared(&mut self, grantee: &str, file_id: FileId) -> Result<()> {
        self.remove_grant(file_id, grantee)?;
        self.record(AuditAction::ShareRemoved, grantee, Some(file_id), "removed from shared list");
        Ok(())
    }

    pub fn grant(&self, file_id: FileId, grantee: &str) -> Option<&Grant> {
        self.grants.get(&(file_id, grantee.to_string()))
    }

    /// Raw mutable access to a stored grant, the same access a storage
    /// backend has.
    pub fn stored_grant_mut(&mut self, file_id: FileId, grantee: &str) -> Result<&mut Grant> {
        self.grants
            .get_mut(&(file_id, grantee.to_string()))
            .ok_or_else(|| SharevaultError::GrantNotFound {
                file_id,
                grantee: grantee.to_string(),
            })
    }

    pub fn grants(&self, file_id: FileId) -> Vec<&Grant> {
        self.grants
            .range((file_id, String::new())..)
            .take_while(|((id, _), _)| *id == file_id)
            .map(|(_, grant)| grant)
            .collect()
    }

    fn grant_count(&self, file_id: FileId) -> usize {
        self.grants(file_id).len()
    }

    fn remove_grant(&mut self, file_id: FileId, grantee: &str) -> Result<Grant> {
        self.file(file_id)?;
        self.grants
            .remove(&(file_id, grantee.to_string()))
            .ok_or_else(|| SharevaultError::GrantNotFound {
                file_id,
                grantee: grantee.to_string(),
            })
    }

    /// Unwrap the owner's copy of the file key and wrap it for `grantee`.
    /// Both private and public handles live only for this call.
    fn rewrap_for(&self, file_id: FileId, grantee: &str) -> Result<WrappedKey> {
        let file = self.file(file_id)?;
        let grantee_public = self.key_pair(grantee)?.load_public()?;
        let owner_private = self.key_pair(&file.owner)?.load_private()?;

        self.manager
            .re_encrypt_key_for_grantee(&file.owner_wrapped_key, &owner_private, &grantee_public)
    }

    /// Re-wrap every grant from its file's owner key.
    ///
    /// Repairs grants whose wrapped key was stored corrupted or under the
    /// wrong public key. A grant that cannot be re-wrapped is left as it is,
    /// counted and audited; the pass continues.
    pub fn repair_grants(&mut self) -> RepairReport {
        let mut report = RepairReport::default();
        let keys: Vec<(FileId, String)> = self.grants.keys().cloned().collect();

        for (file_id, grantee) in keys {
            match self.rewrap_for(file_id, &grantee) {
                Ok(wrapped_key) => {
                    if let Some(grant) = self.grants.get_mut(&(file_id, grantee.clone())) {
                        grant.wrapped_key = wrapped_key;
                    }
                    report.repaired += 1;
                    self.record(
                        AuditAction::GrantRepaired,
                        &grantee,
                        Some(file_id),
                        "grant re-wrapped from owner key",
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    self.record(AuditAction::GrantRepairFailed, &grantee, Some(file_id), e.to_string());
                    tracing::warn!(file_id, grantee = %grantee, error = %e, "grant repair failed");
                }
            }
        }

        tracing::debug!(repaired = report.repaired, failed = report.failed, "grant repair finished");
        report
    }
}
