//! Envelope protocol orchestration.
//!
//! `EnvelopeManager` owns the three workflows the rest of an application
//! calls:
//!
//! ```text
//! encrypt_for_owner          key -> encrypt -> wrap(owner) -> digest
//! decrypt_for_holder         verify -> unwrap(holder) -> decrypt
//! re_encrypt_key_for_grantee unwrap(owner) -> wrap(grantee)
//! ```
//!
//! The manager holds nothing but its configuration. It does not read or
//! write any store and never logs; every failure is returned to the caller
//! with a variant naming the step that failed.

use serde::{Deserialize, Serialize};

use crate::config::EnvelopeConfig;
use crate::crypto;
use crate::envelope::{self, WrappedKey};
use crate::error::{Result, SharevaultError};
use crate::integrity::{self, FileDigest};
use crate::keys::{self, KeyPair, PrivateKeyHandle, PrivateKeyPem, PublicKeyHandle};

/// Everything the caller must persist after an upload. Store all three
/// together or none of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedFile {
    /// `IV ‖ AES-256-CBC body`.
    pub ciphertext: Vec<u8>,
    /// The file key wrapped under the owner's public key.
    pub owner_wrapped_key: WrappedKey,
    /// SHA-256 of `ciphertext`.
    pub digest: FileDigest,
}

/// Stateless orchestrator for the envelope protocol.
///
/// Cheap to clone and safe to share between threads.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeManager {
    config: EnvelopeConfig,
}

impl EnvelopeManager {
    pub fn new(config: EnvelopeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    /// Generate a key pair for a new user with this manager's settings.
    pub fn generate_key_pair(&self) -> Result<KeyPair> {
        keys::generate_key_pair(&self.config)
    }

    /// Encrypt a new file for its owner.
    ///
    /// The file key exists only inside this call and is zeroised when it
    /// returns. Nothing is returned unless every step succeeded.
    pub fn encrypt_for_owner(
        &self,
        plaintext: &[u8],
        owner_public: &PublicKeyHandle,
    ) -> Result<EncryptedFile> {
        let file_key = crypto::generate_key()?;
        let ciphertext = crypto::encrypt(&file_key, plaintext)?;
        let owner_wrapped_key = envelope::wrap_key(&file_key, owner_public)?;
        let digest = integrity::digest(&ciphertext);

        Ok(EncryptedFile {
            ciphertext,
            owner_wrapped_key,
            digest,
        })
    }

    /// Decrypt a stored file for one holder (the owner or a grantee).
    ///
    /// `wrapped_key` must be the copy bound to this holder: the owner's
    /// wrapped key for the owner, the grant's wrapped key for a grantee.
    ///
    /// Steps run in a fixed order and stop at the first failure:
    /// 1. Digest check. `IntegrityViolation`, no key material touched.
    /// 2. Unwrap the file key. `KeyMismatch`.
    /// 3. Symmetric decrypt. `Decryption`.
    pub fn decrypt_for_holder(
        &self,
        ciphertext: &[u8],
        wrapped_key: &WrappedKey,
        digest: &FileDigest,
        holder_private: &PrivateKeyHandle,
    ) -> Result<Vec<u8>> {
        if !integrity::verify(ciphertext, digest) {
            return Err(SharevaultError::IntegrityViolation);
        }

        open_verified(ciphertext, wrapped_key, holder_private)
    }

    /// Same as `decrypt_for_holder`, taking the holder's private key as PEM.
    ///
    /// The key is parsed only after the digest check passes and is dropped
    /// before this call returns.
    pub fn decrypt_for_holder_pem(
        &self,
        ciphertext: &[u8],
        wrapped_key: &WrappedKey,
        digest: &FileDigest,
        holder_private: &PrivateKeyPem,
    ) -> Result<Vec<u8>> {
        if !integrity::verify(ciphertext, digest) {
            return Err(SharevaultError::IntegrityViolation);
        }

        let handle = holder_private.load()?;
        open_verified(ciphertext, wrapped_key, &handle)
    }

    /// Produce a grantee's copy of a file key.
    ///
    /// Only the owner's wrapped key is read. The ciphertext is not needed
    /// and the file key is not regenerated, so the cost is one RSA decrypt
    /// and one RSA encrypt regardless of file size.
    pub fn re_encrypt_key_for_grantee(
        &self,
        owner_wrapped_key: &WrappedKey,
        owner_private: &PrivateKeyHandle,
        grantee_public: &PublicKeyHandle,
    ) -> Result<WrappedKey> {
        let file_key = envelope::unwrap_key(owner_wrapped_key, owner_private)
            .map_err(|_| SharevaultError::KeyMismatch)?;

        envelope::wrap_key(&file_key, grantee_public)
    }
}

/// Steps 2 and 3 of `decrypt_for_holder`. Only call once the digest has
/// been checked.
fn open_verified(
    ciphertext: &[u8],
    wrapped_key: &WrappedKey,
    holder_private: &PrivateKeyHandle,
) -> Result<Vec<u8>> {
    let file_key = envelope::unwrap_key(wrapped_key, holder_private)
        .map_err(|_| SharevaultError::KeyMismatch)?;

    crypto::decrypt(&file_key, ciphertext)
}
