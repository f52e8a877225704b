//! # sharevault
//!
//! Envelope encryption and key custody for multi-user file sharing.
//!
//! Each file body is encrypted once under a fresh AES-256 key. That key is
//! wrapped with RSA-OAEP under the owner's public key, and once more under
//! each grantee's public key when the file is shared. Sharing and revoking
//! never re-encrypt the body. A SHA-256 digest of the ciphertext is checked
//! before every decryption.
//!
//! ## Public API
//!
//! - `manager::EnvelopeManager`: encrypt-for-owner, decrypt-for-holder and
//!   re-wrap-for-grantee. Stateless; does no I/O and no logging.
//! - `keys`, `crypto`, `envelope`, `integrity`: the primitives it is built
//!   from, usable on their own.
//! - `vault::Vault`: an in-memory caller that stores users, files and grants
//!   and audits every operation.

pub mod audit;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod integrity;
pub mod keys;
pub mod manager;
pub mod vault;

pub use config::EnvelopeConfig;
pub use envelope::WrappedKey;
pub use error::{Result, SharevaultError};
pub use integrity::FileDigest;
pub use keys::{KeyPair, PrivateKeyHandle, PrivateKeyPem, PublicKeyHandle, PublicKeyPem, SymmetricKey};
pub use manager::{EncryptedFile, EnvelopeManager};
pub use vault::{FileId, FileState, Grant, Permission, Vault};

/// Generate a 2048-bit RSA key pair for a new user.
///
/// Shorthand for `keys::generate_key_pair(&EnvelopeConfig::default())`.
pub fn generate_key_pair() -> Result<KeyPair> {
    keys::generate_key_pair(&EnvelopeConfig::default())
}
