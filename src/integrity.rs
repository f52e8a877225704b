//! Ciphertext integrity digests.
//!
//! CBC bodies carry no authentication tag, so every stored ciphertext is
//! fingerprinted with SHA-256 at encryption time and re-checked before any
//! key material is touched on the way back out.

use std::fmt;

use ring::digest::SHA256;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SharevaultError};

/// Size of a digest in bytes (256 bits).
pub const DIGEST_LEN: usize = 32;

/// SHA-256 fingerprint of a stored ciphertext.
///
/// Serializes as a lowercase hex string, the form callers store it in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FileDigest([u8; DIGEST_LEN]);

impl FileDigest {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a stored hex digest. Anything other than 64 hex characters is
    /// an `IntegrityViolation`: a digest that cannot be read cannot vouch
    /// for a ciphertext.
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| SharevaultError::IntegrityViolation)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileDigest({})", self.to_hex())
    }
}

impl From<FileDigest> for String {
    fn from(d: FileDigest) -> Self {
        d.to_hex()
    }
}

impl TryFrom<String> for FileDigest {
    type Error = SharevaultError;

    fn try_from(s: String) -> Result<Self> {
        Self::from_hex(&s)
    }
}

/// Compute the digest of `data`.
pub fn digest(data: &[u8]) -> FileDigest {
    let d = ring::digest::digest(&SHA256, data);
    let mut bytes = [0u8; DIGEST_LEN];
    bytes.copy_from_slice(d.as_ref());
    FileDigest(bytes)
}

/// Recompute the digest of `data` and compare it with `expected`.
///
/// `false` is a hard stop. Callers must never decrypt data that fails this
/// check.
pub fn verify(data: &[u8], expected: &FileDigest) -> bool {
    digest(data) == *expected
}
