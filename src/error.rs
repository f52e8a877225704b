//! Error types for sharevault.
//!
//! Every error variant is a distinct failure mode in the envelope protocol.
//! Error messages are intentionally minimal. They signal *what* failed
//! without revealing *why* in ways that could leak cryptographic state.

use std::fmt;

use thiserror::Error;

use crate::vault::FileId;

/// Which kind of serialized key material failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Public,
    Private,
    WrappedKey,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public key"),
            Self::Private => write!(f, "private key"),
            Self::WrappedKey => write!(f, "wrapped key"),
        }
    }
}

/// The direction of a failed envelope operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeOp {
    Wrap,
    Unwrap,
}

impl fmt::Display for EnvelopeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wrap => write!(f, "wrap"),
            Self::Unwrap => write!(f, "unwrap"),
        }
    }
}

/// The single error type for all sharevault operations.
#[derive(Debug, Error)]
pub enum SharevaultError {
    /// RSA key pair generation failed. Only an entropy or library failure
    /// produces this.
    #[error("key generation failed")]
    KeyGeneration,

    /// Serialized key material could not be parsed.
    #[error("malformed {0}")]
    KeyParse(KeyKind),

    /// An RSA-OAEP wrap or unwrap failed. Covers both "wrong key" and
    /// "corrupted blob" without saying which.
    #[error("envelope {0} failed")]
    Envelope(EnvelopeOp),

    /// The ciphertext digest did not match the stored digest. Always fatal.
    #[error("integrity check failed")]
    IntegrityViolation,

    /// Symmetric encryption failed.
    #[error("encryption failed")]
    Encryption,

    /// Symmetric decryption failed: truncated blob, misaligned body, or
    /// invalid padding.
    #[error("decryption failed")]
    Decryption,

    /// A wrapped key could not be opened with the supplied private key.
    /// Raised by the orchestration layer so callers can tell "no access"
    /// apart from "data corrupted".
    #[error("wrapped key does not match the supplied private key")]
    KeyMismatch,

    /// The system's random number generator failed to produce bytes.
    #[error("randomness source failed")]
    RandomnessFailure,

    /// Configuration values were rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("user already exists: {0}")]
    UserAlreadyExists(String),

    #[error("file not found: {0}")]
    FileNotFound(FileId),

    #[error("no grant on file {file_id} for {grantee}")]
    GrantNotFound { file_id: FileId, grantee: String },

    /// The caller is neither the owner nor a grantee of the file.
    #[error("access denied")]
    AccessDenied,

    #[error("invalid grant: {0}")]
    InvalidGrant(String),
}

impl SharevaultError {
    /// Returns true for failures a caller should record as a security event
    /// rather than an ordinary error.
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            Self::IntegrityViolation | Self::KeyMismatch | Self::AccessDenied
        )
    }
}

pub type Result<T> = std::result::Result<T, SharevaultError>;
