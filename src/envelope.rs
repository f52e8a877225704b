//! RSA-OAEP envelopes around per-file keys.
//!
//! A file key is wrapped once per recipient: once for the owner at upload
//! time and once more for each grantee. Every wrapped copy is independent;
//! it opens only with the private key paired to the public key it was
//! wrapped under.
//!
//! Padding: OAEP with SHA-256 as both the label hash and the MGF1 digest,
//! empty label. A 2048-bit recipient gives 256-byte wrapped keys and a
//! maximum payload of 190 bytes.

use std::fmt;

use rand::rngs::OsRng;
use rsa::Oaep;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{EnvelopeOp, KeyKind, Result, SharevaultError};
use crate::keys::{PrivateKeyHandle, PublicKeyHandle, SymmetricKey};

/// Output size of the OAEP hash in bytes.
const OAEP_HASH_LEN: usize = 32;

fn oaep() -> Oaep {
    Oaep::new::<Sha256>()
}

/// A file key encrypted under one recipient's public key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey(Vec<u8>);

impl WrappedKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hex, the form the wrapped key is usually stored in.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        hex::decode(s)
            .map(Self)
            .map_err(|_| SharevaultError::KeyParse(KeyKind::WrappedKey))
    }
}

impl AsRef<[u8]> for WrappedKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for WrappedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedKey").field("len", &self.0.len()).finish()
    }
}

/// Largest payload `wrap` accepts for this recipient.
pub fn max_payload_len(recipient: &PublicKeyHandle) -> usize {
    recipient
        .size_bytes()
        .saturating_sub(2 * OAEP_HASH_LEN + 2)
}

/// Encrypt `payload` for the holder of `recipient`'s private key.
pub fn wrap(payload: &[u8], recipient: &PublicKeyHandle) -> Result<WrappedKey> {
    if payload.len() > max_payload_len(recipient) {
        return Err(SharevaultError::Envelope(EnvelopeOp::Wrap));
    }

    recipient
        .rsa()
        .encrypt(&mut OsRng, oaep(), payload)
        .map(WrappedKey)
        .map_err(|_| SharevaultError::Envelope(EnvelopeOp::Wrap))
}

/// Open a blob produced by `wrap`.
///
/// Wrong key, corruption and truncation all produce the same
/// `Envelope(Unwrap)` error. Decryption is blinded.
pub fn unwrap(blob: &[u8], recipient: &PrivateKeyHandle) -> Result<Zeroizing<Vec<u8>>> {
    if blob.len() != recipient.size_bytes() {
        return Err(SharevaultError::Envelope(EnvelopeOp::Unwrap));
    }

    recipient
        .rsa()
        .decrypt_blinded(&mut OsRng, oaep(), blob)
        .map(Zeroizing::new)
        .map_err(|_| SharevaultError::Envelope(EnvelopeOp::Unwrap))
}

/// Wrap a file key for one recipient.
pub fn wrap_key(key: &SymmetricKey, recipient: &PublicKeyHandle) -> Result<WrappedKey> {
    wrap(key.as_bytes(), recipient)
}

/// Unwrap a file key. A payload that opens but is not exactly one key long
/// is treated like any other unwrap failure.
pub fn unwrap_key(wrapped: &WrappedKey, recipient: &PrivateKeyHandle) -> Result<SymmetricKey> {
    let payload = unwrap(wrapped.as_bytes(), recipient)?;
    SymmetricKey::from_slice(&payload).ok_or(SharevaultError::Envelope(EnvelopeOp::Unwrap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvelopeConfig;
    use crate::keys::generate_key_pair;

    #[test]
    fn wrap_unwrap_roundtrip() {
        let pair = generate_key_pair(&EnvelopeConfig::default()).unwrap();
        let public = pair.load_public().unwrap();
        let private = pair.load_private().unwrap();

        let wrapped = wrap(b"32-byte-file-key-material-here!!", &public).unwrap();
        assert_eq!(wrapped.len(), 256);
        assert_eq!(&unwrap(wrapped.as_bytes(), &private).unwrap()[..], b"32-byte-file-key-material-here!!");
    }

    #[test]
    fn payload_limit() {
        let pair = generate_key_pair(&EnvelopeConfig::default()).unwrap();
        let public = pair.load_public().unwrap();
        assert_eq!(max_payload_len(&public), 190);

        assert!(wrap(&[1u8; 190], &public).is_ok());
        assert!(matches!(
            wrap(&[1u8; 191], &public),
            Err(SharevaultError::Envelope(EnvelopeOp::Wrap))
        ));
    }

    #[test]
    fn wrapping_is_randomised() {
        let pair = generate_key_pair(&EnvelopeConfig::default()).unwrap();
        let public = pair.load_public().unwrap();
        let a = wrap(b"same payload", &public).unwrap();
        let b = wrap(b"same payload", &public).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn truncated_blob_fails() {
        let pair = generate_key_pair(&EnvelopeConfig::default()).unwrap();
        let wrapped = wrap(b"payload", &pair.load_public().unwrap()).unwrap();
        let private = pair.load_private().unwrap();
        assert!(matches!(
            unwrap(&wrapped.as_bytes()[..255], &private),
            Err(SharevaultError::Envelope(EnvelopeOp::Unwrap))
        ));
        assert!(unwrap(&[], &private).is_err());
    }

    #[test]
    fn unwrap_key_rejects_wrong_length_payload() {
        let pair = generate_key_pair(&EnvelopeConfig::default()).unwrap();
        let wrapped = wrap(b"too short for a key", &pair.load_public().unwrap()).unwrap();
        assert!(matches!(
            unwrap_key(&wrapped, &pair.load_private().unwrap()),
            Err(SharevaultError::Envelope(EnvelopeOp::Unwrap))
        ));
    }

    #[test]
    fn hex_storage_form() {
        let wrapped = WrappedKey::from_bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(wrapped.to_hex(), "deadbeef");
        assert_eq!(WrappedKey::from_hex("deadbeef").unwrap(), wrapped);
        assert!(matches!(
            WrappedKey::from_hex("not hex"),
            Err(SharevaultError::KeyParse(KeyKind::WrappedKey))
        ));
    }
}
