//! Symmetric encryption of file bodies.
//!
//! All file bodies are encrypted through the functions exposed here; no
//! other module touches the block cipher.
//!
//! Primitive choices:
//! - **Cipher**: AES-256 in CBC mode
//! - **Padding**: PKCS#7, always 1..=16 bytes (a full block when aligned)
//! - **IV**: 128-bit (16 bytes), generated fresh per operation via `SystemRandom`
//! - **Key size**: 256 bits (32 bytes)
//!
//! CBC carries no authentication tag. Tamper detection for stored bodies is
//! the job of `integrity`, which must run before `decrypt`.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{Result, SharevaultError};
use crate::keys::SymmetricKey;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Cipher block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// Size of the IV in bytes. Equal to the block size.
pub const IV_LEN: usize = BLOCK_LEN;

/// Size of a file key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Fill a fixed-size buffer from `ring::rand::SystemRandom`, the only source
/// of symmetric randomness in the crate.
fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let rng = SystemRandom::new();
    let mut buf = [0u8; N];
    rng.fill(&mut buf)
        .map_err(|_| SharevaultError::RandomnessFailure)?;
    Ok(buf)
}

/// Generate a fresh per-file key.
pub fn generate_key() -> Result<SymmetricKey> {
    Ok(SymmetricKey::from_bytes(random_bytes::<KEY_LEN>()?))
}

/// Length of the blob `encrypt` produces for a plaintext of `plaintext_len`
/// bytes.
pub fn ciphertext_len(plaintext_len: usize) -> usize {
    IV_LEN + (plaintext_len / BLOCK_LEN + 1) * BLOCK_LEN
}

/// Encrypt a plaintext payload using AES-256-CBC.
///
/// Returns the IV prepended to the ciphertext. A fresh IV is drawn for every
/// call, so encrypting the same plaintext twice under the same key gives
/// different output.
///
/// # Layout of returned bytes
/// ```text
/// [ IV (16 bytes) ][ AES-256-CBC(plaintext ‖ PKCS#7 padding) ]
/// ```
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let iv = random_bytes::<IV_LEN>()?;
    let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
        .map_err(|_| SharevaultError::Encryption)?;

    let body = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut output = Vec::with_capacity(IV_LEN + body.len());
    output.extend_from_slice(&iv);
    output.extend_from_slice(&body);
    Ok(output)
}

/// Decrypt a blob produced by `encrypt`.
///
/// Fails with `Decryption` if the blob is shorter than the IV, if the body
/// is not a whole number of blocks, or if the padding is malformed. Any pad
/// byte outside `1..=16`, or pad bytes that disagree with each other, is an
/// error; the plaintext is never returned with padding partially stripped.
pub fn decrypt(key: &SymmetricKey, blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < IV_LEN {
        return Err(SharevaultError::Decryption);
    }

    let (iv, body) = blob.split_at(IV_LEN);
    if body.is_empty() || body.len() % BLOCK_LEN != 0 {
        return Err(SharevaultError::Decryption);
    }

    let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), iv)
        .map_err(|_| SharevaultError::Decryption)?;

    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(body)
        .map_err(|_| SharevaultError::Decryption)
}
