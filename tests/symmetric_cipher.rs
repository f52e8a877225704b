use proptest::prelude::*;

use sharevault::crypto::{self, BLOCK_LEN, IV_LEN, KEY_LEN};
use sharevault::{SharevaultError, SymmetricKey};

proptest! {
    #[test]
    fn decrypt_inverts_encrypt(
        plaintext in proptest::collection::vec(any::<u8>(), 0..2048),
        key in any::<[u8; KEY_LEN]>(),
    ) {
        let key = SymmetricKey::from_bytes(key);
        let blob = crypto::encrypt(&key, &plaintext).unwrap();
        prop_assert_eq!(blob.len(), crypto::ciphertext_len(plaintext.len()));
        prop_assert_eq!(crypto::decrypt(&key, &blob).unwrap(), plaintext);
    }

    #[test]
    fn repeated_encryption_differs(plaintext in proptest::collection::vec(any::<u8>(), 0..256)) {
        let key = crypto::generate_key().unwrap();
        let first = crypto::encrypt(&key, &plaintext).unwrap();
        let second = crypto::encrypt(&key, &plaintext).unwrap();

        prop_assert_ne!(&first, &second);
        prop_assert_eq!(crypto::decrypt(&key, &first).unwrap(), plaintext.clone());
        prop_assert_eq!(crypto::decrypt(&key, &second).unwrap(), plaintext);
    }
}

#[test]
fn block_aligned_plaintext_strips_exactly_one_block() {
    let key = crypto::generate_key().unwrap();
    for blocks in 1..=4 {
        let plaintext = vec![BLOCK_LEN as u8; blocks * BLOCK_LEN];
        let blob = crypto::encrypt(&key, &plaintext).unwrap();

        assert_eq!(blob.len(), IV_LEN + (blocks + 1) * BLOCK_LEN);
        assert_eq!(crypto::decrypt(&key, &blob).unwrap(), plaintext);
    }
}

#[test]
fn out_of_range_padding_is_rejected_not_ignored() {
    // Encrypt a hand-padded final block whose last byte claims 0x20 bytes of
    // padding: more than one block. Strip the real padding block so the
    // forged byte is what decrypt sees.
    let key = SymmetricKey::from_bytes([9u8; KEY_LEN]);
    let mut forged = [0x41u8; BLOCK_LEN];
    forged[BLOCK_LEN - 1] = 0x20;

    let mut blob = crypto::encrypt(&key, &forged).unwrap();
    blob.truncate(IV_LEN + BLOCK_LEN);

    assert!(matches!(crypto::decrypt(&key, &blob), Err(SharevaultError::Decryption)));
}

#[test]
fn zero_padding_byte_is_rejected() {
    let key = SymmetricKey::from_bytes([3u8; KEY_LEN]);
    let mut forged = [0x41u8; BLOCK_LEN];
    forged[BLOCK_LEN - 1] = 0x00;

    let mut blob = crypto::encrypt(&key, &forged).unwrap();
    blob.truncate(IV_LEN + BLOCK_LEN);

    assert!(matches!(crypto::decrypt(&key, &blob), Err(SharevaultError::Decryption)));
}

#[test]
fn blob_shorter_than_iv_is_rejected() {
    let key = crypto::generate_key().unwrap();
    for len in 0..IV_LEN {
        assert!(matches!(
            crypto::decrypt(&key, &vec![0u8; len]),
            Err(SharevaultError::Decryption)
        ));
    }
}
