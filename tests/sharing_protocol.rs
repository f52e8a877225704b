use sharevault::{integrity, EnvelopeManager, PrivateKeyPem, SharevaultError};

#[test]
fn test_owner_decrypts_own_upload() {
    let manager = EnvelopeManager::default();
    let owner = manager.generate_key_pair().unwrap();

    let file = manager
        .encrypt_for_owner(b"hello world", &owner.load_public().unwrap())
        .unwrap();

    let plaintext = manager
        .decrypt_for_holder(
            &file.ciphertext,
            &file.owner_wrapped_key,
            &file.digest,
            &owner.load_private().unwrap(),
        )
        .unwrap();
    assert_eq!(plaintext, b"hello world");
}

#[test]
fn test_grantee_decrypts_with_rewrapped_key() {
    let manager = EnvelopeManager::default();
    let owner = manager.generate_key_pair().unwrap();
    let grantee = manager.generate_key_pair().unwrap();
    let plaintext = b"quarterly numbers".repeat(100);

    let file = manager
        .encrypt_for_owner(&plaintext, &owner.load_public().unwrap())
        .unwrap();
    let ciphertext_before = file.ciphertext.clone();

    let grantee_key = manager
        .re_encrypt_key_for_grantee(
            &file.owner_wrapped_key,
            &owner.load_private().unwrap(),
            &grantee.load_public().unwrap(),
        )
        .unwrap();

    // Same file key, different envelope; the body is untouched.
    assert_ne!(grantee_key, file.owner_wrapped_key);
    assert_eq!(file.ciphertext, ciphertext_before);

    let decrypted = manager
        .decrypt_for_holder(
            &file.ciphertext,
            &grantee_key,
            &file.digest,
            &grantee.load_private().unwrap(),
        )
        .unwrap();
    assert_eq!(decrypted, plaintext);

    // The owner cannot open the grantee's envelope.
    let result = manager.decrypt_for_holder(
        &file.ciphertext,
        &grantee_key,
        &file.digest,
        &owner.load_private().unwrap(),
    );
    assert!(matches!(result, Err(SharevaultError::KeyMismatch)));
}

#[test]
fn test_rewrap_with_wrong_owner_key_is_key_mismatch() {
    let manager = EnvelopeManager::default();
    let owner = manager.generate_key_pair().unwrap();
    let impostor = manager.generate_key_pair().unwrap();

    let file = manager
        .encrypt_for_owner(b"data", &owner.load_public().unwrap())
        .unwrap();

    let result = manager.re_encrypt_key_for_grantee(
        &file.owner_wrapped_key,
        &impostor.load_private().unwrap(),
        &impostor.load_public().unwrap(),
    );
    assert!(matches!(result, Err(SharevaultError::KeyMismatch)));
}

#[test]
fn test_tampered_ciphertext_fails_before_any_key_operation() {
    let manager = EnvelopeManager::default();
    let owner = manager.generate_key_pair().unwrap();
    let stranger = manager.generate_key_pair().unwrap();

    let mut file = manager
        .encrypt_for_owner(b"do not touch", &owner.load_public().unwrap())
        .unwrap();
    let last = file.ciphertext.len() - 1;
    file.ciphertext[last] ^= 0x01;

    // With the wrong holder key, an unwrap attempt would report KeyMismatch.
    // IntegrityViolation proves the digest check ran first.
    let result = manager.decrypt_for_holder(
        &file.ciphertext,
        &file.owner_wrapped_key,
        &file.digest,
        &stranger.load_private().unwrap(),
    );
    assert!(matches!(result, Err(SharevaultError::IntegrityViolation)));

    // Likewise an unparseable key is never read.
    let result = manager.decrypt_for_holder_pem(
        &file.ciphertext,
        &file.owner_wrapped_key,
        &file.digest,
        &PrivateKeyPem::new("not a pem"),
    );
    assert!(matches!(result, Err(SharevaultError::IntegrityViolation)));
}

#[test]
fn test_digest_from_storage_hex_still_verifies() {
    let manager = EnvelopeManager::default();
    let owner = manager.generate_key_pair().unwrap();
    let file = manager
        .encrypt_for_owner(b"stored as text", &owner.load_public().unwrap())
        .unwrap();

    let stored_digest = integrity::FileDigest::from_hex(&file.digest.to_hex()).unwrap();
    let plaintext = manager
        .decrypt_for_holder_pem(
            &file.ciphertext,
            &file.owner_wrapped_key,
            &stored_digest,
            owner.private_key(),
        )
        .unwrap();
    assert_eq!(plaintext, b"stored as text");
}

#[test]
fn test_rewrap_cost_does_not_depend_on_file_size() {
    // Re-wrapping takes only the owner's wrapped key: the same call serves
    // a 1-byte file and a 1 MiB file.
    let manager = EnvelopeManager::default();
    let owner = manager.generate_key_pair().unwrap();
    let grantee = manager.generate_key_pair().unwrap();
    let owner_private = owner.load_private().unwrap();
    let grantee_public = grantee.load_public().unwrap();

    for size in [1usize, 1 << 20] {
        let file = manager
            .encrypt_for_owner(&vec![7u8; size], &owner.load_public().unwrap())
            .unwrap();
        let wrapped = manager
            .re_encrypt_key_for_grantee(&file.owner_wrapped_key, &owner_private, &grantee_public)
            .unwrap();
        assert_eq!(wrapped.len(), file.owner_wrapped_key.len());
        assert_eq!(
            manager
                .decrypt_for_holder(
                    &file.ciphertext,
                    &wrapped,
                    &file.digest,
                    &grantee.load_private().unwrap()
                )
                .unwrap()
                .len(),
            size
        );
    }
}
