//! Fuzz target for key derivation and payload decryption
//!
//! Arbitrary `dh`, salt and body against fixed subscriber keys.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pushsink_crypto::aead::{decrypt_payload, encrypt_payload};
use pushsink_crypto::kdf::{ContentSecrets, derive_for_receiver};
use pushsink_crypto::{AuthSecret, KeyMaterial, KeyMaterialBuilder, KeyPair, VerificationKey};
use std::sync::LazyLock;

static KEYS: LazyLock<KeyMaterial> = LazyLock::new(|| {
    let subscriber = KeyPair::from_scalar_bytes(&[0x11; 32]).expect("valid scalar");
    let server = KeyPair::from_scalar_bytes(&[0x22; 32]).expect("valid scalar");
    let mut builder = KeyMaterialBuilder::new();
    builder
        .set_subscriber_key(subscriber)
        .set_auth_secret(AuthSecret::from_bytes(&[0x33; 16]))
        .set_verification_key(
            VerificationKey::from_sec1_bytes(&server.public_key_bytes()).expect("valid point"),
        );
    builder.build().expect("complete key material")
});

#[derive(Debug, Arbitrary)]
struct DecryptInput {
    dh: Vec<u8>,
    salt: Vec<u8>,
    body: Vec<u8>,
    key: [u8; 16],
    nonce: [u8; 12],
    padding: u8,
}

fuzz_target!(|input: DecryptInput| {
    if let Ok(secrets) = derive_for_receiver(&KEYS, &input.dh, &input.salt) {
        let _ = decrypt_payload(&secrets, &input.body);
    }

    // Encrypt/decrypt under arbitrary secrets must round-trip
    let secrets = ContentSecrets::new(input.key, input.nonce);
    if let Ok(ciphertext) = encrypt_payload(&secrets, &input.body, u16::from(input.padding)) {
        let plaintext = decrypt_payload(&secrets, &ciphertext).expect("roundtrip");
        assert_eq!(plaintext.len(), usize::from(input.padding) + input.body.len());
        assert!(plaintext.ends_with(&input.body));
    }
    let _ = decrypt_payload(&secrets, &input.body);
});
