//! Fuzz target for sender assertion verification
//!
//! Feeds arbitrary bytes to the ES256 verifier; nothing may panic and
//! nothing may verify without the signing key.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pushsink_crypto::{AssertionVerifier, KeyPair, VerificationKey};
use std::sync::LazyLock;

static VERIFIER: LazyLock<AssertionVerifier> = LazyLock::new(|| {
    let pair = KeyPair::from_scalar_bytes(&[0x5a; 32]).expect("valid scalar");
    let key = VerificationKey::from_sec1_bytes(&pair.public_key_bytes()).expect("valid point");
    AssertionVerifier::new(&key)
});

fuzz_target!(|data: &[u8]| {
    assert!(VERIFIER.verify_at(data, 1_700_000_000).is_err());
});
