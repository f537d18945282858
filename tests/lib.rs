//! Shared fixtures for pushsink integration tests.

use pushsink_crypto::{
    AssertionClaims, AssertionSigner, KeyMaterial, KeyMaterialBuilder, PushReceiver, PushSealer,
};
use std::sync::Arc;
use std::time::Duration;

/// Fixed clock used by tests that pin assertion validity.
pub const NOW: i64 = 1_700_000_000;

/// One subscription: the receiver's keys and a sender that targets them.
pub struct Subscription {
    /// Shared subscriber key material
    pub keys: Arc<KeyMaterial>,
    /// Receiver over `keys`
    pub receiver: PushReceiver,
    /// Sender trusted by `receiver`
    pub sealer: PushSealer,
}

impl Subscription {
    /// Generate fresh subscriber keys and a trusted signer.
    ///
    /// # Panics
    ///
    /// Panics if the OS CSPRNG fails.
    #[must_use]
    pub fn generate() -> Self {
        let signer = AssertionSigner::generate().expect("signer");
        let mut builder = KeyMaterialBuilder::new();
        builder.generate().expect("subscriber keys");
        builder.set_verification_key(signer.verification_key());
        let keys = Arc::new(builder.build().expect("complete key material"));

        let sealer = PushSealer::new(
            &keys.subscriber().public_key_bytes(),
            keys.auth_secret().clone(),
            signer,
        )
        .expect("valid subscriber key");
        let receiver = PushReceiver::new(Arc::clone(&keys));

        Self {
            keys,
            receiver,
            sealer,
        }
    }
}

/// Claims valid for an hour from [`NOW`].
#[must_use]
pub fn claims() -> AssertionClaims {
    AssertionClaims::valid_for(NOW, Duration::from_secs(3600))
        .with_claim("aud", "https://push.example.net")
        .with_claim("sub", "mailto:ops@example.com")
}
