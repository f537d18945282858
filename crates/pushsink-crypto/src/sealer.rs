//! Sender side of an `aesgcm` push, used by tooling and tests to produce
//! messages a [`PushReceiver`](crate::receiver::PushReceiver) accepts.

use crate::aead::encrypt_payload;
use crate::headers::{AESGCM_ENCODING, PushHeaders, WEBPUSH_AUTH_PREFIX};
use crate::kdf::derive_for_sender;
use crate::keys::{AuthSecret, KeyPair, decode_uncompressed_point};
use crate::random::fill_random;
use crate::vapid::{AssertionClaims, AssertionSigner};
use crate::{PushError, SALT_SIZE};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Headers and body of one encrypted push request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPush {
    /// Request headers
    pub headers: PushHeaders,
    /// AEAD ciphertext with the tag appended
    pub body: Vec<u8>,
}

/// Encrypts and signs messages for one subscription.
#[derive(Debug, Clone)]
pub struct PushSealer {
    receiver_public: Vec<u8>,
    auth_secret: AuthSecret,
    signer: AssertionSigner,
}

impl PushSealer {
    /// Target the subscriber with uncompressed public key `receiver_public`.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::InvalidPeerKey`] if the key is not an uncompressed P-256 point.
    pub fn new(
        receiver_public: &[u8],
        auth_secret: AuthSecret,
        signer: AssertionSigner,
    ) -> Result<Self, PushError> {
        decode_uncompressed_point(receiver_public).ok_or(PushError::InvalidPeerKey)?;
        Ok(Self {
            receiver_public: receiver_public.to_vec(),
            auth_secret,
            signer,
        })
    }

    /// The signer whose key the receiver must trust.
    #[must_use]
    pub fn signer(&self) -> &AssertionSigner {
        &self.signer
    }

    /// Seal `message` with a fresh ephemeral key, a random salt and no padding.
    ///
    /// # Errors
    ///
    /// - [`PushError::RandomFailed`] if the OS CSPRNG fails
    /// - any error from [`PushSealer::seal_with`]
    pub fn seal(&self, message: &[u8], claims: &AssertionClaims) -> Result<SealedPush, PushError> {
        let ephemeral = KeyPair::generate()?;
        let mut salt = [0u8; SALT_SIZE];
        fill_random(&mut salt)?;
        self.seal_with(&ephemeral, &salt, message, 0, claims)
    }

    /// Seal with caller-chosen ephemeral key, salt and padding.
    ///
    /// Reusing an ephemeral key and salt pair for two messages reuses the
    /// AES-GCM nonce; only do it for reproducible test inputs.
    ///
    /// # Errors
    ///
    /// - [`PushError::KeyDerivationFailed`] / [`PushError::EncryptionFailed`]
    /// - [`PushError::DecodeError`] if the claims cannot be serialized
    pub fn seal_with(
        &self,
        ephemeral: &KeyPair,
        salt: &[u8],
        message: &[u8],
        padding: u16,
        claims: &AssertionClaims,
    ) -> Result<SealedPush, PushError> {
        let (secrets, dh) =
            derive_for_sender(ephemeral, &self.receiver_public, &self.auth_secret, salt)?;
        let body = encrypt_payload(&secrets, message, padding)?;
        let token = self.signer.sign(claims)?;

        let server_key = URL_SAFE_NO_PAD.encode(self.signer.verification_key().to_sec1_bytes());
        let headers = PushHeaders {
            content_encoding: Some(AESGCM_ENCODING.to_string()),
            crypto_key: Some(format!(
                "dh={};p256ecdsa={server_key}",
                URL_SAFE_NO_PAD.encode(dh)
            )),
            encryption: Some(format!("salt={}", URL_SAFE_NO_PAD.encode(salt))),
            authorization: Some(format!("{WEBPUSH_AUTH_PREFIX}{token}")),
        };

        tracing::debug!(
            "Sealed push message: {} plaintext bytes, {} body bytes",
            message.len(),
            body.len()
        );
        Ok(SealedPush { headers, body })
    }
}
