//! The inbound pipeline: headers and body in, plaintext out.

use crate::aead::decrypt_payload;
use crate::headers::{ParsedHeaders, PushHeaders};
use crate::kdf::derive_for_receiver;
use crate::keys::KeyMaterial;
use crate::vapid::{AssertionVerifier, VerifiedAssertion, unix_now};
use crate::PushError;
use std::sync::Arc;

/// A successfully authenticated and decrypted push message.
#[derive(Debug, Clone, PartialEq)]
pub struct DecryptedPush {
    /// Message bytes with the padding-length prefix removed
    pub plaintext: Vec<u8>,
    /// The sender assertion that authorized the message
    pub assertion: VerifiedAssertion,
}

impl DecryptedPush {
    /// Plaintext as UTF-8, if it is.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.plaintext).ok()
    }
}

/// Runs parse, verify, derive and decrypt for each inbound message.
///
/// Cheap to clone; clones share the same [`KeyMaterial`]. Each call owns its
/// per-message secrets, so a receiver can be used from many threads at once.
#[derive(Debug, Clone)]
pub struct PushReceiver {
    keys: Arc<KeyMaterial>,
    verifier: AssertionVerifier,
}

impl PushReceiver {
    /// Create a receiver over fully set-up key material.
    #[must_use]
    pub fn new(keys: Arc<KeyMaterial>) -> Self {
        let verifier = AssertionVerifier::new(keys.verification_key());
        Self { keys, verifier }
    }

    /// Key material this receiver decrypts with.
    #[must_use]
    pub fn keys(&self) -> &Arc<KeyMaterial> {
        &self.keys
    }

    /// Process one message against the current wall-clock time.
    ///
    /// # Errors
    ///
    /// See [`PushReceiver::receive_at`].
    pub fn receive(&self, headers: &PushHeaders, body: &[u8]) -> Result<DecryptedPush, PushError> {
        self.receive_at(headers, body, unix_now())
    }

    /// Process one message, checking the assertion against `now` (Unix seconds).
    ///
    /// The sender is authenticated before any key agreement happens, so an
    /// unauthenticated request never costs a scalar multiplication.
    ///
    /// # Errors
    ///
    /// - header errors from [`ParsedHeaders::parse`]
    /// - [`PushError::MissingToken`] if no assertion was sent
    /// - assertion errors from [`AssertionVerifier::verify_at`]
    /// - [`PushError::InvalidPeerKey`] for a bad `dh`
    /// - [`PushError::AuthenticationFailed`] / [`PushError::TruncatedPlaintext`]
    ///   from decryption
    pub fn receive_at(
        &self,
        headers: &PushHeaders,
        body: &[u8],
        now: i64,
    ) -> Result<DecryptedPush, PushError> {
        self.process(headers, body, now).inspect_err(|e| {
            tracing::warn!("Rejected push message: {}", e);
        })
    }

    fn process(
        &self,
        headers: &PushHeaders,
        body: &[u8],
        now: i64,
    ) -> Result<DecryptedPush, PushError> {
        let parsed = ParsedHeaders::parse(headers)?;
        tracing::debug!(
            "Parsed push headers: dh {} bytes, salt {} bytes, body {} bytes",
            parsed.dh.len(),
            parsed.salt.len(),
            body.len()
        );

        let token = parsed.token.as_deref().ok_or(PushError::MissingToken)?;
        let assertion = self.verifier.verify_at(token, now)?;
        tracing::debug!(
            "Verified sender assertion (sub: {:?}, exp: {:?})",
            assertion.claims.subject(),
            assertion.claims.exp
        );

        let secrets = derive_for_receiver(&self.keys, &parsed.dh, &parsed.salt)?;
        let plaintext = decrypt_payload(&secrets, body)?;
        tracing::debug!("Decrypted push payload: {} bytes", plaintext.len());

        Ok(DecryptedPush {
            plaintext,
            assertion,
        })
    }
}
