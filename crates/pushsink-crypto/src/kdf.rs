//! `aesgcm` content-encoding key schedule.
//!
//! For every message the receiver combines its static key pair with the
//! sender's ephemeral public key (`dh`) and the per-message `salt`:
//!
//! ```text
//! secret  = X(ephemeral * static)              (big-endian, leading zeros stripped)
//! context = "P-256\0" || u16(len(ua)) || ua || u16(len(dh)) || dh
//! prk     = HKDF(salt = auth,  ikm = secret, info = "Content-Encoding: auth\0",            L = 32)
//! key     = HKDF(salt = salt,  ikm = prk,    info = "Content-Encoding: aesgcm\0" || context, L = 16)
//! nonce   = HKDF(salt = salt,  ikm = prk,    info = "Content-Encoding: nonce\0"  || context, L = 12)
//! ```
//!
//! where `ua` is the receiver's uncompressed public key. The stripped
//! leading zeros in `secret` are a wire-compatibility requirement; see
//! [`unpadded_shared_secret`].

use crate::keys::{AuthSecret, KeyMaterial, KeyPair, decode_uncompressed_point};
use crate::{CONTENT_KEY_SIZE, NONCE_SIZE, PushError};
use hkdf::Hkdf;
use p256::{PublicKey, SecretKey};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Curve label opening the context string.
const CONTEXT_LABEL: &[u8] = b"P-256\0";

/// Length of the intermediate key produced by the auth stage.
const AUTH_STAGE_SIZE: usize = 32;

/// HKDF `info` for a content-encoding stage: `"Content-Encoding: <kind>\0" || context`.
fn content_encoding_info(kind: &str, context: &[u8]) -> Vec<u8> {
    let mut info = Vec::with_capacity(19 + kind.len() + context.len());
    info.extend_from_slice(b"Content-Encoding: ");
    info.extend_from_slice(kind.as_bytes());
    info.push(0);
    info.extend_from_slice(context);
    info
}

/// HKDF-SHA256 extract-then-expand into `output`.
///
/// # Errors
///
/// Returns [`PushError::KeyDerivationFailed`] if `output` exceeds 255 * 32 bytes.
pub fn hkdf_sha256(salt: &[u8], ikm: &[u8], info: &[u8], output: &mut [u8]) -> Result<(), PushError> {
    Hkdf::<Sha256>::new(Some(salt), ikm)
        .expand(info, output)
        .map_err(|_| PushError::KeyDerivationFailed)
}

/// Strip leading zero bytes from a big-endian integer encoding.
///
/// The reference derivation serializes the ECDH X coordinate as a minimal
/// big-endian integer, not as a fixed 32-byte field element. Roughly one
/// message in 256 has a leading zero byte, and zero-padding it here would
/// derive different keys from the sender.
#[must_use]
pub fn unpadded_shared_secret(x_coordinate: &[u8]) -> &[u8] {
    let start = x_coordinate
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(x_coordinate.len());
    &x_coordinate[start..]
}

/// ECDH shared secret in its unpadded wire form.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    /// Agree with a peer given its uncompressed SEC1 public key.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::InvalidPeerKey`] if `peer_public` is not an uncompressed P-256 point.
    pub fn agree(ours: &KeyPair, peer_public: &[u8]) -> Result<Self, PushError> {
        let peer = decode_uncompressed_point(peer_public).ok_or(PushError::InvalidPeerKey)?;
        Ok(Self::compute(ours.secret(), &peer))
    }

    /// Compute `X(peer * secret)` with leading zeros stripped.
    pub(crate) fn compute(secret: &SecretKey, peer: &PublicKey) -> Self {
        let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
        Self(unpadded_shared_secret(shared.raw_secret_bytes()).to_vec())
    }

    /// Secret bytes.
    ///
    /// # Security
    ///
    /// Feed these only into the HKDF chain.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Build the context string binding both public keys.
///
/// # Errors
///
/// Returns [`PushError::InvalidPeerKey`] if either key is longer than a
/// 16-bit length prefix can describe.
pub fn build_context(receiver_public: &[u8], sender_public: &[u8]) -> Result<Vec<u8>, PushError> {
    let receiver_len =
        u16::try_from(receiver_public.len()).map_err(|_| PushError::InvalidPeerKey)?;
    let sender_len = u16::try_from(sender_public.len()).map_err(|_| PushError::InvalidPeerKey)?;

    let mut context =
        Vec::with_capacity(CONTEXT_LABEL.len() + 4 + receiver_public.len() + sender_public.len());
    context.extend_from_slice(CONTEXT_LABEL);
    context.extend_from_slice(&receiver_len.to_be_bytes());
    context.extend_from_slice(receiver_public);
    context.extend_from_slice(&sender_len.to_be_bytes());
    context.extend_from_slice(sender_public);
    Ok(context)
}

/// AES-128-GCM key and nonce for a single message.
///
/// Never cached: every message derives its own.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ContentSecrets {
    key: [u8; CONTENT_KEY_SIZE],
    nonce: [u8; NONCE_SIZE],
}

impl ContentSecrets {
    /// Wrap an explicit key and nonce.
    #[must_use]
    pub fn new(key: [u8; CONTENT_KEY_SIZE], nonce: [u8; NONCE_SIZE]) -> Self {
        Self { key, nonce }
    }

    /// Content encryption key.
    #[must_use]
    pub fn key(&self) -> &[u8; CONTENT_KEY_SIZE] {
        &self.key
    }

    /// GCM nonce.
    #[must_use]
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }
}

impl std::fmt::Debug for ContentSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentSecrets(<redacted>)")
    }
}

/// Run the HKDF chain from an already computed shared secret and context.
///
/// # Errors
///
/// Returns [`PushError::KeyDerivationFailed`] if HKDF rejects an output length.
pub fn derive_content_secrets(
    shared: &SharedSecret,
    context: &[u8],
    auth_secret: &AuthSecret,
    salt: &[u8],
) -> Result<ContentSecrets, PushError> {
    let mut prk = [0u8; AUTH_STAGE_SIZE];
    hkdf_sha256(
        auth_secret.as_bytes(),
        shared.as_bytes(),
        &content_encoding_info("auth", &[]),
        &mut prk,
    )?;

    let mut secrets = ContentSecrets::new([0u8; CONTENT_KEY_SIZE], [0u8; NONCE_SIZE]);
    let result = hkdf_sha256(
        salt,
        &prk,
        &content_encoding_info("aesgcm", context),
        &mut secrets.key,
    )
    .and_then(|()| {
        hkdf_sha256(
            salt,
            &prk,
            &content_encoding_info("nonce", context),
            &mut secrets.nonce,
        )
    });
    prk.zeroize();

    result.map(|()| secrets)
}

/// Receiver side: derive the content key and nonce for an inbound message.
///
/// # Errors
///
/// - [`PushError::InvalidPeerKey`] if `dh` is not an uncompressed P-256 point
/// - [`PushError::KeyDerivationFailed`] if HKDF rejects an output length
pub fn derive_for_receiver(
    keys: &KeyMaterial,
    dh: &[u8],
    salt: &[u8],
) -> Result<ContentSecrets, PushError> {
    let peer = decode_uncompressed_point(dh).ok_or(PushError::InvalidPeerKey)?;
    let subscriber = keys.subscriber();

    let shared = SharedSecret::compute(subscriber.secret(), &peer);
    let context = build_context(&subscriber.public_key_bytes(), dh)?;

    derive_content_secrets(&shared, &context, keys.auth_secret(), salt)
}

/// Sender side: derive the same key and nonce from an ephemeral key pair.
///
/// Returns the secrets together with the ephemeral public key to send as `dh`.
///
/// # Errors
///
/// - [`PushError::InvalidPeerKey`] if `receiver_public` is not an uncompressed P-256 point
/// - [`PushError::KeyDerivationFailed`] if HKDF rejects an output length
pub fn derive_for_sender(
    ephemeral: &KeyPair,
    receiver_public: &[u8],
    auth_secret: &AuthSecret,
    salt: &[u8],
) -> Result<(ContentSecrets, Vec<u8>), PushError> {
    let receiver = decode_uncompressed_point(receiver_public).ok_or(PushError::InvalidPeerKey)?;
    let dh = ephemeral.public_key_bytes();

    let shared = SharedSecret::compute(ephemeral.secret(), &receiver);
    let context = build_context(receiver_public, &dh)?;

    let secrets = derive_content_secrets(&shared, &context, auth_secret, salt)?;
    Ok((secrets, dh))
}
