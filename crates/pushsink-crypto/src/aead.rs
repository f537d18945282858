//! AES-128-GCM payload encryption for the `aesgcm` content encoding.
//!
//! The body of an `aesgcm` push is a single AEAD record with the 16-byte tag
//! appended and no associated data. The plaintext inside the record is
//!
//! ```text
//! u16be(padding_len) || padding_len zero bytes || message
//! ```
//!
//! ## Padding prefix
//!
//! [`decrypt_payload`] removes the 2-byte length prefix and nothing else:
//! any padding bytes the prefix announces stay at the front of the returned
//! message. Existing receivers depend on this exact output.

use crate::kdf::ContentSecrets;
use crate::PushError;
use aes_gcm::Aes128Gcm;
use aes_gcm::aead::{Aead, KeyInit};

/// Authentication tag size (16 bytes / 128 bits).
pub const TAG_SIZE: usize = 16;

/// Size of the big-endian padding-length prefix.
pub const PADDING_PREFIX_SIZE: usize = 2;

fn cipher(secrets: &ContentSecrets) -> Aes128Gcm {
    Aes128Gcm::new(secrets.key().into())
}

/// Authenticate and decrypt a push body, then strip the padding-length prefix.
///
/// # Errors
///
/// - [`PushError::AuthenticationFailed`] if the tag does not verify. Tampering
///   and a key derived from the wrong inputs look the same here.
/// - [`PushError::TruncatedPlaintext`] if the plaintext is shorter than the prefix
pub fn decrypt_payload(secrets: &ContentSecrets, ciphertext: &[u8]) -> Result<Vec<u8>, PushError> {
    if ciphertext.len() < TAG_SIZE {
        return Err(PushError::AuthenticationFailed);
    }

    let mut plaintext = cipher(secrets)
        .decrypt(secrets.nonce().into(), ciphertext)
        .map_err(|_| PushError::AuthenticationFailed)?;

    if plaintext.len() < PADDING_PREFIX_SIZE {
        return Err(PushError::TruncatedPlaintext);
    }
    plaintext.drain(..PADDING_PREFIX_SIZE);
    Ok(plaintext)
}

/// Pad and encrypt a message the way an `aesgcm` sender does.
///
/// Returns ciphertext with the tag appended
/// (`2 + padding + message.len() + 16` bytes).
///
/// # Errors
///
/// Returns [`PushError::EncryptionFailed`] if AEAD encryption fails.
pub fn encrypt_payload(
    secrets: &ContentSecrets,
    message: &[u8],
    padding: u16,
) -> Result<Vec<u8>, PushError> {
    let pad = usize::from(padding);
    let mut plaintext = Vec::with_capacity(PADDING_PREFIX_SIZE + pad + message.len());
    plaintext.extend_from_slice(&padding.to_be_bytes());
    plaintext.resize(PADDING_PREFIX_SIZE + pad, 0);
    plaintext.extend_from_slice(message);

    cipher(secrets)
        .encrypt(secrets.nonce().into(), plaintext.as_slice())
        .map_err(|_| PushError::EncryptionFailed)
}
