//! # Pushsink Crypto
//!
//! Receiver-side cryptography for Web Push messages in the legacy `aesgcm`
//! content encoding, authenticated by a VAPID-style ES256 assertion.
//!
//! This crate provides:
//! - Subscriber key material setup, import and export
//! - `Crypto-Key` / `Encryption` / `Authorization` header parsing
//! - ES256 sender assertion verification (and signing, for tooling)
//! - The `aesgcm` HKDF key schedule from both ends of the exchange
//! - AES-128-GCM payload decryption (and encryption, for tooling)
//! - [`PushReceiver`], the full inbound pipeline
//!
//! ## Cryptographic Suite
//!
//! | Function | Algorithm | Notes |
//! |----------|-----------|-------|
//! | Key Agreement | ECDH P-256 | shared X coordinate, leading zeros stripped |
//! | KDF | HKDF-SHA256 | auth stage, then key and nonce |
//! | AEAD | AES-128-GCM | 12-byte nonce, no AAD |
//! | Assertions | ECDSA P-256 / SHA-256 (ES256) | raw `r \|\| s` signatures |
//!
//! ## Example
//!
//! ```
//! use pushsink_crypto::{AssertionClaims, AssertionSigner, KeyMaterialBuilder, PushReceiver, PushSealer};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), pushsink_crypto::PushError> {
//! let signer = AssertionSigner::generate()?;
//!
//! let mut builder = KeyMaterialBuilder::new();
//! builder.generate()?;
//! builder.set_verification_key(signer.verification_key());
//! let keys = Arc::new(builder.build()?);
//!
//! let sealer = PushSealer::new(
//!     &keys.subscriber().public_key_bytes(),
//!     keys.auth_secret().clone(),
//!     signer,
//! )?;
//! let now = 1_700_000_000;
//! let sealed = sealer.seal(b"hello", &AssertionClaims::valid_for(now, Duration::from_secs(600)))?;
//!
//! let receiver = PushReceiver::new(keys);
//! let push = receiver.receive_at(&sealed.headers, &sealed.body, now)?;
//! assert_eq!(push.plaintext, b"hello");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod aead;
pub mod error;
pub mod headers;
pub mod kdf;
pub mod keys;
pub mod notification;
pub mod random;
pub mod receiver;
pub mod sealer;
pub mod vapid;

pub use error::PushError;
pub use headers::{ParsedHeaders, PushHeaders};
pub use keys::{AuthSecret, KeyMaterial, KeyMaterialBuilder, KeyPair, VerificationKey};
pub use notification::{NotificationId, PushNotification};
pub use receiver::{DecryptedPush, PushReceiver};
pub use sealer::{PushSealer, SealedPush};
pub use vapid::{AssertionClaims, AssertionSigner, AssertionVerifier, VerifiedAssertion};

/// Uncompressed SEC1 P-256 point size
pub const PUBLIC_KEY_SIZE: usize = 65;

/// P-256 private scalar size
pub const SCALAR_SIZE: usize = 32;

/// AES-128-GCM content key size
pub const CONTENT_KEY_SIZE: usize = 16;

/// AES-GCM nonce size
pub const NONCE_SIZE: usize = 12;

/// Auth secret size generated at subscribe time
pub const AUTH_SECRET_SIZE: usize = 16;

/// Per-message salt size generated by senders
pub const SALT_SIZE: usize = 16;
