//! Subscriber key material.
//!
//! A push subscriber owns three secrets-or-keys:
//! - a static P-256 key pair used for ECDH with every sender ephemeral key
//! - a 16-byte auth secret shared with the push provider at subscribe time
//! - the application server's ECDSA verification key, learned from the provider
//!
//! Setup happens through [`KeyMaterialBuilder`], which can generate or import
//! the pair and import the verification key in any order. [`KeyMaterialBuilder::build`]
//! only succeeds once everything is present and the key pair and auth secret
//! share an origin; the resulting [`KeyMaterial`] is
//! immutable and can be shared across threads behind an `Arc`.
//!
//! ## Encodings
//!
//! | Value | Raw form | Boundary form |
//! |-------|----------|---------------|
//! | Private scalar | 32 bytes big-endian | base64url, padded |
//! | Public key / verification key | 65-byte uncompressed SEC1 point | base64url, padded |
//! | Auth secret | raw bytes | base64url, padded |
//!
//! Imports accept padded or unpadded base64url.

use crate::random::fill_random;
use crate::{AUTH_SECRET_SIZE, PUBLIC_KEY_SIZE, PushError, SCALAR_SIZE};
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{FieldBytes, PublicKey, SecretKey};
use rand_core::{OsRng, RngCore};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// base64url engine for key import/export: writes padding, accepts either form.
pub const KEY_ENCODING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// SEC1 tag for an uncompressed point.
const UNCOMPRESSED_TAG: u8 = 0x04;

/// Decode a 65-byte uncompressed SEC1 point, rejecting anything off the curve.
///
/// The identity point has no uncompressed encoding, so it is rejected as well.
pub(crate) fn decode_uncompressed_point(bytes: &[u8]) -> Option<PublicKey> {
    if bytes.len() != PUBLIC_KEY_SIZE || bytes[0] != UNCOMPRESSED_TAG {
        return None;
    }
    PublicKey::from_sec1_bytes(bytes).ok()
}

/// Uncompressed SEC1 encoding of a public key.
pub(crate) fn encode_uncompressed_point(public: &PublicKey) -> Vec<u8> {
    public.to_encoded_point(false).as_bytes().to_vec()
}

/// A P-256 key pair: the subscriber's static pair, or a sender's ephemeral one.
///
/// The public point is always `scalar * G`; it is computed once at
/// construction and never set independently.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::RandomFailed`] if the OS CSPRNG fails.
    pub fn generate() -> Result<Self, PushError> {
        // `SecretKey::random` panics if OsRng fails, so check the source first.
        let mut check = [0u8; 1];
        OsRng
            .try_fill_bytes(&mut check)
            .map_err(|_| PushError::RandomFailed)?;
        Ok(Self::from_secret(SecretKey::random(&mut OsRng)))
    }

    /// Reconstruct a key pair from a big-endian scalar.
    ///
    /// Inputs shorter than 32 bytes are treated as integers and left-padded.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::DecodeError`] if the input is empty, longer than 32 bytes,
    /// zero, or not below the P-256 group order.
    pub fn from_scalar_bytes(bytes: &[u8]) -> Result<Self, PushError> {
        if bytes.is_empty() || bytes.len() > SCALAR_SIZE {
            return Err(PushError::DecodeError(format!(
                "private scalar must be 1..={SCALAR_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        let mut padded = [0u8; SCALAR_SIZE];
        padded[SCALAR_SIZE - bytes.len()..].copy_from_slice(bytes);
        let parsed = SecretKey::from_bytes(&FieldBytes::from(padded));
        padded.zeroize();

        parsed.map(Self::from_secret).map_err(|_| {
            PushError::DecodeError("private scalar is zero or not below the curve order".into())
        })
    }

    fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Export the scalar as 32 big-endian bytes.
    ///
    /// # Security
    ///
    /// The returned bytes contain the raw private key. Handle with care.
    #[must_use]
    pub fn to_scalar_bytes(&self) -> [u8; SCALAR_SIZE] {
        let mut out = [0u8; SCALAR_SIZE];
        out.copy_from_slice(&self.secret.to_bytes());
        out
    }

    /// Uncompressed SEC1 encoding of the public point (65 bytes).
    #[must_use]
    pub fn public_key_bytes(&self) -> Vec<u8> {
        encode_uncompressed_point(&self.public)
    }

    /// Base64url (padded) encoding of the private scalar.
    #[must_use]
    pub fn export_private_scalar(&self) -> String {
        let mut raw = self.to_scalar_bytes();
        let encoded = KEY_ENCODING.encode(raw);
        raw.zeroize();
        encoded
    }

    /// Base64url (padded) encoding of the public point.
    #[must_use]
    pub fn export_public_key(&self) -> String {
        KEY_ENCODING.encode(self.public_key_bytes())
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub(crate) fn public(&self) -> &PublicKey {
        &self.public
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.secret == other.secret
    }
}

impl Eq for KeyPair {}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.export_public_key())
            .finish_non_exhaustive()
    }
}

/// Shared authentication secret, mixed into the first HKDF stage.
///
/// Stored verbatim. The length is not checked: a secret of the wrong size
/// still derives keys, they just won't match the sender's.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AuthSecret(Vec<u8>);

impl AuthSecret {
    /// Generate a random 16-byte secret.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::RandomFailed`] if the OS CSPRNG fails.
    pub fn generate() -> Result<Self, PushError> {
        let mut bytes = vec![0u8; AUTH_SECRET_SIZE];
        fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Wrap raw secret bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    /// Raw secret bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Base64url (padded) encoding of the secret.
    #[must_use]
    pub fn export(&self) -> String {
        KEY_ENCODING.encode(&self.0)
    }
}

impl fmt::Debug for AuthSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthSecret(<{} bytes>)", self.0.len())
    }
}

/// The application server's ECDSA P-256 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerificationKey(PublicKey);

impl VerificationKey {
    /// Decode an uncompressed SEC1 point.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::DecodeError`] if the bytes are not a 65-byte
    /// uncompressed point on P-256.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, PushError> {
        decode_uncompressed_point(bytes)
            .map(Self)
            .ok_or_else(|| PushError::DecodeError("verification key is not an uncompressed P-256 point".into()))
    }

    /// Uncompressed SEC1 encoding (65 bytes).
    #[must_use]
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        encode_uncompressed_point(&self.0)
    }

    /// Base64url (padded) encoding of the point.
    #[must_use]
    pub fn export(&self) -> String {
        KEY_ENCODING.encode(self.to_sec1_bytes())
    }

    pub(crate) fn verifying_key(&self) -> p256::ecdsa::VerifyingKey {
        p256::ecdsa::VerifyingKey::from(&self.0)
    }

    pub(crate) fn from_public(public: PublicKey) -> Self {
        Self(public)
    }
}

/// Where a half of the subscriber pair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairSource {
    Generated,
    Imported,
}

/// Setup-phase accumulator for [`KeyMaterial`].
///
/// The key pair and auth secret must both come from [`generate`](Self::generate)
/// or both from the import/set methods; [`build`](Self::build) rejects a mix.
#[derive(Debug, Default, Clone)]
pub struct KeyMaterialBuilder {
    subscriber: Option<KeyPair>,
    auth_secret: Option<AuthSecret>,
    verification_key: Option<VerificationKey>,
    subscriber_source: Option<PairSource>,
    auth_source: Option<PairSource>,
}

impl KeyMaterialBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh key pair and auth secret together.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::RandomFailed`] if the OS CSPRNG fails. On error
    /// the builder is left unchanged.
    pub fn generate(&mut self) -> Result<&mut Self, PushError> {
        let subscriber = KeyPair::generate()?;
        let auth_secret = AuthSecret::generate()?;
        self.subscriber = Some(subscriber);
        self.auth_secret = Some(auth_secret);
        self.subscriber_source = Some(PairSource::Generated);
        self.auth_source = Some(PairSource::Generated);
        Ok(self)
    }

    /// Import a base64url private scalar; the public point is recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::DecodeError`] on bad base64 or an invalid scalar.
    pub fn import_private_scalar(&mut self, encoded: &str) -> Result<&mut Self, PushError> {
        let mut raw = KEY_ENCODING.decode(encoded.trim())?;
        let parsed = KeyPair::from_scalar_bytes(&raw);
        raw.zeroize();
        Ok(self.set_subscriber_key(parsed?))
    }

    /// Import a base64url auth secret, verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::DecodeError`] on bad base64.
    pub fn import_auth_secret(&mut self, encoded: &str) -> Result<&mut Self, PushError> {
        let mut raw = KEY_ENCODING.decode(encoded.trim())?;
        self.set_auth_secret(AuthSecret::from_bytes(&raw));
        raw.zeroize();
        Ok(self)
    }

    /// Import the application server's base64url verification key.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::DecodeError`] on bad base64 or a point not on P-256.
    pub fn import_verification_key(&mut self, encoded: &str) -> Result<&mut Self, PushError> {
        let raw = KEY_ENCODING.decode(encoded.trim())?;
        self.verification_key = Some(VerificationKey::from_sec1_bytes(&raw)?);
        Ok(self)
    }

    /// Install an already-decoded subscriber key pair.
    pub fn set_subscriber_key(&mut self, key: KeyPair) -> &mut Self {
        self.subscriber = Some(key);
        self.subscriber_source = Some(PairSource::Imported);
        self
    }

    /// Install an already-decoded auth secret.
    pub fn set_auth_secret(&mut self, secret: AuthSecret) -> &mut Self {
        self.auth_secret = Some(secret);
        self.auth_source = Some(PairSource::Imported);
        self
    }

    /// Install an already-decoded verification key.
    pub fn set_verification_key(&mut self, key: VerificationKey) -> &mut Self {
        self.verification_key = Some(key);
        self
    }

    /// Subscriber key pair, if generated or imported.
    #[must_use]
    pub fn subscriber(&self) -> Option<&KeyPair> {
        self.subscriber.as_ref()
    }

    /// Auth secret, if generated or imported.
    #[must_use]
    pub fn auth_secret(&self) -> Option<&AuthSecret> {
        self.auth_secret.as_ref()
    }

    /// Verification key, if imported.
    #[must_use]
    pub fn verification_key(&self) -> Option<&VerificationKey> {
        self.verification_key.as_ref()
    }

    /// Finish setup.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::PreconditionViolation`] naming the first missing
    /// component, or if one half of the pair was generated and the other imported.
    pub fn build(self) -> Result<KeyMaterial, PushError> {
        if matches!(
            (self.subscriber_source, self.auth_source),
            (Some(a), Some(b)) if a != b
        ) {
            return Err(PushError::PreconditionViolation(
                "key pair and auth secret from different sources",
            ));
        }

        let subscriber = self
            .subscriber
            .ok_or(PushError::PreconditionViolation("subscriber key pair"))?;
        let auth_secret = self
            .auth_secret
            .ok_or(PushError::PreconditionViolation("auth secret"))?;
        let verification_key = self
            .verification_key
            .ok_or(PushError::PreconditionViolation("verification key"))?;

        Ok(KeyMaterial {
            subscriber,
            auth_secret,
            verification_key,
        })
    }
}

/// Complete, read-only key material for the serving phase.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    subscriber: KeyPair,
    auth_secret: AuthSecret,
    verification_key: VerificationKey,
}

impl KeyMaterial {
    /// Subscriber key pair.
    #[must_use]
    pub fn subscriber(&self) -> &KeyPair {
        &self.subscriber
    }

    /// Shared auth secret.
    #[must_use]
    pub fn auth_secret(&self) -> &AuthSecret {
        &self.auth_secret
    }

    /// Application server verification key.
    #[must_use]
    pub fn verification_key(&self) -> &VerificationKey {
        &self.verification_key
    }

    /// Base64url private scalar.
    #[must_use]
    pub fn export_private_scalar(&self) -> String {
        self.subscriber.export_private_scalar()
    }

    /// Base64url subscriber public key.
    #[must_use]
    pub fn export_public_key(&self) -> String {
        self.subscriber.export_public_key()
    }

    /// Base64url auth secret.
    #[must_use]
    pub fn export_auth_secret(&self) -> String {
        self.auth_secret.export()
    }

    /// Base64url verification key.
    #[must_use]
    pub fn export_verification_key(&self) -> String {
        self.verification_key.export()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Uncompressed encoding of the P-256 generator G.
    const GENERATOR_HEX: &str = "046b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c2964fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5";

    // P-256 group order n.
    const ORDER_HEX: &str = "ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551";

    fn full_builder() -> KeyMaterialBuilder {
        let mut builder = KeyMaterialBuilder::new();
        builder.generate().unwrap();
        let server = KeyPair::generate().unwrap();
        builder.set_verification_key(VerificationKey::from_public(*server.public()));
        builder
    }

    #[test]
    fn test_generate_produces_consistent_pair() {
        let key = KeyPair::generate().unwrap();
        let public = key.public_key_bytes();
        assert_eq!(public.len(), PUBLIC_KEY_SIZE);
        assert_eq!(public[0], 0x04);

        let restored = KeyPair::from_scalar_bytes(&key.to_scalar_bytes()).unwrap();
        assert_eq!(restored.public_key_bytes(), public);
    }

    #[test]
    fn test_scalar_one_maps_to_generator() {
        let key = KeyPair::from_scalar_bytes(&[1]).unwrap();
        assert_eq!(hex::encode(key.public_key_bytes()), GENERATOR_HEX);
        assert_eq!(key.to_scalar_bytes()[31], 1);
        assert!(key.to_scalar_bytes()[..31].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_reject_out_of_range_scalars() {
        let order = hex::decode(ORDER_HEX).unwrap();
        assert!(matches!(
            KeyPair::from_scalar_bytes(&order),
            Err(PushError::DecodeError(_))
        ));
        assert!(KeyPair::from_scalar_bytes(&[0u8; 32]).is_err());
        assert!(KeyPair::from_scalar_bytes(&[0xff; 32]).is_err());
        assert!(KeyPair::from_scalar_bytes(&[]).is_err());
        assert!(KeyPair::from_scalar_bytes(&[1u8; 33]).is_err());
    }

    #[test]
    fn test_order_minus_one_is_accepted() {
        let mut bytes = hex::decode(ORDER_HEX).unwrap();
        bytes[31] -= 1;
        assert!(KeyPair::from_scalar_bytes(&bytes).is_ok());
    }

    #[test]
    fn test_verification_key_rejects_invalid_points() {
        let mut off_curve = hex::decode(GENERATOR_HEX).unwrap();
        off_curve[64] ^= 0x01;
        assert!(VerificationKey::from_sec1_bytes(&off_curve).is_err());

        // Identity encodes as a single zero byte
        assert!(VerificationKey::from_sec1_bytes(&[0x00]).is_err());
        assert!(VerificationKey::from_sec1_bytes(&[0x04; 65]).is_err());

        // Compressed points are not accepted at this boundary
        let generator = hex::decode(GENERATOR_HEX).unwrap();
        let mut compressed = vec![0x02];
        compressed.extend_from_slice(&generator[1..33]);
        assert!(VerificationKey::from_sec1_bytes(&compressed).is_err());

        assert!(VerificationKey::from_sec1_bytes(&generator).is_ok());
    }

    #[test]
    fn test_builder_export_import_roundtrip() {
        let original = full_builder().build().unwrap();

        let mut builder = KeyMaterialBuilder::new();
        builder
            .import_private_scalar(&original.export_private_scalar())
            .unwrap()
            .import_auth_secret(&original.export_auth_secret())
            .unwrap()
            .import_verification_key(&original.export_verification_key())
            .unwrap();
        let restored = builder.build().unwrap();

        assert_eq!(restored.subscriber(), original.subscriber());
        assert_eq!(restored.auth_secret(), original.auth_secret());
        assert_eq!(restored.verification_key(), original.verification_key());
        assert_eq!(restored.export_public_key(), original.export_public_key());
    }

    #[test]
    fn test_import_accepts_unpadded() {
        let secret = AuthSecret::generate().unwrap();
        let padded = secret.export();
        assert!(padded.ends_with("=="));
        let unpadded = padded.trim_end_matches('=');

        let mut builder = KeyMaterialBuilder::new();
        builder.import_auth_secret(unpadded).unwrap();
        assert_eq!(builder.auth_secret(), Some(&secret));
    }

    #[test]
    fn test_auth_secret_length_not_validated() {
        let mut builder = KeyMaterialBuilder::new();
        builder.import_auth_secret("AQID").unwrap();
        assert_eq!(builder.auth_secret().unwrap().as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_import_rejects_bad_base64() {
        let mut builder = KeyMaterialBuilder::new();
        assert!(matches!(
            builder.import_private_scalar("not base64!"),
            Err(PushError::DecodeError(_))
        ));
        assert!(builder.import_verification_key("AAAA").is_err());
        assert!(builder.subscriber().is_none());
        assert!(builder.verification_key().is_none());
    }

    #[test]
    fn test_build_requires_every_component() {
        let mut builder = KeyMaterialBuilder::new();
        builder.generate().unwrap();
        assert_eq!(
            builder.clone().build().unwrap_err(),
            PushError::PreconditionViolation("verification key")
        );

        let mut partial = KeyMaterialBuilder::new();
        partial.import_auth_secret("AAAAAAAAAAAAAAAAAAAAAA").unwrap();
        assert_eq!(
            partial.build().unwrap_err(),
            PushError::PreconditionViolation("subscriber key pair")
        );

        assert!(full_builder().build().is_ok());
    }

    #[test]
    fn test_build_rejects_mixed_pair_sources() {
        let server = KeyPair::generate().unwrap().export_public_key();

        // Generated auth secret next to an imported scalar
        let mut builder = KeyMaterialBuilder::new();
        builder
            .generate()
            .unwrap()
            .import_private_scalar("AQ")
            .unwrap()
            .import_verification_key(&server)
            .unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            PushError::PreconditionViolation("key pair and auth secret from different sources")
        );

        // Imported auth secret next to a generated scalar
        let mut builder = KeyMaterialBuilder::new();
        builder.generate().unwrap();
        builder.set_auth_secret(AuthSecret::from_bytes(&[7; 16]));
        builder.import_verification_key(&server).unwrap();
        assert!(builder.build().is_err());
    }

    #[test]
    fn test_later_generate_or_full_import_replaces_pair() {
        let server = KeyPair::generate().unwrap().export_public_key();

        // Generating after a partial import replaces both halves
        let mut builder = KeyMaterialBuilder::new();
        builder
            .import_private_scalar("AQ")
            .unwrap()
            .generate()
            .unwrap()
            .import_verification_key(&server)
            .unwrap();
        let generated = builder.build().unwrap();
        assert_ne!(generated.subscriber(), &KeyPair::from_scalar_bytes(&[1]).unwrap());

        // Importing both halves after a generate is a consistent import
        let mut builder = KeyMaterialBuilder::new();
        builder
            .generate()
            .unwrap()
            .import_private_scalar("AQ")
            .unwrap()
            .import_auth_secret("AQID")
            .unwrap()
            .import_verification_key(&server)
            .unwrap();
        let imported = builder.build().unwrap();
        assert_eq!(imported.subscriber(), &KeyPair::from_scalar_bytes(&[1]).unwrap());
        assert_eq!(imported.auth_secret().as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let material = full_builder().build().unwrap();
        let debug = format!("{material:?}");
        assert!(!debug.contains(&material.export_private_scalar()));
        assert!(!debug.contains(&material.export_auth_secret()));
    }
}
