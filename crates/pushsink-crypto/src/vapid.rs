//! VAPID-style sender assertions (ES256 JWT).
//!
//! The application server signs a short-lived JWT with its P-256 key and
//! sends it as `Authorization: WebPush <jwt>`. The receiver checks it against
//! the verification key it learned when subscribing:
//!
//! 1. three base64url segments `header.claims.signature`
//! 2. header `alg` is `ES256`
//! 3. ECDSA P-256/SHA-256 over the ASCII bytes `header.claims`, with the
//!    signature in raw 64-byte `r || s` form (not DER)
//! 4. `iat <= now` when present, `exp > now` (a missing `exp` counts as expired)
//!
//! Only the two time claims are interpreted; everything else is handed back
//! for logging.

use crate::keys::{KeyPair, VerificationKey};
use crate::PushError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The only accepted JWT algorithm.
pub const ES256: &str = "ES256";

/// Raw `r || s` signature size.
pub const SIGNATURE_SIZE: usize = 64;

/// Current wall-clock time in Unix seconds.
#[must_use]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

/// JWT header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionHeader {
    /// Signature algorithm
    pub alg: String,
    /// Token type, usually `JWT`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// JWT claim set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issued-at, Unix seconds
    #[serde(default, deserialize_with = "numeric_date", skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiry, Unix seconds
    #[serde(default, deserialize_with = "numeric_date", skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Every other claim (`aud`, `sub`, ...), uninterpreted
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Accept integral or fractional NumericDate values.
fn numeric_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Option::<serde_json::Number>::deserialize(deserializer)?
        .map(|n| {
            n.as_i64()
                // Fractional dates truncate toward zero
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| D::Error::custom("numeric date out of range"))
        })
        .transpose()
}

impl AssertionClaims {
    /// Claims valid from `issued_at` for `ttl`.
    #[must_use]
    pub fn valid_for(issued_at: i64, ttl: Duration) -> Self {
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Self {
            iat: Some(issued_at),
            exp: Some(issued_at.saturating_add(ttl)),
            extra: serde_json::Map::new(),
        }
    }

    /// Add an uninterpreted string claim such as `aud` or `sub`.
    #[must_use]
    pub fn with_claim(mut self, name: &str, value: &str) -> Self {
        self.extra
            .insert(name.to_string(), serde_json::Value::String(value.to_string()));
        self
    }

    /// `sub` claim, if present and a string.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.extra.get("sub").and_then(serde_json::Value::as_str)
    }

    /// `aud` claim, if present and a string.
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        self.extra.get("aud").and_then(serde_json::Value::as_str)
    }

    /// Check both time bounds against `now`.
    ///
    /// # Errors
    ///
    /// - [`PushError::TokenNotYetValid`] if `iat > now`
    /// - [`PushError::TokenExpired`] if `exp <= now` or `exp` is absent
    pub fn validate_at(&self, now: i64) -> Result<(), PushError> {
        if self.iat.is_some_and(|iat| iat > now) {
            return Err(PushError::TokenNotYetValid);
        }
        match self.exp {
            Some(exp) if exp > now => Ok(()),
            _ => Err(PushError::TokenExpired),
        }
    }
}

/// A token that passed signature and time checks.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedAssertion {
    /// Decoded JWT header
    pub header: AssertionHeader,
    /// Decoded claim set
    pub claims: AssertionClaims,
}

fn invalid(reason: &'static str) -> PushError {
    PushError::SignatureInvalid { reason }
}

/// Checks bearer assertions against one application server key.
#[derive(Debug, Clone)]
pub struct AssertionVerifier {
    key: VerifyingKey,
}

impl AssertionVerifier {
    /// Create a verifier for `key`.
    #[must_use]
    pub fn new(key: &VerificationKey) -> Self {
        Self {
            key: key.verifying_key(),
        }
    }

    /// Verify against the current wall-clock time.
    ///
    /// # Errors
    ///
    /// See [`AssertionVerifier::verify_at`].
    pub fn verify(&self, token: &[u8]) -> Result<VerifiedAssertion, PushError> {
        self.verify_at(token, unix_now())
    }

    /// Verify signature and time bounds at `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// - [`PushError::SignatureInvalid`] for malformed structure, a non-ES256
    ///   header, or a signature that does not verify
    /// - [`PushError::TokenNotYetValid`] / [`PushError::TokenExpired`] for
    ///   a correctly signed token outside its validity window
    pub fn verify_at(&self, token: &[u8], now: i64) -> Result<VerifiedAssertion, PushError> {
        let token = std::str::from_utf8(token).map_err(|_| invalid("token is not UTF-8"))?;

        let mut segments = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(invalid("token must have three segments"));
        };

        let header_json = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| invalid("header is not base64url"))?;
        let header: AssertionHeader =
            serde_json::from_slice(&header_json).map_err(|_| invalid("header is not JSON"))?;
        if header.alg != ES256 {
            return Err(invalid("unsupported algorithm"));
        }

        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| invalid("signature is not base64url"))?;
        if signature_bytes.len() != SIGNATURE_SIZE {
            return Err(invalid("signature is not 64-byte r||s"));
        }
        let signature =
            Signature::from_slice(&signature_bytes).map_err(|_| invalid("signature out of range"))?;

        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        self.key
            .verify(signing_input.as_bytes(), &signature)
            .map_err(|_| invalid("signature mismatch"))?;

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| invalid("claims are not base64url"))?;
        let claims: AssertionClaims =
            serde_json::from_slice(&claims_json).map_err(|_| invalid("claims are not JSON"))?;

        claims.validate_at(now)?;

        Ok(VerifiedAssertion { header, claims })
    }
}

/// Produces ES256 assertions; the application server's half of [`AssertionVerifier`].
#[derive(Debug, Clone)]
pub struct AssertionSigner {
    pair: KeyPair,
}

impl AssertionSigner {
    /// Sign with an existing key pair.
    #[must_use]
    pub fn new(pair: KeyPair) -> Self {
        Self { pair }
    }

    /// Sign with a freshly generated key pair.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::RandomFailed`] if the OS CSPRNG fails.
    pub fn generate() -> Result<Self, PushError> {
        Ok(Self::new(KeyPair::generate()?))
    }

    /// The key receivers need to verify this signer.
    #[must_use]
    pub fn verification_key(&self) -> VerificationKey {
        VerificationKey::from_public(*self.pair.public())
    }

    /// The signing key pair.
    #[must_use]
    pub fn key_pair(&self) -> &KeyPair {
        &self.pair
    }

    /// Encode and sign `claims` as `header.claims.signature`.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::DecodeError`] if the claims cannot be serialized.
    pub fn sign(&self, claims: &AssertionClaims) -> Result<String, PushError> {
        let header = AssertionHeader {
            alg: ES256.to_string(),
            typ: Some("JWT".to_string()),
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| PushError::DecodeError(e.to_string()))?;
        let claims_json =
            serde_json::to_vec(claims).map_err(|e| PushError::DecodeError(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );

        let signing_key = SigningKey::from(self.pair.secret().clone());
        let signature: Signature = signing_key.sign(signing_input.as_bytes());

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }
}
