//! Push receiver error types.

use thiserror::Error;

/// Errors produced while setting up key material or processing a push message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PushError {
    /// `Content-Encoding` was something other than `aesgcm`
    #[error("unsupported content encoding: {0:?}")]
    UnsupportedEncoding(String),

    /// A required key was absent from a parameter header
    #[error("value {key} not found in header {header}")]
    MissingField {
        /// Header that was searched
        header: &'static str,
        /// Parameter name that was expected
        key: &'static str,
    },

    /// A `key=value` entry in a parameter header had no `=`
    #[error("malformed entry {entry:?} in header {header}")]
    MalformedHeader {
        /// Header containing the entry
        header: &'static str,
        /// Offending entry
        entry: String,
    },

    /// Base64, scalar or point encoding could not be decoded
    #[error("decode error: {0}")]
    DecodeError(String),

    /// The sender's ephemeral `dh` value is not a valid uncompressed P-256 point
    #[error("invalid peer public key")]
    InvalidPeerKey,

    /// The bearer assertion is malformed, uses another algorithm, or its signature does not verify
    #[error("invalid assertion: {reason}")]
    SignatureInvalid {
        /// Which check failed
        reason: &'static str,
    },

    /// The assertion `exp` claim is in the past or missing
    #[error("assertion expired")]
    TokenExpired,

    /// The assertion `iat` claim is in the future
    #[error("assertion not yet valid")]
    TokenNotYetValid,

    /// No `Authorization` header accompanied the message
    #[error("missing authorization token")]
    MissingToken,

    /// AEAD encryption failed
    #[error("encryption failed")]
    EncryptionFailed,

    /// AEAD tag verification failed
    #[error("decryption failed: authentication failure")]
    AuthenticationFailed,

    /// Decrypted plaintext is too short to hold the padding-length prefix
    #[error("decrypted payload shorter than padding prefix")]
    TruncatedPlaintext,

    /// HKDF refused the requested output length
    #[error("key derivation failed")]
    KeyDerivationFailed,

    /// The OS CSPRNG failed
    #[error("random number generation failed")]
    RandomFailed,

    /// Key material is incomplete for the requested operation
    #[error("key material not set up: {0}")]
    PreconditionViolation(&'static str),
}

impl PushError {
    /// Whether this error means the sender or the payload failed authentication.
    ///
    /// Boundary layers can use this to answer every such failure with the same
    /// rejection, without revealing which check tripped.
    #[must_use]
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::SignatureInvalid { .. }
                | Self::TokenExpired
                | Self::TokenNotYetValid
                | Self::MissingToken
                | Self::AuthenticationFailed
        )
    }
}

impl From<base64::DecodeError> for PushError {
    fn from(err: base64::DecodeError) -> Self {
        Self::DecodeError(err.to_string())
    }
}
