//! Web Push `aesgcm` protocol header parsing.
//!
//! A push request carries its crypto parameters in headers:
//!
//! ```text
//! Content-Encoding: aesgcm
//! Crypto-Key: dh=<base64url sender ephemeral key>[;p256ecdsa=...]
//! Encryption: salt=<base64url 16-byte salt>
//! Authorization: WebPush <header>.<claims>.<signature>
//! ```
//!
//! `Crypto-Key` and `Encryption` are `;`-separated `key=value` lists whose
//! values use unpadded base64url.

use crate::PushError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// The only supported `Content-Encoding`.
pub const AESGCM_ENCODING: &str = "aesgcm";

/// Scheme prefix stripped from the `Authorization` header.
pub const WEBPUSH_AUTH_PREFIX: &str = "WebPush ";

/// Header names consumed by the parser.
pub mod names {
    /// `Content-Encoding`
    pub const CONTENT_ENCODING: &str = "Content-Encoding";
    /// `Crypto-Key`
    pub const CRYPTO_KEY: &str = "Crypto-Key";
    /// `Encryption`
    pub const ENCRYPTION: &str = "Encryption";
    /// `Authorization`
    pub const AUTHORIZATION: &str = "Authorization";
}

/// Raw values of the headers the parser needs.
///
/// Absent headers are `None`; an HTTP layer fills this in directly, or via
/// [`PushHeaders::from_pairs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushHeaders {
    /// `Content-Encoding` value
    pub content_encoding: Option<String>,
    /// `Crypto-Key` value
    pub crypto_key: Option<String>,
    /// `Encryption` value
    pub encryption: Option<String>,
    /// `Authorization` value
    pub authorization: Option<String>,
}

impl PushHeaders {
    /// Collect the relevant headers from `(name, value)` pairs.
    ///
    /// Names match case-insensitively; unrelated headers are ignored. If a
    /// header appears more than once the first occurrence is kept.
    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let mut headers = Self::default();
        for (name, value) in pairs {
            let name = name.as_ref();
            let slot = if name.eq_ignore_ascii_case(names::CONTENT_ENCODING) {
                &mut headers.content_encoding
            } else if name.eq_ignore_ascii_case(names::CRYPTO_KEY) {
                &mut headers.crypto_key
            } else if name.eq_ignore_ascii_case(names::ENCRYPTION) {
                &mut headers.encryption
            } else if name.eq_ignore_ascii_case(names::AUTHORIZATION) {
                &mut headers.authorization
            } else {
                continue;
            };
            if slot.is_none() {
                *slot = Some(value.as_ref().trim().to_string());
            }
        }
        headers
    }

    /// Render as `(name, value)` pairs, skipping absent headers.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            (names::CONTENT_ENCODING, &self.content_encoding),
            (names::CRYPTO_KEY, &self.crypto_key),
            (names::ENCRYPTION, &self.encryption),
            (names::AUTHORIZATION, &self.authorization),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }
}

/// Crypto parameters extracted from one push request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeaders {
    /// Sender ephemeral public key, as sent (uncompressed SEC1 expected)
    pub dh: Vec<u8>,
    /// Per-message HKDF salt
    pub salt: Vec<u8>,
    /// Bearer assertion, `None` if no `Authorization` header was sent
    pub token: Option<Vec<u8>>,
}

impl ParsedHeaders {
    /// Parse and decode the crypto headers.
    ///
    /// # Errors
    ///
    /// - [`PushError::UnsupportedEncoding`] unless `Content-Encoding` is exactly `aesgcm`
    /// - [`PushError::MalformedHeader`] for an entry without `=`
    /// - [`PushError::MissingField`] if `dh` or `salt` is absent
    /// - [`PushError::DecodeError`] if a value is not unpadded base64url
    pub fn parse(headers: &PushHeaders) -> Result<Self, PushError> {
        let encoding = headers.content_encoding.as_deref().unwrap_or_default();
        if encoding != AESGCM_ENCODING {
            return Err(PushError::UnsupportedEncoding(encoding.to_string()));
        }

        let dh = encoded_value(headers.crypto_key.as_deref(), names::CRYPTO_KEY, "dh")?;
        let salt = encoded_value(headers.encryption.as_deref(), names::ENCRYPTION, "salt")?;

        let token = headers
            .authorization
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(|value| {
                value
                    .strip_prefix(WEBPUSH_AUTH_PREFIX)
                    .unwrap_or(value)
                    .as_bytes()
                    .to_vec()
            });

        Ok(Self { dh, salt, token })
    }
}

/// Look up `key` in a parameter header and base64url-decode its value.
fn encoded_value(
    value: Option<&str>,
    header: &'static str,
    key: &'static str,
) -> Result<Vec<u8>, PushError> {
    let params = parse_params(value.unwrap_or_default(), header)?;
    let encoded = params
        .into_iter()
        .rev()
        .find_map(|(k, v)| (k == key).then_some(v))
        .ok_or(PushError::MissingField { header, key })?;

    Ok(URL_SAFE_NO_PAD.decode(encoded)?)
}

/// Split a `;`-separated `key=value` list.
///
/// Empty entries are skipped; entries without `=` are an error.
fn parse_params<'a>(
    value: &'a str,
    header: &'static str,
) -> Result<Vec<(&'a str, &'a str)>, PushError> {
    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| PushError::MalformedHeader {
                    header,
                    entry: entry.to_string(),
                })
        })
        .collect()
}
