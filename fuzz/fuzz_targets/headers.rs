//! Fuzz target for push header parsing
//!
//! Tests that arbitrary header values never panic the parser.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pushsink_crypto::{ParsedHeaders, PushHeaders};

#[derive(Debug, Arbitrary)]
struct HeaderInput {
    content_encoding: Option<String>,
    crypto_key: Option<String>,
    encryption: Option<String>,
    authorization: Option<String>,
}

fuzz_target!(|input: HeaderInput| {
    let headers = PushHeaders {
        content_encoding: input.content_encoding,
        crypto_key: input.crypto_key,
        encryption: input.encryption,
        authorization: input.authorization,
    };

    if let Ok(parsed) = ParsedHeaders::parse(&headers) {
        // Only an exact `aesgcm` encoding gets this far
        assert_eq!(headers.content_encoding.as_deref(), Some("aesgcm"));
        assert_eq!(parsed.token.is_some(), headers.authorization.as_deref().is_some_and(|a| !a.is_empty()));
    }

    // Same values through the name-matching adapter
    let _ = ParsedHeaders::parse(&PushHeaders::from_pairs(headers.to_pairs()));
});
