//! Captured push requests on disk: a `Name: value` headers file plus a raw body.

use pushsink_crypto::PushHeaders;

/// Parse a headers file, one `Name: value` per line.
///
/// Blank lines and `#` comments are skipped. Unrelated headers are ignored.
///
/// # Errors
///
/// Returns an error naming the line if it has no `:`.
pub fn parse_headers(text: &str) -> anyhow::Result<PushHeaders> {
    let mut pairs = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            anyhow::bail!("line {}: expected `Name: value`, got {:?}", number + 1, line);
        };
        pairs.push((name.trim(), value.trim()));
    }
    Ok(PushHeaders::from_pairs(pairs))
}

/// Render headers in the format [`parse_headers`] reads.
#[must_use]
pub fn render_headers(headers: &PushHeaders) -> String {
    headers
        .to_pairs()
        .into_iter()
        .map(|(name, value)| format!("{name}: {value}\n"))
        .collect()
}
