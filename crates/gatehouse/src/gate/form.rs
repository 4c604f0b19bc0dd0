// ============================
// crates/gatehouse/src/gate/form.rs
// ============================
//! Strict `application/x-www-form-urlencoded` parsing.
//!
//! The gate has to tell a *malformed* body (rendered as "Bad request")
//! apart from a well-formed body that merely lacks fields (rendered as
//! "Invalid Credentials"). The ecosystem parsers are lossy by design:
//! they pass invalid percent escapes through and never fail, which would
//! collapse the two cases. This parser rejects what the wire format does
//! not allow and keeps every repeated field, which the gate also needs.
use std::collections::HashMap;

use thiserror::Error;

/// Decoded form fields. A key maps to every value submitted under it, in
/// order of appearance.
pub(crate) type FieldMap = HashMap<String, Vec<String>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum FormError {
    #[error("invalid percent escape in form data")]
    InvalidEscape,

    #[error("form data is not valid UTF-8 once decoded")]
    InvalidUtf8,

    #[error("semicolon separators are not supported")]
    InvalidSeparator,

    #[error("form body could not be read in full")]
    Unreadable,
}

/// Parse a form body into a [`FieldMap`].
///
/// `a=1&a=2&b` decodes to `a -> ["1", "2"], b -> [""]`; `+` decodes to a
/// space; empty pairs (`a=1&&b=2`) are skipped.
pub(crate) fn parse(body: &[u8]) -> Result<FieldMap, FormError> {
    if body.contains(&b';') {
        return Err(FormError::InvalidSeparator);
    }

    let mut fields = FieldMap::new();
    for pair in body.split(|&byte| byte == b'&') {
        if pair.is_empty() {
            continue;
        }

        let (key, value) = match pair.iter().position(|&byte| byte == b'=') {
            Some(split) => (&pair[..split], &pair[split + 1..]),
            None => (pair, &[][..]),
        };

        let key = decode_component(key)?;
        let value = decode_component(value)?;
        fields.entry(key).or_default().push(value);
    }

    Ok(fields)
}

fn decode_component(raw: &[u8]) -> Result<String, FormError> {
    let mut decoded = Vec::with_capacity(raw.len());
    let mut bytes = raw.iter();

    while let Some(&byte) = bytes.next() {
        match byte {
            b'+' => decoded.push(b' '),
            b'%' => {
                let high = bytes.next().and_then(|&b| hex_value(b));
                let low = bytes.next().and_then(|&b| hex_value(b));
                match (high, low) {
                    (Some(high), Some(low)) => decoded.push(high << 4 | low),
                    _ => return Err(FormError::InvalidEscape),
                }
            }
            _ => decoded.push(byte),
        }
    }

    String::from_utf8(decoded).map_err(|_| FormError::InvalidUtf8)
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
