// ============================
// crates/gatehouse/src/auth/token.rs
// ============================
//! Anti-forgery token generation.
use rand::{rngs::OsRng, TryRngCore};
use thiserror::Error;

/// Raw length of an anti-forgery token before hex encoding.
pub const XSRF_TOKEN_BYTES: usize = 64;

/// The operating system could not supply enough randomness for a token.
#[derive(Debug, Error)]
#[error("not enough entropy was available to generate a full-length token")]
pub struct EntropyError;

/// Draw a fresh anti-forgery token from OS entropy.
///
/// The result is hex-encoded so it can be embedded directly in form markup
/// and compared byte-for-byte on the next submission.
pub fn xsrf_token() -> Result<String, EntropyError> {
    let mut raw = [0u8; XSRF_TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut raw).map_err(|_| EntropyError)?;
    Ok(hex::encode(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_full_length_hex() {
        let token = xsrf_token().unwrap();
        assert_eq!(token.len(), XSRF_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn consecutive_tokens_differ() {
        let first = xsrf_token().unwrap();
        let second = xsrf_token().unwrap();
        assert_ne!(first, second);
    }
}
