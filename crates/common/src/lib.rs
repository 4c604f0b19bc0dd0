// ================
// common/src/lib.rs
// ================
//! Wire contracts shared between the gatehouse library, the demo binary,
//! and any external tooling that provisions credentials.
//!
//! This covers the login form field naming scheme, the two strings a
//! rejected client is allowed to see, and the serialized shape of a stored
//! credential record.

use serde::{Deserialize, Serialize};

/// The only message shown for a missing or mismatched anti-forgery token,
/// an unknown username, a missing username or password field, or a wrong
/// password. Deliberately undifferentiated.
pub const MSG_INVALID_CREDENTIALS: &str = "Invalid Credentials";

/// The message shown for a structurally broken submission (unparsable form
/// body, repeated username or password fields).
pub const MSG_BAD_REQUEST: &str = "Bad request";

/// Session key under which a gate records a completed login.
#[must_use]
pub fn auth_flag_key(identifier: &str) -> String {
    format!("authenticated-{identifier}")
}

/// Session key *and* hidden form field carrying the anti-forgery token.
/// The two share a name on purpose: the rendered form echoes the key the
/// gate stored the expected value under.
#[must_use]
pub fn xsrf_field(identifier: &str) -> String {
    format!("xsrf-{identifier}")
}

/// Form field carrying the submitted username.
#[must_use]
pub fn username_field(identifier: &str) -> String {
    format!("username-{identifier}")
}

/// Form field carrying the submitted password.
#[must_use]
pub fn password_field(identifier: &str) -> String {
    format!("password-{identifier}")
}

/// Serialized form of one stored credential.
///
/// `hash` and `salt` are standard base64 (RFC 4648, padded) and must each
/// decode to exactly 64 bytes; `iterations` must be at least 4096. Those
/// invariants are enforced where this record is converted into a usable
/// hash, not here — this type is only the wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CredentialRecord {
    pub hash: String,
    pub salt: String,
    pub iterations: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_embed_the_identifier() {
        assert_eq!(auth_flag_key("front"), "authenticated-front");
        assert_eq!(xsrf_field("front"), "xsrf-front");
        assert_eq!(username_field("front"), "username-front");
        assert_eq!(password_field("front"), "password-front");
    }

    #[test]
    fn credential_record_uses_pascal_case_keys() {
        let record = CredentialRecord {
            hash: "aGFzaA==".to_string(),
            salt: "c2FsdA==".to_string(),
            iterations: 4096,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Hash"], "aGFzaA==");
        assert_eq!(json["Salt"], "c2FsdA==");
        assert_eq!(json["Iterations"], 4096);
    }
}
