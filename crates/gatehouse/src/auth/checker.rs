use async_trait::async_trait;

use super::CredentialError;

/// The password-checking capability the login gate depends on.
///
/// Anything that can answer "does this identifier/password pair check
/// out?" can stand in for the in-memory store — a database-backed store,
/// an LDAP bridge, a test stub. Implementations report exactly
/// [`CredentialError::NoSuchIdentifier`] for an unknown identifier and
/// [`CredentialError::BadPassword`] for a failed verification; any other
/// error is treated as an internal failure by callers.
#[async_trait]
pub trait PasswordChecker: Send + Sync {
    async fn check_password(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<(), CredentialError>;
}
