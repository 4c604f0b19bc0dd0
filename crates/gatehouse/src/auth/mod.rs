// ============================
// crates/gatehouse/src/auth/mod.rs
// ============================
//! Credential handling: the hashing primitive, the password-checking
//! capability, the in-memory store, and anti-forgery token generation.

pub mod checker;
pub mod password;
pub mod store;
pub mod token;

pub use checker::PasswordChecker;
pub use password::{Pbkdf2Hash, KEY_LENGTH, MIN_ITERATIONS};
pub use store::MemoryCredentialStore;
pub use token::{xsrf_token, EntropyError, XSRF_TOKEN_BYTES};

use thiserror::Error;

/// Failures of credential generation, lookup and verification.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The requested iteration count is below [`MIN_ITERATIONS`].
    #[error("the iteration count must be at least the configured minimum")]
    InsufficientIterations,

    /// The operating system could not supply a full-length random salt.
    #[error("not enough entropy was available to generate a full-length salt")]
    InsufficientEntropy,

    /// The given identifier has no entry in the credential store.
    #[error("the given identifier has no entry in the credential store")]
    NoSuchIdentifier,

    /// The supplied password does not reproduce the stored hash.
    #[error("the supplied password does not match the stored hash")]
    BadPassword,

    /// A serialized hash did not decode to exactly [`KEY_LENGTH`] bytes.
    #[error("the encoded hash does not decode to the expected length")]
    IncorrectHashLength,

    /// A serialized salt did not decode to exactly [`KEY_LENGTH`] bytes.
    #[error("the encoded salt does not decode to the expected length")]
    IncorrectSaltLength,

    /// A serialized field was not valid standard base64.
    #[error("invalid base64 in serialized credential: {0}")]
    Encoding(String),

    /// Failure inside a checker backend (database down, etc.). Never
    /// produced by the in-memory store; declared for other implementors.
    #[error("credential backend failure: {0}")]
    Backend(String),
}
