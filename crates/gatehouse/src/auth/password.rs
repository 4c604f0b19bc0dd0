// ============================
// crates/gatehouse/src/auth/password.rs
// ============================
//! Salted, iterated password hashing.
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::Hmac;
use rand::{rngs::OsRng, TryRngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use gatehouse_common::CredentialRecord;

use super::CredentialError;

/// Length (in bytes) of both the derived hash and the random salt.
pub const KEY_LENGTH: usize = 64;

/// Smallest iteration count a hash may be generated or deserialized with.
pub const MIN_ITERATIONS: u16 = 4096;

/// A PBKDF2-HMAC-SHA256 hash of one password, together with the salt and
/// iteration count needed to recompute it. Hash and salt are exactly
/// [`KEY_LENGTH`] bytes; the lengths are carried in the types so a value of
/// this struct is valid by construction.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "CredentialRecord", into = "CredentialRecord")]
pub struct Pbkdf2Hash {
    hash: [u8; KEY_LENGTH],
    salt: [u8; KEY_LENGTH],
    iterations: u16,
}

impl Pbkdf2Hash {
    /// Derive a fresh hash from a plaintext password.
    ///
    /// Fails with [`CredentialError::InsufficientIterations`] below the
    /// [`MIN_ITERATIONS`] floor, and with
    /// [`CredentialError::InsufficientEntropy`] if the operating system
    /// cannot supply a full-length random salt.
    pub fn generate(password: &str, iterations: u16) -> Result<Self, CredentialError> {
        if iterations < MIN_ITERATIONS {
            return Err(CredentialError::InsufficientIterations);
        }

        let mut salt = [0u8; KEY_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|_| CredentialError::InsufficientEntropy)?;

        let hash = derive(password, &salt, iterations);

        Ok(Self {
            hash,
            salt,
            iterations,
        })
    }

    /// Recompute the derivation for `password` and compare it against the
    /// stored hash in constant time (full length, no short-circuit).
    ///
    /// Returns a single undifferentiated [`CredentialError::BadPassword`]
    /// on any mismatch.
    pub fn verify(&self, password: &str) -> Result<(), CredentialError> {
        let mut computed = derive(password, &self.salt, self.iterations);
        let matched: bool = computed.as_slice().ct_eq(self.hash.as_slice()).into();
        computed.zeroize();

        if matched {
            Ok(())
        } else {
            Err(CredentialError::BadPassword)
        }
    }

    /// Work factor this hash was derived with.
    #[must_use]
    pub fn iterations(&self) -> u16 {
        self.iterations
    }
}

// Keep hash and salt bytes out of log output.
impl std::fmt::Debug for Pbkdf2Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pbkdf2Hash")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

fn derive(password: &str, salt: &[u8; KEY_LENGTH], iterations: u16) -> [u8; KEY_LENGTH] {
    pbkdf2::pbkdf2_array::<Hmac<Sha256>, KEY_LENGTH>(
        password.as_bytes(),
        salt,
        u32::from(iterations),
    )
    .expect("output length is a valid PBKDF2 size")
}

impl TryFrom<CredentialRecord> for Pbkdf2Hash {
    type Error = CredentialError;

    fn try_from(record: CredentialRecord) -> Result<Self, Self::Error> {
        let hash = decode_exact(&record.hash, CredentialError::IncorrectHashLength)?;
        let salt = decode_exact(&record.salt, CredentialError::IncorrectSaltLength)?;

        if record.iterations < MIN_ITERATIONS {
            return Err(CredentialError::InsufficientIterations);
        }

        Ok(Self {
            hash,
            salt,
            iterations: record.iterations,
        })
    }
}

impl From<Pbkdf2Hash> for CredentialRecord {
    fn from(value: Pbkdf2Hash) -> Self {
        Self {
            hash: STANDARD.encode(value.hash),
            salt: STANDARD.encode(value.salt),
            iterations: value.iterations,
        }
    }
}

fn decode_exact(
    encoded: &str,
    length_error: CredentialError,
) -> Result<[u8; KEY_LENGTH], CredentialError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| CredentialError::Encoding(e.to_string()))?;
    <[u8; KEY_LENGTH]>::try_from(bytes).map_err(|_| length_error)
}
