// ============================
// crates/gatehouse/src/auth/store.rs
// ============================
//! In-memory credential store.
use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Deserializer};

use super::{CredentialError, PasswordChecker, Pbkdf2Hash};

/// A credential store that keeps every identifier and hash in process
/// memory. Entries survive only as long as the process, so this is useful
/// for testing and small demo deployments, not production. All passwords
/// are hashed with PBKDF2-HMAC-SHA256.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: DashMap<String, Pbkdf2Hash>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash `password` and insert it for `identifier`, replacing any prior
    /// entry for the same identifier in one atomic step. Propagates
    /// generation failures (`InsufficientIterations`,
    /// `InsufficientEntropy`).
    pub fn set_password(
        &self,
        identifier: &str,
        password: &str,
        iterations: u16,
    ) -> Result<(), CredentialError> {
        let hash = Pbkdf2Hash::generate(password, iterations)?;
        self.entries.insert(identifier.to_string(), hash);
        Ok(())
    }

    /// Number of stored identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PasswordChecker for MemoryCredentialStore {
    /// Look up `identifier` and verify `password` against its hash.
    ///
    /// Known limitation, kept on purpose: the lookup returns
    /// `NoSuchIdentifier` without running the key derivation, so response
    /// timing can reveal whether an identifier exists. Closing that side
    /// channel (e.g. verifying against a dummy hash) is a behavior change
    /// this store deliberately does not make.
    async fn check_password(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<(), CredentialError> {
        // Clone the record out so the shard lock is not held across the
        // key derivation.
        let hash = match self.entries.get(identifier) {
            Some(entry) => entry.value().clone(),
            None => return Err(CredentialError::NoSuchIdentifier),
        };

        hash.verify(password)
    }
}

impl From<HashMap<String, Pbkdf2Hash>> for MemoryCredentialStore {
    fn from(entries: HashMap<String, Pbkdf2Hash>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

// Deserializes from a map of identifier to serialized record. Any single
// invalid record fails the whole map, so a store is never partially
// populated from bad input.
impl<'de> Deserialize<'de> for MemoryCredentialStore {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = HashMap::<String, Pbkdf2Hash>::deserialize(deserializer)?;
        Ok(Self::from(entries))
    }
}
