// ============================
// crates/gatehouse/src/session/mod.rs
// ============================
//! The session contract the login gate consumes.
//!
//! The gate never owns session storage: it reads and writes a handful of
//! namespaced values through this trait and leaves persistence, expiry and
//! caller binding to the implementation. [`memory`] provides a minimal
//! in-memory implementation for tests and demos.

pub mod memory;

pub use memory::{MemorySession, MemorySessions, SESSION_COOKIE};

use async_trait::async_trait;
use thiserror::Error;

/// A value stored in a session. The gate stores its authenticated flag as
/// a boolean and its anti-forgery token as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionValue {
    Bool(bool),
    Text(String),
}

/// Failures of session value access.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The key has never been set in this session. Expected on first
    /// visits; every other error is fatal to the request.
    #[error("no such session value")]
    NoSuchValue,

    /// Failure inside the session backend.
    #[error("session backend failure: {0}")]
    Backend(String),
}

/// Key-value access to one caller's session.
///
/// Keys are opaque strings; the gate namespaces its own keys with its
/// identifier and never enumerates session contents. Calls may block on
/// I/O depending on the backing implementation.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_value(&self, key: &str) -> Result<SessionValue, SessionError>;
    async fn set_value(&self, key: &str, value: SessionValue) -> Result<(), SessionError>;
}
