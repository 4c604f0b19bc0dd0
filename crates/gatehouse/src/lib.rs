// ============================
// crates/gatehouse/src/lib.rs
// ============================
//! An embeddable login gateway for axum/tower HTTP stacks.
//!
//! `gatehouse` sits in front of an arbitrary downstream service and
//! makes sure every request that reaches it belongs to an authenticated
//! session: authenticated callers are forwarded untouched, everyone else
//! is walked through an XSRF-protected login form checked against a
//! pluggable password store.
//!
//! The pieces compose bottom-up: [`auth::Pbkdf2Hash`] derives and
//! verifies salted iterated password hashes, [`auth::MemoryCredentialStore`]
//! maps identifiers to hashes behind the [`auth::PasswordChecker`]
//! capability, and [`gate::LoginGate`] runs the per-request protocol
//! against a [`session::SessionStore`]. [`gate::LoginGateLayer`] wires it
//! all into a tower service stack.

pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod session;

pub use auth::{
    CredentialError, MemoryCredentialStore, PasswordChecker, Pbkdf2Hash, KEY_LENGTH,
    MIN_ITERATIONS,
};
pub use config::{load_settings, load_settings_from, Settings};
pub use error::{CannedResponse, GateError};
pub use gate::{Intercept, LoginGate, LoginGateLayer, LoginGateService};
pub use session::{
    MemorySession, MemorySessions, SessionError, SessionStore, SessionValue, SESSION_COOKIE,
};
