// ============================
// crates/gatehouse/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

/// Application settings
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Identifier namespacing the gate's session keys and form fields
    pub identifier: String,
    /// Path to the JSON credential file (identifier -> record)
    pub credentials_path: PathBuf,
    /// Log level
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            identifier: "gatehouse".to_string(),
            credentials_path: PathBuf::from("credentials.json"),
            log_level: "info".to_string(),
        }
    }
}

/// Load settings from `gatehouse.toml` and `GATEHOUSE_`-prefixed
/// environment variables, environment winning.
pub fn load_settings() -> Result<Settings> {
    load_settings_from("gatehouse.toml")
}

/// Same as [`load_settings`], from an explicit file path.
pub fn load_settings_from<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let settings = Figment::new()
        .merge(Toml::file(path.as_ref()))
        .merge(Env::prefixed("GATEHOUSE_"))
        .extract()?;

    Ok(settings)
}
