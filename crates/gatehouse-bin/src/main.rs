use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{routing::get, Router};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gatehouse::{
    load_settings_from, LoginGateLayer, MemoryCredentialStore, Settings,
};

/// Serve a demo downstream behind a gatehouse login gate.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the settings file
    #[arg(short, long, default_value = "gatehouse.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_settings_from(&cli.config).unwrap_or_else(|err| {
        warn!(error = %err, "could not load settings, falling back to defaults");
        Settings::default()
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone())),
        )
        .init();

    // Load the credential file up front; a single invalid record refuses
    // the whole store, so we never start half-provisioned.
    let raw = fs::read_to_string(&settings.credentials_path).map_err(|err| {
        anyhow::anyhow!(
            "unable to read credential file {}: {err}",
            settings.credentials_path.display()
        )
    })?;
    let store: MemoryCredentialStore = serde_json::from_str(&raw).map_err(|err| {
        anyhow::anyhow!(
            "invalid credential file {}: {err}",
            settings.credentials_path.display()
        )
    })?;
    info!(
        identifiers = store.len(),
        identifier = %settings.identifier,
        "credential store loaded"
    );

    // The downstream being protected. A real deployment would put a
    // reverse-proxy handler here.
    let downstream = get(protected).post(protected);

    let app = Router::new()
        .route("/", downstream)
        .layer(LoginGateLayer::new(
            settings.identifier.clone(),
            Arc::new(store),
        ))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(settings.bind_addr).await?;
    info!(addr = %settings.bind_addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn protected() -> &'static str {
    "You made it past the gatehouse.\n"
}
