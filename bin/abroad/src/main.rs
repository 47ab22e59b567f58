//! # abroad
//!
//! Command-line front end. Assembles the backend plugin selected at compile
//! time, the community feeds and the reference catalog.

mod cli;
mod commands;
mod reference;

use std::sync::Arc;

use ab_catalog::JsonCatalog;
use ab_community::{Community, CommunityOptions};
use ab_configs::{LogFormat, LogSettings, Settings};
use ab_core::{BackendClient, SystemClock};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Cli;

#[cfg(not(any(feature = "backend-rest", feature = "backend-memory")))]
compile_error!("enable either the `backend-rest` or the `backend-memory` feature");

#[cfg(feature = "backend-rest")]
use ab_backend_rest::RestBackend;
#[cfg(feature = "backend-rest")]
use secrecy::SecretString;

#[cfg(all(feature = "backend-memory", not(feature = "backend-rest")))]
use ab_backend_memory::MemoryBackend;

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[cfg(feature = "backend-rest")]
async fn connect(settings: &Settings, cli: &Cli) -> Result<BackendClient> {
    let backend = Arc::new(RestBackend::new(
        &settings.backend.url,
        settings.backend.anon_key.clone(),
    )?);
    if let (Some(email), Some(password)) = (&cli.email, &cli.password) {
        let password = SecretString::from(password.clone());
        backend
            .sign_in_with_password(email, &password)
            .await
            .context("sign-in failed")?;
    }
    info!(url = %settings.backend.url, "using hosted backend");
    Ok(BackendClient::from_backend(backend))
}

#[cfg(all(feature = "backend-memory", not(feature = "backend-rest")))]
async fn connect(_settings: &Settings, cli: &Cli) -> Result<BackendClient> {
    let backend = Arc::new(MemoryBackend::new().with_relation_constraints());
    // Offline sessions accept any password.
    if let Some(email) = &cli.email {
        backend.sign_in(ab_core::Actor::new(uuid::Uuid::new_v4(), Some(email.clone())));
    }
    info!("using in-memory backend");
    Ok(BackendClient::from_backend(backend))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.log);

    let catalog = JsonCatalog::load(settings.catalog.path.as_deref()).context("loading catalog")?;

    if cli.command.is_reference() {
        return reference::run(&catalog, cli.command);
    }

    let client = Arc::new(connect(&settings, &cli).await?);
    let options = CommunityOptions {
        story_ttl: chrono::Duration::hours(settings.community.story_ttl_hours),
        duplicate_guard: settings.community.duplicate_guard,
    };
    let community = Community::new(client, Arc::new(SystemClock), options);
    commands::run(&community, &catalog, cli.command).await
}
