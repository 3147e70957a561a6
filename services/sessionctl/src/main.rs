//! sessionctl
//!
//! Command-line client for a session-authenticated API:
//! 1. Loads configuration and the persisted credential pair
//! 2. Sends requests with the access credential attached
//! 3. Renews the session once when the API rejects the credential
//! 4. Logs session refresh and expiry events as they happen

mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use session_client::{AuthClient, ReqwestTransport, RequestDescriptor, SessionEvent};
use session_auth::CredentialStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        credentials_file = %config.session.credentials_file.display(),
        "configuration loaded"
    );

    let store = CredentialStore::load(
        config.session.credentials_file.clone(),
        config.session.storage_keys(),
    )
    .await
    .with_context(|| {
        format!(
            "failed to open credentials file {}",
            config.session.credentials_file.display()
        )
    })?;

    let transport = ReqwestTransport::new(
        reqwest::Client::new(),
        config.api.base_url.clone(),
        Duration::from_secs(config.api.timeout_secs),
    );
    let client = AuthClient::new(
        Arc::new(transport),
        Arc::new(store),
        config.session.client_config(),
    );
    client.notifier().register(log_session_event);

    run(&client, cli.command).await
}

fn log_session_event(event: &SessionEvent) {
    match event {
        SessionEvent::TokenRefreshed(pair) => info!(
            rotated_refresh = pair.refresh().is_some(),
            "session credentials renewed"
        ),
        SessionEvent::TokenExpired => warn!("session expired, sign in again"),
    }
}

async fn run(client: &AuthClient, command: Command) -> Result<()> {
    match command {
        Command::Login { access, refresh } => {
            client
                .sign_in(&access, refresh.as_deref())
                .await
                .context("failed to store credentials")?;
            println!("signed in");
        }
        Command::Status => {
            let pair = client.credential_store().pair().await;
            let status = serde_json::json!({
                "signed_in": pair.access().is_some(),
                "can_refresh": pair.refresh().is_some(),
            });
            println!("{status}");
        }
        Command::Request { method, path, body } => {
            let mut request = RequestDescriptor::new(method, path);
            if let Some(body) = body {
                request = request.json(&body)?;
            }
            match client.execute(request).await {
                Ok(response) => {
                    info!(status = %response.status(), "request succeeded");
                    println!("{}", response.text());
                }
                Err(e) => {
                    if let Some(response) = e.response() {
                        println!("{}", response.text());
                    }
                    if e.is_session_expired() {
                        return Err(e).context("session ended, run `sessionctl login` again");
                    }
                    return Err(e).context("request failed");
                }
            }
        }
        Command::Logout => {
            client.logout().await.context("failed to clear session")?;
            println!("signed out");
        }
    }
    Ok(())
}
