//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Credentials never live in the TOML; they are kept in the credentials file
//! managed by the session store.

use serde::Deserialize;
use session_auth::{DEFAULT_ACCESS_KEY, DEFAULT_REFRESH_KEY, LOGOUT_PATH, REFRESH_PATH, StorageKeys};
use session_client::ClientConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
}

/// Target API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Session credential and refresh settings
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    pub credentials_file: PathBuf,
    #[serde(default = "default_access_key")]
    pub access_key: String,
    #[serde(default = "default_refresh_key")]
    pub refresh_key: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    #[serde(default = "default_timeout")]
    pub refresh_timeout_secs: u64,
}

impl SessionConfig {
    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys {
            access: self.access_key.clone(),
            refresh: self.refresh_key.clone(),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            refresh_path: self.refresh_path.clone(),
            logout_path: self.logout_path.clone(),
            refresh_timeout: Duration::from_secs(self.refresh_timeout_secs),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_access_key() -> String {
    DEFAULT_ACCESS_KEY.to_owned()
}

fn default_refresh_key() -> String {
    DEFAULT_REFRESH_KEY.to_owned()
}

fn default_refresh_path() -> String {
    REFRESH_PATH.to_owned()
}

fn default_logout_path() -> String {
    LOGOUT_PATH.to_owned()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// `SESSIONCTL_BASE_URL` replaces `api.base_url` when set.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(base_url) = std::env::var("SESSIONCTL_BASE_URL") {
            config.api.base_url = base_url;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.session.refresh_timeout_secs == 0 {
            return Err(common::Error::Config(
                "refresh_timeout_secs must be greater than 0".into(),
            ));
        }

        for (name, path) in [
            ("refresh_path", &self.session.refresh_path),
            ("logout_path", &self.session.logout_path),
        ] {
            if !path.starts_with('/') {
                return Err(common::Error::Config(format!(
                    "{name} must start with '/', got: {path}"
                )));
            }
        }

        if self.session.access_key.is_empty() || self.session.refresh_key.is_empty() {
            return Err(common::Error::Config("storage keys must not be empty".into()));
        }
        if self.session.access_key == self.session.refresh_key {
            return Err(common::Error::Config(
                "access_key and refresh_key must differ".into(),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("sessionctl.toml")
    }
}

/// Serializes tests that read or mutate environment variables.
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
