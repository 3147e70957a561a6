//! Command-line arguments

use clap::{Parser, Subcommand};
use reqwest::Method;

#[derive(Debug, Parser)]
#[command(name = "sessionctl")]
#[command(about = "Call a session-authenticated API with automatic credential refresh")]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, env = "CONFIG_PATH")]
    pub config: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Subcommand)]
pub enum Command {
    /// Store a session credential pair
    Login {
        access: String,
        refresh: Option<String>,
    },
    /// Show whether a session is stored
    Status,
    /// Call the API, renewing the session once if the credential is rejected
    Request {
        #[arg(value_parser = parse_method)]
        method: Method,
        path: String,
        /// JSON request body
        #[arg(value_parser = parse_json)]
        body: Option<serde_json::Value>,
    },
    /// Revoke the refresh credential and clear the session
    Logout,
}

fn parse_method(raw: &str) -> Result<Method, String> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|e| format!("invalid HTTP method {raw:?}: {e}"))
}

fn parse_json(raw: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("request body must be valid JSON: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `--config` falls back to `CONFIG_PATH`, which config tests mutate.
    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let _lock = crate::config::ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Cli::try_parse_from(std::iter::once("sessionctl").chain(args.iter().copied()))
    }

    #[test]
    fn test_login_with_and_without_refresh() {
        let cli = parse(&["login", "at_1", "rt_1"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Login {
                access: "at_1".into(),
                refresh: Some("rt_1".into())
            }
        );

        let cli = parse(&["login", "at_only"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Login {
                access: "at_only".into(),
                refresh: None
            }
        );
    }

    #[test]
    fn test_request_with_json_body() {
        let cli = parse(&["request", "post", "/orders", r#"{"sku":"mug"}"#]).unwrap();
        assert_eq!(
            cli.command,
            Command::Request {
                method: Method::POST,
                path: "/orders".into(),
                body: Some(serde_json::json!({"sku": "mug"})),
            }
        );
    }

    #[test]
    fn test_request_invalid_body_rejected() {
        let err = parse(&["request", "PUT", "/cart", "{nope"]).unwrap_err();
        assert!(err.to_string().contains("valid JSON"), "got: {err}");
    }

    #[test]
    fn test_request_invalid_method_rejected() {
        let err = parse(&["request", "GE T", "/cart"]).unwrap_err();
        assert!(err.to_string().contains("invalid HTTP method"), "got: {err}");
    }

    #[test]
    fn test_config_flag_anywhere() {
        let cli = parse(&["status", "--config", "/etc/sessionctl.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("/etc/sessionctl.toml"));
        assert_eq!(cli.command, Command::Status);

        let cli = parse(&["--config", "local.toml", "logout"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("local.toml"));
        assert_eq!(cli.command, Command::Logout);
    }

    #[test]
    fn test_missing_or_unknown_command() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["refresh"]).is_err());
        assert!(parse(&["login"]).is_err());
        assert!(parse(&["request", "GET"]).is_err());
        assert!(parse(&["status", "extra"]).is_err());
    }
}
