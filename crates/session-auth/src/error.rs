//! Error types for credential storage and token parsing

/// Errors from credential storage and refresh-response handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for session-auth operations.
pub type Result<T> = std::result::Result<T, Error>;
