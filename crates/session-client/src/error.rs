//! Error types for authenticated API calls

use std::time::Duration;

use reqwest::StatusCode;

use crate::request::ApiResponse;

/// Errors surfaced to callers of the client.
///
/// `Clone` so one refresh outcome can be handed to every request waiting on
/// it. `NoRefreshCredential`, `RefreshFailed` and `RefreshTimeout` are
/// terminal for the session: the credential store has already been cleared
/// when a caller sees them. `RefreshInterrupted` is not; the stored pair is
/// left as the refresh task last wrote it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// No response was received (connect failure, timeout, body read error)
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered with a non-success status
    #[error("server responded with {}", .0.status())]
    Status(Box<ApiResponse>),

    #[error("session expired: no refresh credential available")]
    NoRefreshCredential,

    #[error("session refresh failed: {0}")]
    RefreshFailed(String),

    #[error("session refresh timed out after {0:?}")]
    RefreshTimeout(Duration),

    /// The refresh task died before settling; the stored session is untouched
    #[error("session refresh interrupted: {0}")]
    RefreshInterrupted(String),

    #[error("credential store error: {0}")]
    Credential(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl Error {
    /// HTTP status, when the failure carries a response.
    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(ApiResponse::status)
    }

    /// The failed response, if any.
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            Error::Status(response) => Some(&**response),
            _ => None,
        }
    }

    /// Whether this failure ended the session (credentials were cleared).
    pub fn is_session_expired(&self) -> bool {
        matches!(
            self,
            Error::NoRefreshCredential | Error::RefreshFailed(_) | Error::RefreshTimeout(_)
        )
    }
}

impl From<session_auth::Error> for Error {
    fn from(err: session_auth::Error) -> Self {
        Error::Credential(err.to_string())
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
