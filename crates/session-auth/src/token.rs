//! Refresh and logout endpoint payloads
//!
//! Both endpoints take the refresh credential as `{"refresh": "..."}`. The
//! refresh endpoint answers with a new access credential and, when the backend
//! rotates them, a new refresh credential. Field aliases cover the snake_case
//! and camelCase spellings different backends use.

use serde::{Deserialize, Serialize};

use crate::canonical::canonicalize;
use crate::error::{Error, Result};

/// Body of `POST /auth/refresh`.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Body of `POST /auth/logout`.
#[derive(Debug, Serialize)]
pub struct LogoutRequest<'a> {
    pub refresh: &'a str,
}

/// Raw refresh endpoint reply.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(alias = "access_token", alias = "accessToken")]
    access: Option<String>,
    #[serde(default, alias = "refresh_token", alias = "refreshToken")]
    refresh: Option<String>,
}

/// Validated credentials minted by a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access: String,
    /// Present only when the backend rotated the refresh credential
    pub refresh: Option<String>,
}

/// Parse and canonicalize a refresh endpoint response body.
///
/// A reply without a usable access credential is an error: storing it would
/// leave the session signed in with nothing to attach.
pub fn parse_refresh_response(body: &[u8]) -> Result<TokenGrant> {
    let response: RefreshResponse = serde_json::from_slice(body)
        .map_err(|e| Error::InvalidTokenResponse(format!("malformed refresh response: {e}")))?;

    let access = response
        .access
        .as_deref()
        .and_then(canonicalize)
        .ok_or_else(|| {
            Error::InvalidTokenResponse("refresh response has no access credential".into())
        })?;

    Ok(TokenGrant {
        access,
        refresh: response.refresh.as_deref().and_then(canonicalize),
    })
}
