//! Session endpoint and storage defaults
//!
//! Paths are relative to the API base url. Both can be overridden through the
//! client configuration; these match the storefront backend's routes.

/// Endpoint that exchanges a refresh credential for a new access credential
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Endpoint that revokes a refresh credential (best effort)
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Default storage key for the access credential
pub const DEFAULT_ACCESS_KEY: &str = "access_token";

/// Default storage key for the refresh credential
pub const DEFAULT_REFRESH_KEY: &str = "refresh_token";

/// Authorization scheme prefix attached to outbound requests
pub const BEARER_PREFIX: &str = "Bearer ";
