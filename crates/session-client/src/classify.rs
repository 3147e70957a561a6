//! Failure classification for the refresh flow
//!
//! Decides, for a failed call, whether the refresh coordinator gets involved.
//! Only a 401 on a request that has not been through the flow yet and has not
//! opted out is eligible. A failure of the refresh endpoint itself is never
//! eligible, which is what keeps the flow from recursing.

use reqwest::StatusCode;

use crate::error::Error;
use crate::request::RequestDescriptor;

/// What to do with a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Hand the failure to the caller unchanged
    PassThrough,
    /// The refresh endpoint itself failed: pass through and force the
    /// coordinator back to idle
    RefreshEndpointFailed,
    /// Renew the credential and replay the request
    Refresh,
}

/// Classify a failure. Rules are applied in order:
///
/// 1. no request to replay → pass through
/// 2. request addressed the refresh endpoint → pass through, reset coordinator
/// 3. 401, not yet retried, not opted out → refresh
/// 4. anything else → pass through
pub fn classify(request: Option<&RequestDescriptor>, error: &Error, refresh_path: &str) -> Disposition {
    let Some(request) = request else {
        return Disposition::PassThrough;
    };
    if request.targets(refresh_path) {
        return Disposition::RefreshEndpointFailed;
    }
    if error.status() == Some(StatusCode::UNAUTHORIZED)
        && !request.is_retried()
        && !request.skips_auth_refresh()
    {
        return Disposition::Refresh;
    }
    Disposition::PassThrough
}
