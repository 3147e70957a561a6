//! Re-issuing a request with a renewed credential

use common::Secret;
use tracing::{debug, warn};

use crate::metrics;
use crate::request::RequestDescriptor;

/// Copy of `original` carrying `access` as its bearer credential.
///
/// Everything else, including the request id and the `retried` flag, is kept,
/// so the replay is the same logical request and cannot enter the refresh
/// flow again.
pub fn rebuild(original: &RequestDescriptor, access: &Secret<String>) -> RequestDescriptor {
    let mut replay = original.clone();
    if replay.set_bearer(access.as_str()) {
        debug!(request_id = %replay.id(), "replaying with renewed credential");
    } else {
        warn!(
            request_id = %replay.id(),
            "renewed access credential is not a valid header value, replaying unauthenticated"
        );
    }
    metrics::record_replay();
    replay
}
