//! Refresh-flow metrics
//!
//! Emitted through the `metrics` facade; the embedding application decides
//! whether and where to export them.
//!
//! - `session_refresh_total` (counter): label `outcome`
//!   (`success`, `failure`, `timeout`, `no_credential`, `interrupted`)
//! - `session_refresh_waiters_total` (counter): requests that joined an
//!   in-flight refresh instead of starting one
//! - `session_replays_total` (counter): requests re-issued with a renewed
//!   credential

/// Record the outcome of one refresh attempt.
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("session_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a request that waited on an already running refresh.
pub fn record_refresh_waiter() {
    metrics::counter!("session_refresh_waiters_total").increment(1);
}

/// Record a request replayed after renewal.
pub fn record_replay() {
    metrics::counter!("session_replays_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        // With no recorder installed the macros are no-ops
        record_refresh("success");
        record_refresh("timeout");
        record_refresh_waiter();
        record_replay();
    }
}
