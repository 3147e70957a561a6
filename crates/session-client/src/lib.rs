//! Authenticated API client with single-flight credential refresh
//!
//! Every outbound call carries the session's access credential. When the API
//! answers 401, the request is handed to the refresh coordinator, which makes
//! sure only one refresh call is in flight no matter how many requests failed
//! at once, then replays each of them with the renewed credential.
//!
//! Request lifecycle:
//! 1. `Interceptor` attaches `Authorization: Bearer <access>`
//! 2. `Transport` sends the request
//! 3. On failure, `classify` decides between pass-through and refresh
//! 4. `RefreshCoordinator::renew` joins or starts the single refresh
//! 5. `replay::rebuild` re-issues the request with the new credential
//! 6. `SessionNotifier` announces `TokenRefreshed` or `TokenExpired`

pub mod classify;
pub mod client;
pub mod coordinator;
pub mod error;
pub mod interceptor;
pub mod metrics;
pub mod notifier;
pub mod replay;
pub mod request;
pub mod transport;

#[cfg(test)]
mod testing;

pub use classify::{Disposition, classify};
pub use client::{AuthClient, ClientConfig};
pub use coordinator::{RefreshCoordinator, RefreshState};
pub use error::{Error, Result};
pub use interceptor::Interceptor;
pub use notifier::{SessionEvent, SessionNotifier, SubscriberId};
pub use request::{ApiResponse, RequestDescriptor};
pub use transport::{ReqwestTransport, Transport};
