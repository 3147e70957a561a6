//! Single-flight refresh coordinator
//!
//! Owns the client's refresh state. The first eligible failure observed while
//! idle starts exactly one refresh; every failure that arrives while it is in
//! flight awaits the same outcome instead of starting another.
//!
//! The refresh runs as a spawned task whose result is wrapped in a `Shared`
//! future held in the state slot. Waiters clone that future, so the outcome
//! (new access credential or terminal error) is fanned out to all of them.
//! The task updates or clears the credential store, returns the slot to idle,
//! and publishes the lifecycle event before its output becomes visible, so no
//! waiter is released before the outcome is settled.
//!
//! State transitions:
//! - Idle → Refreshing (eligible failure, new generation)
//! - Refreshing → Idle (refresh task finished, same generation)
//! - Refreshing → Idle (forced by `reset` after the refresh endpoint failed)

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use common::Secret;
use futures_util::FutureExt;
use futures_util::future::Shared;
use session_auth::{
    CredentialKind, CredentialPair, CredentialStore, RefreshRequest, TokenGrant,
    parse_refresh_response,
};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::metrics;
use crate::notifier::{SessionEvent, SessionNotifier};
use crate::request::RequestDescriptor;
use crate::transport::Transport;

type RefreshOutcome = Pin<Box<dyn Future<Output = Result<Secret<String>>> + Send>>;

/// Observable refresh state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

enum Slot {
    Idle,
    Refreshing {
        generation: u64,
        outcome: Shared<RefreshOutcome>,
    },
}

struct SlotState {
    slot: Slot,
    /// Last generation handed out; lets a finishing task tell whether the slot
    /// still belongs to it after a forced reset.
    generation: u64,
}

struct Inner {
    state: Mutex<SlotState>,
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    notifier: Arc<SessionNotifier>,
    refresh_path: String,
    timeout: Duration,
}

/// Coordinates credential renewal for one client instance.
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    /// `timeout` bounds the refresh call; expiry is a terminal refresh failure.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<CredentialStore>,
        notifier: Arc<SessionNotifier>,
        refresh_path: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SlotState {
                    slot: Slot::Idle,
                    generation: 0,
                }),
                transport,
                store,
                notifier,
                refresh_path: refresh_path.into(),
                timeout,
            }),
        }
    }

    pub fn state(&self) -> RefreshState {
        match self.inner.lock().slot {
            Slot::Idle => RefreshState::Idle,
            Slot::Refreshing { .. } => RefreshState::Refreshing,
        }
    }

    /// Obtain a renewed access credential for a request that failed with 401.
    ///
    /// Marks the request as retried. Starts a refresh when idle, otherwise
    /// waits on the one in flight. If the request was sent with a credential
    /// that has since been replaced, the current one is returned without a
    /// refresh call.
    pub async fn renew(&self, request: &mut RequestDescriptor) -> Result<Secret<String>> {
        request.mark_retried();

        if let Some(current) = self.rotated_since(request).await {
            debug!(request_id = %request.id(), "credential already renewed, skipping refresh");
            return Ok(current);
        }

        let outcome = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            let in_flight = match &state.slot {
                Slot::Refreshing {
                    generation,
                    outcome,
                } => Some((*generation, outcome.clone())),
                Slot::Idle => None,
            };
            match in_flight {
                Some((generation, outcome)) => {
                    debug!(request_id = %request.id(), generation, "refresh in flight, waiting");
                    metrics::record_refresh_waiter();
                    outcome
                }
                None => {
                    state.generation += 1;
                    let generation = state.generation;
                    debug!(request_id = %request.id(), generation, "starting refresh");
                    let outcome = spawn_refresh(self.inner.clone(), generation);
                    state.slot = Slot::Refreshing {
                        generation,
                        outcome: outcome.clone(),
                    };
                    outcome
                }
            }
        };

        outcome.await
    }

    /// Force the state back to idle.
    ///
    /// Requests already waiting keep the outcome they joined; the next
    /// eligible failure starts a new refresh.
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        if let Slot::Refreshing { generation, .. } = state.slot {
            warn!(generation, "forcing refresh state to idle");
        }
        state.slot = Slot::Idle;
    }

    async fn rotated_since(&self, request: &RequestDescriptor) -> Option<Secret<String>> {
        let sent = request.bearer()?;
        let current = self.inner.store.get(CredentialKind::Access).await?;
        (sent != current).then(|| Secret::new(current))
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return to idle if the slot still belongs to `generation`.
    fn finish(&self, generation: u64) {
        let mut state = self.lock();
        if matches!(state.slot, Slot::Refreshing { generation: current, .. } if current == generation)
        {
            state.slot = Slot::Idle;
        }
    }

    /// Exchange the stored refresh credential and store the result.
    ///
    /// Every failure path clears the session before returning.
    async fn refresh_session(&self) -> Result<TokenGrant> {
        let Some(refresh) = self.store.get(CredentialKind::Refresh).await else {
            warn!("no refresh credential stored, ending session");
            metrics::record_refresh("no_credential");
            self.end_session().await;
            return Err(Error::NoRefreshCredential);
        };

        let grant = match self.request_grant(&refresh).await {
            Ok(grant) => grant,
            Err(e) => {
                warn!(error = %e, "session refresh failed, ending session");
                let outcome = match e {
                    Error::RefreshTimeout(_) => "timeout",
                    _ => "failure",
                };
                metrics::record_refresh(outcome);
                self.end_session().await;
                return Err(e);
            }
        };

        if let Err(e) = self
            .store
            .set_pair(&grant.access, grant.refresh.as_deref())
            .await
        {
            warn!(error = %e, "failed to persist refreshed credentials");
        }
        metrics::record_refresh("success");
        Ok(grant)
    }

    /// The one network call of a refresh.
    async fn request_grant(&self, refresh: &str) -> Result<TokenGrant> {
        let request = RequestDescriptor::post(self.refresh_path.as_str())
            .json(&RefreshRequest { refresh })?
            .skip_auth_refresh();

        let response = tokio::time::timeout(self.timeout, self.transport.send(&request))
            .await
            .map_err(|_| Error::RefreshTimeout(self.timeout))?
            .map_err(|e| Error::RefreshFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::RefreshFailed(format!(
                "refresh endpoint returned {}: {}",
                response.status(),
                response.text()
            )));
        }

        parse_refresh_response(response.body()).map_err(|e| Error::RefreshFailed(e.to_string()))
    }

    async fn end_session(&self) {
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "failed to persist cleared credentials");
        }
    }
}

/// Spawn the refresh task and wrap its result for fan-out.
fn spawn_refresh(inner: Arc<Inner>, generation: u64) -> Shared<RefreshOutcome> {
    let task = tokio::spawn(run_refresh(inner.clone(), generation));
    let outcome: RefreshOutcome = Box::pin(async move {
        match task.await {
            Ok(result) => result,
            Err(e) => {
                warn!(generation, error = %e, "refresh task ended before settling");
                metrics::record_refresh("interrupted");
                inner.finish(generation);
                Err(Error::RefreshInterrupted(e.to_string()))
            }
        }
    });
    outcome.shared()
}

async fn run_refresh(inner: Arc<Inner>, generation: u64) -> Result<Secret<String>> {
    info!(generation, "refreshing session credentials");
    match inner.refresh_session().await {
        Ok(grant) => {
            let snapshot: CredentialPair = inner.store.pair().await;
            inner.finish(generation);
            info!(
                generation,
                rotated_refresh = grant.refresh.is_some(),
                "session refresh succeeded"
            );
            inner
                .notifier
                .publish(SessionEvent::TokenRefreshed(snapshot));
            Ok(Secret::new(grant.access))
        }
        Err(e) => {
            inner.finish(generation);
            inner.notifier.publish(SessionEvent::TokenExpired);
            Err(e)
        }
    }
}
