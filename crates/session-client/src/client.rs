//! Authenticated API client
//!
//! `AuthClient` wires the interceptor, transport, classifier, coordinator and
//! replayer together. A call goes out with the current access credential;
//! an eligible 401 is renewed through the coordinator and the call is replayed
//! once with the renewed credential. The caller only ever sees the final
//! result.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use session_auth::{
    CredentialKind, CredentialStore, LOGOUT_PATH, LogoutRequest, REFRESH_PATH,
};
use tracing::{debug, info, instrument, warn};

use crate::classify::{Disposition, classify};
use crate::coordinator::{RefreshCoordinator, RefreshState};
use crate::error::{Error, Result};
use crate::interceptor::Interceptor;
use crate::notifier::SessionNotifier;
use crate::replay;
use crate::request::{ApiResponse, RequestDescriptor};
use crate::transport::Transport;

/// Default bound on one refresh call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Endpoint paths and limits of the session flow.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub refresh_path: String,
    pub logout_path: String,
    pub refresh_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            refresh_path: REFRESH_PATH.to_string(),
            logout_path: LOGOUT_PATH.to_string(),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    notifier: Arc<SessionNotifier>,
    interceptor: Interceptor,
    coordinator: RefreshCoordinator,
    config: ClientConfig,
}

/// Cheap to clone; clones share one session and one refresh coordinator.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<ClientInner>,
}

impl AuthClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<CredentialStore>,
        config: ClientConfig,
    ) -> Self {
        let notifier = Arc::new(SessionNotifier::new());
        let coordinator = RefreshCoordinator::new(
            transport.clone(),
            store.clone(),
            notifier.clone(),
            config.refresh_path.clone(),
            config.refresh_timeout,
        );
        Self {
            inner: Arc::new(ClientInner {
                interceptor: Interceptor::new(store.clone()),
                transport,
                store,
                notifier,
                coordinator,
                config,
            }),
        }
    }

    /// Send a request, renewing the session and replaying once on an
    /// eligible 401.
    ///
    /// Non-success statuses are returned as `Error::Status` carrying the
    /// response.
    #[instrument(skip_all, fields(request_id = %request.id(), method = %request.method(), url = %request.url()))]
    pub async fn execute(&self, mut request: RequestDescriptor) -> Result<ApiResponse> {
        self.inner.interceptor.attach(&mut request).await;

        loop {
            let err = match self.dispatch(&request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            match classify(Some(&request), &err, &self.inner.config.refresh_path) {
                Disposition::PassThrough => {
                    debug!(error = %err, retried = request.is_retried(), "request failed");
                    return Err(err);
                }
                Disposition::RefreshEndpointFailed => {
                    warn!(error = %err, "refresh endpoint call failed");
                    self.inner.coordinator.reset();
                    return Err(err);
                }
                Disposition::Refresh => {
                    info!("access credential rejected, renewing session");
                    let access = self.inner.coordinator.renew(&mut request).await?;
                    request = replay::rebuild(&request, &access);
                }
            }
        }
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.execute(RequestDescriptor::get(path)).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.execute(RequestDescriptor::post(path).json(body)?).await
    }

    pub async fn put_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.execute(RequestDescriptor::put(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.execute(RequestDescriptor::delete(path)).await
    }

    /// Start a session with credentials from login, registration or a
    /// federated provider. Replaces any previous pair.
    pub async fn sign_in(&self, access: &str, refresh: Option<&str>) -> Result<()> {
        self.inner.store.replace(access, refresh).await?;
        info!(has_refresh = refresh.is_some(), "signed in");
        Ok(())
    }

    /// End the session.
    ///
    /// Tells the API to revoke the refresh credential when one is stored. That
    /// call is best effort; the local credentials are cleared regardless.
    pub async fn logout(&self) -> Result<()> {
        if let Some(refresh) = self.inner.store.get(CredentialKind::Refresh).await {
            let mut request = RequestDescriptor::post(self.inner.config.logout_path.as_str())
                .json(&LogoutRequest { refresh: &refresh })?
                .skip_auth_refresh();
            self.inner.interceptor.attach(&mut request).await;
            match self.dispatch(&request).await {
                Ok(_) => debug!("refresh credential revoked"),
                Err(e) => warn!(error = %e, "logout call failed, clearing local session anyway"),
            }
        }
        self.inner.store.clear().await?;
        info!("signed out");
        Ok(())
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.inner.coordinator.state()
    }

    pub fn notifier(&self) -> &SessionNotifier {
        &self.inner.notifier
    }

    pub fn credential_store(&self) -> &Arc<CredentialStore> {
        &self.inner.store
    }

    async fn dispatch(&self, request: &RequestDescriptor) -> Result<ApiResponse> {
        let response = self.inner.transport.send(request).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Error::Status(Box::new(response)))
        }
    }
}
