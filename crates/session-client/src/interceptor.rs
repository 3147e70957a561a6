//! Attaches the session's access credential to outbound requests

use std::sync::Arc;

use session_auth::{CredentialKind, CredentialStore};
use tracing::{debug, warn};

use crate::request::RequestDescriptor;

/// Adds `Authorization: Bearer <access>` when the session has an access
/// credential. Without one the request goes out unauthenticated and the API
/// decides whether that is acceptable.
pub struct Interceptor {
    store: Arc<CredentialStore>,
}

impl Interceptor {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }

    pub async fn attach(&self, request: &mut RequestDescriptor) {
        match self.store.get(CredentialKind::Access).await {
            Some(access) => {
                if !request.set_bearer(&access) {
                    warn!(
                        request_id = %request.id(),
                        "stored access credential is not a valid header value, sending unauthenticated"
                    );
                }
            }
            None => {
                debug!(request_id = %request.id(), "no access credential, sending unauthenticated");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{AUTHORIZATION, HeaderValue};
    use session_auth::StorageKeys;

    #[tokio::test]
    async fn attaches_stored_access_credential() {
        let store = Arc::new(CredentialStore::in_memory(StorageKeys::default()));
        store.set(CredentialKind::Access, "\"at_live\"").await.unwrap();
        let interceptor = Interceptor::new(store);

        let mut request = RequestDescriptor::get("/cart");
        interceptor.attach(&mut request).await;
        assert_eq!(request.bearer(), Some("at_live"));
    }

    #[tokio::test]
    async fn without_credential_leaves_request_untouched() {
        let store = Arc::new(CredentialStore::in_memory(StorageKeys::default()));
        let interceptor = Interceptor::new(store);

        let mut request = RequestDescriptor::get("/products");
        interceptor.attach(&mut request).await;
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn overwrites_caller_supplied_authorization() {
        let store = Arc::new(CredentialStore::in_memory(StorageKeys::default()));
        store.set(CredentialKind::Access, "at_session").await.unwrap();
        let interceptor = Interceptor::new(store);

        let mut request = RequestDescriptor::get("/orders")
            .header(AUTHORIZATION, HeaderValue::from_static("Bearer at_caller"));
        interceptor.attach(&mut request).await;
        assert_eq!(request.bearer(), Some("at_session"));
    }
}
