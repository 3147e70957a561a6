//! Scripted transport for unit tests

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use session_auth::REFRESH_PATH;

use crate::error::{Error, Result};
use crate::notifier::{SessionEvent, SessionNotifier};
use crate::request::{ApiResponse, RequestDescriptor};
use crate::transport::Transport;

/// What the scripted transport answers for one request.
pub(crate) struct MockReply {
    status: StatusCode,
    body: serde_json::Value,
    delay: Duration,
    unreachable: bool,
    panics: bool,
}

impl MockReply {
    pub(crate) fn ok(body: serde_json::Value) -> Self {
        Self::status(200).with_body(body)
    }

    pub(crate) fn status(code: u16) -> Self {
        Self {
            status: StatusCode::from_u16(code).unwrap(),
            body: serde_json::json!({}),
            delay: Duration::ZERO,
            unreachable: false,
            panics: false,
        }
    }

    pub(crate) fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::status(502)
        }
    }

    /// The transport panics while answering.
    pub(crate) fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::status(500)
        }
    }

    pub(crate) fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }

    pub(crate) fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Handler = dyn Fn(&RequestDescriptor) -> MockReply + Send + Sync;

/// Transport that answers from a closure and records every request it sees.
pub(crate) struct MockTransport {
    handler: Box<Handler>,
    sent: Mutex<Vec<RequestDescriptor>>,
}

impl MockTransport {
    pub(crate) fn new(
        handler: impl Fn(&RequestDescriptor) -> MockReply + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn sent(&self) -> Vec<RequestDescriptor> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.sent().iter().filter(|r| r.targets(path)).count()
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.calls_to(REFRESH_PATH)
    }
}

impl Transport for MockTransport {
    fn send<'a>(
        &'a self,
        request: &'a RequestDescriptor,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>> {
        self.sent.lock().unwrap().push(request.clone());
        let reply = (self.handler)(request);
        Box::pin(async move {
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            if reply.panics {
                panic!("transport crashed");
            }
            if reply.unreachable {
                return Err(Error::Transport("connection refused".into()));
            }
            let body = Bytes::from(serde_json::to_vec(&reply.body).unwrap());
            Ok(ApiResponse::new(reply.status, HeaderMap::new(), body))
        })
    }
}

/// Counts of each session event published on a notifier.
#[derive(Clone, Default)]
pub(crate) struct EventCounts {
    refreshed: Arc<AtomicUsize>,
    expired: Arc<AtomicUsize>,
}

impl EventCounts {
    pub(crate) fn attach(notifier: &SessionNotifier) -> Self {
        let counts = Self::default();
        let handle = counts.clone();
        notifier.register(move |event| match event {
            SessionEvent::TokenRefreshed(_) => {
                handle.refreshed.fetch_add(1, Ordering::SeqCst);
            }
            SessionEvent::TokenExpired => {
                handle.expired.fetch_add(1, Ordering::SeqCst);
            }
        });
        counts
    }

    pub(crate) fn refreshed(&self) -> usize {
        self.refreshed.load(Ordering::SeqCst)
    }

    pub(crate) fn expired(&self) -> usize {
        self.expired.load(Ordering::SeqCst)
    }
}

/// Scripted storefront API: the refresh endpoint answers `refresh_reply`,
/// every other path succeeds only with `Bearer {valid_access}` and echoes its url.
pub(crate) fn storefront(
    valid_access: &'static str,
    refresh_reply: impl Fn() -> MockReply + Send + Sync + 'static,
) -> Arc<MockTransport> {
    MockTransport::new(move |request| {
        if request.targets(REFRESH_PATH) {
            return refresh_reply();
        }
        if request.bearer() == Some(valid_access) {
            MockReply::ok(serde_json::json!({ "url": request.url() }))
        } else {
            MockReply::status(401).with_body(serde_json::json!({ "error": "token expired" }))
        }
    })
}
