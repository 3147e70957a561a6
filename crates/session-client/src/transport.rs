//! Transport abstraction for outbound API calls
//!
//! The client never talks to reqwest directly; it sends `RequestDescriptor`s
//! through a `Transport`. Production code uses `ReqwestTransport`, tests plug
//! in a scripted transport. Uses `Pin<Box<dyn Future>>` return types for
//! dyn-compatibility (`Arc<dyn Transport>`).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::request::{ApiResponse, RequestDescriptor};

/// Sends a request and buffers the response.
///
/// Any response that arrives, whatever its status, is `Ok`; `Err` is reserved
/// for calls that produced no response at all.
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a RequestDescriptor,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>>;
}

/// HTTP transport backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Relative request urls are resolved against `base_url`; `timeout`
    /// bounds each individual call.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Absolute url for a request target.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_owned();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(
        &'a self,
        request: &'a RequestDescriptor,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.resolve(request.url());
            let mut builder = self
                .client
                .request(request.method().clone(), url.as_str())
                .headers(request.headers().clone())
                .timeout(self.timeout);
            if let Some(body) = request.body_bytes() {
                builder = builder.body(body.clone());
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    Error::Transport(format!("request to {url} timed out: {e}"))
                } else {
                    Error::Transport(format!("request to {url} failed: {e}"))
                }
            })?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|e| Error::Transport(format!("reading response from {url}: {e}")))?;

            debug!(request_id = %request.id(), %status, bytes = body.len(), "response received");
            Ok(ApiResponse::new(status, headers, body))
        })
    }
}
