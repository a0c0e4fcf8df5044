//! Injected transport capability.
//!
//! The concrete request mechanism is passed in, not discovered: senders and
//! receivers hold a `Transport` and never touch reqwest directly. Tests
//! substitute scripted transports.

use crate::error::{ChatError, TransportError};
use async_trait::async_trait;
use std::time::Duration;

/// Response to a transport call: status code and body text. Non-success
/// statuses are returned as-is; the caller decides what they mean.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One-shot request capability: `send_text` for the sender, `poll` for the
/// receiver. Timeouts, if any, live behind this trait and are opaque to both.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST raw text to a service path; resolves when the request completes.
    async fn send_text(&self, path: &str, body: String)
        -> Result<TransportResponse, TransportError>;

    /// GET a service path, suspending until the server answers. The long-poll
    /// hold happens here: the request may stay pending until the server has
    /// data or gives up.
    async fn poll(&self, path: &str) -> Result<TransportResponse, TransportError>;
}

/// HTTP transport over reqwest, rooted at a service base URL.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport for the given base URL (e.g. `http://127.0.0.1:16161`).
    /// `request_timeout`, when set, applies to every request, polls included —
    /// leave it unset so the relay controls how long a poll is held.
    pub fn new(base_url: &str, request_timeout: Option<Duration>) -> Result<Self, ChatError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = request_timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| ChatError::TransportUnavailable(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_text(
        &self,
        path: &str,
        body: String,
    ) -> Result<TransportResponse, TransportError> {
        let res = self
            .client
            .post(self.url(path))
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Ok(TransportResponse { status, body })
    }

    async fn poll(&self, path: &str) -> Result<TransportResponse, TransportError> {
        let res = self.client.get(self.url(path)).send().await?;
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Ok(TransportResponse { status, body })
    }
}
