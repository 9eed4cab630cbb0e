//! HTTP backends, request headers, and response media types.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use strum::{Display, EnumString};
use tokio::time::Instant;
use tracing::warn;

use crate::config::TransportConfig;
use crate::context::Metadata;
use crate::error::TransportError;
use crate::sse::ByteStream;

/// `Accept` value sent with every round trip.
pub const ACCEPT_RPC: &str = "application/json,text/event-stream";

/// Response media types the transport understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum MediaType {
    #[strum(serialize = "application/json")]
    Json,
    #[strum(serialize = "text/event-stream")]
    EventStream,
}

impl MediaType {
    /// Parse a `Content-Type` header value, ignoring parameters.
    pub fn from_content_type(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or_default().trim();
        essence.parse().ok()
    }
}

/// An outbound `POST`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A response whose body has not been read yet.
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    body: ByteStream,
}

impl HttpResponse {
    pub fn new(status: u16, content_type: Option<String>, body: ByteStream) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    pub fn media_type(&self) -> Option<MediaType> {
        self.content_type.as_deref().and_then(MediaType::from_content_type)
    }

    /// Hand over the live body without buffering it.
    pub fn into_stream(self) -> ByteStream {
        self.body
    }

    /// Read the whole body into memory.
    pub async fn bytes(mut self) -> Result<Bytes, TransportError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Read up to `limit` bytes of the body as text, giving up after `wait`.
    ///
    /// For error replies, whose bodies may be huge or never end. Body errors
    /// just stop the read; whatever arrived so far is returned.
    pub async fn excerpt(mut self, limit: usize, wait: Duration) -> String {
        let deadline = Instant::now() + wait;
        let mut buf = BytesMut::new();
        while buf.len() <= limit {
            match tokio::time::timeout_at(deadline, self.body.next()).await {
                Ok(Some(Ok(chunk))) => buf.extend_from_slice(&chunk),
                _ => break,
            }
        }
        // Keep one char past the limit so the caller can tell it was cut.
        buf.truncate(limit + 4);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("body", &"..")
            .finish()
    }
}

/// Strategy for performing the HTTP exchange of a round trip.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Backend over a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    /// Wrap a caller-configured client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build the default client: bounded connect timeout, optional whole
    /// request timeout and user agent.
    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.dial_timeout())
            .pool_max_idle_per_host(10);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder.build().map_err(|e| {
            TransportError::Configuration(format!("failed to build HTTP client: {e}"))
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let resp = self
            .client
            .post(request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed();

        Ok(HttpResponse::new(status, content_type, body))
    }
}

/// Build the protocol headers of a round trip.
pub fn rpc_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_RPC));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// Mirror ambient metadata onto `headers`.
///
/// Entries that are not valid header names or values are skipped, as are
/// attempts to override `Accept` or `Content-Type`.
pub fn apply_metadata(headers: &mut HeaderMap, metadata: &Metadata) {
    for (key, value) in metadata {
        let name = match HeaderName::from_bytes(key.as_bytes()) {
            Ok(name) => name,
            Err(_) => {
                warn!(key = %key, "skipping metadata with invalid header name");
                continue;
            }
        };
        if name == ACCEPT || name == CONTENT_TYPE {
            warn!(key = %key, "metadata may not override protocol header");
            continue;
        }
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(_) => warn!(key = %key, "skipping metadata with invalid header value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_ignores_parameters_and_case() {
        assert_eq!(
            MediaType::from_content_type("application/json; charset=utf-8"),
            Some(MediaType::Json)
        );
        assert_eq!(
            MediaType::from_content_type("Text/Event-Stream"),
            Some(MediaType::EventStream)
        );
        assert_eq!(MediaType::from_content_type("text/plain"), None);
        assert_eq!(MediaType::from_content_type(""), None);
    }

    #[test]
    fn rpc_headers_carry_accept_and_content_type() {
        let headers = rpc_headers();
        assert_eq!(headers[ACCEPT], ACCEPT_RPC);
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn metadata_is_mirrored_except_protected_and_invalid_entries() {
        let mut headers = rpc_headers();
        let mut metadata = Metadata::new();
        metadata.insert("x-request-id".into(), "abc".into());
        metadata.insert("Content-Type".into(), "text/plain".into());
        metadata.insert("bad header".into(), "x".into());
        metadata.insert("x-bad-value".into(), "line\nbreak".into());
        apply_metadata(&mut headers, &metadata);

        assert_eq!(headers["x-request-id"], "abc");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert!(headers.get("x-bad-value").is_none());
        assert_eq!(headers.len(), 3);
    }

    #[tokio::test]
    async fn excerpt_stops_at_limit_on_an_endless_body() {
        let body = futures::stream::repeat_with(|| Ok(Bytes::from_static(b"abcdefgh"))).boxed();
        let response = HttpResponse::new(500, None, body);
        let text = response.excerpt(64, Duration::from_secs(5)).await;
        assert_eq!(text.len(), 68);
    }

    #[tokio::test(start_paused = true)]
    async fn excerpt_returns_partial_body_when_it_stalls() {
        let body = futures::stream::iter(vec![Ok(Bytes::from_static(b"oops"))])
            .chain(futures::stream::pending())
            .boxed();
        let response = HttpResponse::new(500, Some("text/plain".into()), body);
        assert_eq!(response.excerpt(512, Duration::from_secs(1)).await, "oops");
    }

    #[test]
    fn default_backend_builds_from_config() {
        let config = TransportConfig::builder()
            .dial_timeout_ms(500)
            .request_timeout_ms(1_000)
            .user_agent("streamrpc-test".to_string())
            .build();
        assert!(ReqwestBackend::from_config(&config).is_ok());
    }
}
