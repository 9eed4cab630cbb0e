//! One JSON-RPC round trip over HTTP.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tracing::{debug, debug_span, Instrument};
use uuid::Uuid;

use super::http::{apply_metadata, rpc_headers, HttpBackend, HttpRequest, MediaType};
use super::ping_pong::PingPongReader;
use super::reader::MessageReader;
use crate::codec::Codec;
use crate::context::Context;
use crate::error::{TransportError, BODY_EXCERPT_LIMIT};
use crate::sse::{SseEventReader, SseLineScanner};
use crate::stream::StreamBridge;
use crate::types::Message;

/// How long an error reply's body may take to yield its excerpt.
const ERROR_BODY_WAIT: Duration = Duration::from_secs(1);

/// Sends one message and returns a reader over the reply.
///
/// No retries: each call is exactly one HTTP exchange.
pub struct Rounder {
    backend: Arc<dyn HttpBackend>,
    url: Url,
    address: String,
    codec: Arc<dyn Codec>,
    max_token_size: usize,
}

impl Rounder {
    pub fn new(
        backend: Arc<dyn HttpBackend>,
        url: Url,
        address: impl Into<String>,
        codec: Arc<dyn Codec>,
        max_token_size: usize,
    ) -> Self {
        Self {
            backend,
            url,
            address: address.into(),
            codec,
            max_token_size,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Perform the round trip.
    ///
    /// An `application/json` reply is buffered and yields one message. A
    /// `text/event-stream` reply is handed to a background worker without
    /// buffering; the returned reader yields its messages as they arrive.
    pub async fn round(
        &self,
        ctx: &Context,
        message: &Message,
    ) -> Result<Box<dyn MessageReader>, TransportError> {
        let span = debug_span!(
            "round",
            round_id = %Uuid::new_v4(),
            address = %self.address,
            method = message.method()
        );
        self.round_inner(ctx, message).instrument(span).await
    }

    async fn round_inner(
        &self,
        ctx: &Context,
        message: &Message,
    ) -> Result<Box<dyn MessageReader>, TransportError> {
        let body = self.codec.encode(message)?;

        let mut headers = rpc_headers();
        if let Some(metadata) = ctx.metadata() {
            apply_metadata(&mut headers, metadata);
        }

        let request = HttpRequest {
            url: self.url.clone(),
            headers,
            body: body.into(),
        };
        let response = ctx.run(self.backend.post(request)).await??;

        debug!(
            status = response.status,
            content_type = response.content_type.as_deref(),
            "round response"
        );

        match response.status {
            200 => {}
            404 => {
                return Err(TransportError::NotFound {
                    address: self.address.clone(),
                })
            }
            status => {
                let body = ctx
                    .run(response.excerpt(BODY_EXCERPT_LIMIT, ERROR_BODY_WAIT))
                    .await?;
                return Err(TransportError::unexpected_status(status, &body));
            }
        }

        match response.media_type() {
            Some(MediaType::Json) => {
                let body = ctx.run(response.bytes()).await??;
                Ok(Box::new(PingPongReader::new(body, self.codec.clone())))
            }
            Some(MediaType::EventStream) => {
                let scanner =
                    SseLineScanner::with_max_token_size(response.into_stream(), self.max_token_size);
                let reader = SseEventReader::new(scanner);
                debug!("starting SSE stream bridge");
                Ok(Box::new(StreamBridge::spawn(ctx, reader, self.codec.clone())))
            }
            None => Err(TransportError::ContentType(
                response.content_type.unwrap_or_default(),
            )),
        }
    }
}

impl std::fmt::Debug for Rounder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rounder")
            .field("address", &self.address)
            .field("max_token_size", &self.max_token_size)
            .finish_non_exhaustive()
    }
}
