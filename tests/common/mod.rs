//! Shared test helpers and a scripted HTTP backend.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};

use streamrpc::error::TransportError;
use streamrpc::transport::{HttpBackend, HttpRequest, HttpResponse, Transport, TransportHandler};
use streamrpc::{config::TransportConfig, context::Context, types::Peer};

/// A backend that answers every request with the same canned response,
/// delivering the body in exactly the chunks it was given.
pub struct ScriptedBackend {
    status: u16,
    content_type: Option<String>,
    chunks: Vec<Result<Bytes, TransportError>>,
    stall_after_body: bool,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedBackend {
    pub fn new(status: u16, content_type: Option<&str>, chunks: &[&'static [u8]]) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            chunks: chunks.iter().map(|&c| Ok(Bytes::from_static(c))).collect(),
            stall_after_body: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// An SSE reply delivered in the given chunks.
    pub fn sse(chunks: &[&'static [u8]]) -> Self {
        Self::new(200, Some("text/event-stream"), chunks)
    }

    /// Keep the body open after the last chunk instead of ending it.
    pub fn stalling(mut self) -> Self {
        self.stall_after_body = true;
        self
    }

    /// End the body with an I/O error after the scripted chunks.
    pub fn failing_with(mut self, error: TransportError) -> Self {
        self.chunks.push(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpBackend for ScriptedBackend {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        let body = stream::iter(self.chunks.clone());
        let body = if self.stall_after_body {
            body.chain(stream::pending()).boxed()
        } else {
            body.boxed()
        };
        Ok(HttpResponse::new(self.status, self.content_type.clone(), body))
    }
}

/// Build a client transport over `backend`.
pub fn scripted_transport(backend: Arc<ScriptedBackend>) -> Transport {
    TransportHandler::new(TransportConfig::default())
        .with_backend(backend)
        .new_transport(&Context::background(), &Peer::new("http://scripted.test/rpc"))
        .expect("transport")
}
