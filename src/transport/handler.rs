//! Transport factory.

use std::sync::Arc;

use tracing::debug;

use super::http::{HttpBackend, ReqwestBackend};
use super::rounder::Rounder;
use super::Transport;
use crate::codec::{Codec, JsonCodec};
use crate::config::TransportConfig;
use crate::context::Context;
use crate::error::TransportError;
use crate::types::Peer;

/// Creates client transports for peers.
///
/// Uses the explicitly configured backend when one is set, otherwise builds
/// a default reqwest client with the configured dial timeout.
#[derive(Clone)]
pub struct TransportHandler {
    config: TransportConfig,
    backend: Option<Arc<dyn HttpBackend>>,
    codec: Arc<dyn Codec>,
}

impl std::fmt::Debug for TransportHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportHandler")
            .field("config", &self.config)
            .field("backend", &self.backend.as_ref().map(|_| ".."))
            .finish_non_exhaustive()
    }
}

impl Default for TransportHandler {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl TransportHandler {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            backend: None,
            codec: Arc::new(JsonCodec),
        }
    }

    /// Use `backend` for every transport instead of the default client.
    pub fn with_backend(mut self, backend: Arc<dyn HttpBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use a caller-built reqwest client.
    pub fn with_client(self, client: reqwest::Client) -> Self {
        self.with_backend(Arc::new(ReqwestBackend::new(client)))
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Create a client transport for `peer`.
    pub fn new_transport(&self, ctx: &Context, peer: &Peer) -> Result<Transport, TransportError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        let url = peer.url()?;

        let backend: Arc<dyn HttpBackend> = match &self.backend {
            Some(backend) => backend.clone(),
            None => Arc::new(ReqwestBackend::from_config(&self.config)?),
        };

        debug!(
            address = %peer.address,
            explicit_backend = self.backend.is_some(),
            max_token_size = self.config.effective_max_token_size(),
            "creating client transport"
        );

        Ok(Transport::client(Rounder::new(
            backend,
            url,
            peer.address.clone(),
            self.codec.clone(),
            self.config.effective_max_token_size(),
        )))
    }
}
