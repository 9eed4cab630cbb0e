//! Client transport: HTTP round trips answered by a buffered reply or an SSE stream.

pub mod handler;
pub mod http;
pub mod ping_pong;
pub mod reader;
pub mod rounder;

pub use handler::TransportHandler;
pub use http::{HttpBackend, HttpRequest, HttpResponse, MediaType, ReqwestBackend};
pub use ping_pong::PingPongReader;
pub use reader::{into_message_stream, MessageReader};
pub use rounder::Rounder;

use std::sync::Arc;

/// Server-side role of a transport. This crate only builds client transports,
/// so no transport it creates carries one.
pub trait ServerCapability: Send + Sync {
    fn address(&self) -> &str;
}

/// A transport for one logical connection.
///
/// Roles are queried as capabilities rather than expressed through the
/// type: a client transport answers `client_capability` and nothing else.
#[derive(Debug)]
pub struct Transport {
    client: Option<Rounder>,
    server: Option<Arc<dyn ServerCapability>>,
}

impl Transport {
    pub fn client(rounder: Rounder) -> Self {
        Self {
            client: Some(rounder),
            server: None,
        }
    }

    pub fn client_capability(&self) -> Option<&Rounder> {
        self.client.as_ref()
    }

    pub fn server_capability(&self) -> Option<&dyn ServerCapability> {
        self.server.as_deref()
    }
}

impl std::fmt::Debug for dyn ServerCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerCapability")
            .field("address", &self.address())
            .finish()
    }
}
