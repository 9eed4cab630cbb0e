//! Convenience re-exports for common use.

pub use crate::codec::{Codec, JsonCodec};
pub use crate::config::TransportConfig;
pub use crate::context::{Context, Metadata};
pub use crate::error::{Result, TransportError};
pub use crate::transport::{
    into_message_stream, HttpBackend, MessageReader, Rounder, Transport, TransportHandler,
};
pub use crate::types::{Message, Peer};
