//! Server-Sent-Events decoding: line scanner and event loop.

pub mod event;
pub mod reader;
pub mod scanner;

pub use event::Event;
pub use reader::SseEventReader;
pub use scanner::SseLineScanner;

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::TransportError;

/// A live response body as a stream of chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;
