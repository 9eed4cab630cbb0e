//! streamrpc: JSON-RPC over HTTP with buffered and streamed replies.
//!
//! Each round trip is one `POST`. A `200` reply with `application/json` is
//! read whole and yields a single message; a `200` reply with
//! `text/event-stream` is decoded incrementally by a background worker and
//! yields one message per SSE event.
//!
//! # Quick Start
//!
//! ```no_run
//! use streamrpc::prelude::*;
//!
//! # async fn example() -> streamrpc::error::Result<()> {
//! let ctx = Context::background().with_metadata("x-request-id", "42");
//! let transport = TransportHandler::new(TransportConfig::from_env()?)
//!     .new_transport(&ctx, &Peer::new("http://localhost:8080/mcp"))?;
//! let rounder = transport.client_capability().expect("client transport");
//!
//! let request = Message::request(1, "tools/list", serde_json::json!({}));
//! let mut reader = rounder.round(&ctx, &request).await?;
//! while let Some(message) = reader.read(&ctx).await? {
//!     println!("{}", message.as_value());
//! }
//! reader.close();
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod prelude;
pub mod sse;
pub mod stream;
pub mod transport;
pub mod types;
