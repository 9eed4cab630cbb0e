//! Core types for streamrpc.

pub mod message;
pub mod peer;

pub use message::*;
pub use peer::*;
