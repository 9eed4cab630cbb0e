//! Producer/consumer bridge between the SSE worker and the reader.

pub mod bridge;
pub mod queue;

pub use bridge::StreamBridge;
pub use queue::{unbounded_queue, QueueConsumer, QueueItem, QueueProducer};
