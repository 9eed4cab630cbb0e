//! Single-producer/single-consumer FIFO with a non-blocking push.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::TransportError;

/// An item carried from the stream worker to the reader.
///
/// Exactly one `Terminal` is pushed per stream, and it is always the last
/// item. `Ok(())` marks a clean end-of-stream.
#[derive(Debug)]
pub enum QueueItem<T> {
    Event(T),
    Terminal(Result<(), TransportError>),
}

/// Create a queue split into its producer and consumer halves.
pub fn unbounded_queue<T>() -> (QueueProducer<T>, QueueConsumer<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueueProducer { tx }, QueueConsumer { rx })
}

/// Producer half. Not `Clone`: one producer per queue.
#[derive(Debug)]
pub struct QueueProducer<T> {
    tx: UnboundedSender<T>,
}

impl<T> QueueProducer<T> {
    /// Enqueue `item` without waiting. Returns `false` if the consumer is gone,
    /// in which case the item is dropped.
    pub fn push(&self, item: T) -> bool {
        self.tx.send(item).is_ok()
    }

    #[cfg(test)]
    pub(crate) fn is_consumer_gone(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half.
#[derive(Debug)]
pub struct QueueConsumer<T> {
    rx: UnboundedReceiver<T>,
}

impl<T> QueueConsumer<T> {
    /// Wait for the next item in FIFO order.
    ///
    /// Returns `None` only once the producer is dropped and every pushed item
    /// has been taken. Cancel-safe: an item is never lost if this future is
    /// dropped before it resolves.
    pub async fn pop(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take the next item if one is already queued.
    #[cfg(test)]
    pub(crate) fn try_pop(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting new items; already queued items can still be popped.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
