//! Background worker that drains an SSE body into a queue.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::queue::{unbounded_queue, QueueConsumer, QueueItem, QueueProducer};
use crate::codec::Codec;
use crate::context::Context;
use crate::error::TransportError;
use crate::sse::{Event, SseEventReader};
use crate::transport::reader::MessageReader;
use crate::types::Message;

/// Streams decoded messages from a live SSE body.
///
/// The worker task starts on construction and runs until the body ends,
/// fails, or the bridge's context is cancelled. Once a read observes the end
/// (or an error), the bridge is terminal and every later read returns the
/// same outcome without touching the network.
pub struct StreamBridge {
    consumer: QueueConsumer<QueueItem<Event>>,
    ctx: Context,
    codec: Arc<dyn Codec>,
    terminal: Option<Result<(), TransportError>>,
    worker: JoinHandle<()>,
}

impl StreamBridge {
    /// Spawn the worker for `reader` under a context derived from `ctx`.
    pub fn spawn<S>(ctx: &Context, reader: SseEventReader<S>, codec: Arc<dyn Codec>) -> Self
    where
        S: Stream<Item = Result<Bytes, TransportError>> + Unpin + Send + 'static,
    {
        let worker_ctx = ctx.with_cancel();
        let (producer, consumer) = unbounded_queue();
        let worker = tokio::spawn(run_worker(worker_ctx.clone(), reader, producer));

        Self {
            consumer,
            ctx: worker_ctx,
            codec,
            terminal: None,
            worker,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Whether the worker task has exited.
    #[cfg(test)]
    pub(crate) fn is_worker_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Read the next message, waiting for the worker if needed.
    pub async fn read(&mut self, ctx: &Context) -> Result<Option<Message>, TransportError> {
        loop {
            if let Some(outcome) = &self.terminal {
                return replay(outcome);
            }
            if let Some(err) = ctx.err().or_else(|| self.ctx.err()) {
                return self.finish(Err(err));
            }

            let next = tokio::select! {
                biased;
                err = ctx.done() => Err(err),
                err = self.ctx.done() => Err(err),
                item = self.consumer.pop() => Ok(item),
            };

            match next {
                Err(err) => return self.finish(Err(err)),
                Ok(Some(QueueItem::Terminal(outcome))) => return self.finish(outcome),
                Ok(Some(QueueItem::Event(event))) => {
                    if event.data.is_empty() {
                        trace!(kind = event.kind(), id = event.id.as_deref(), "skipping SSE event without data");
                        continue;
                    }
                    return self.decode(&event).map(Some);
                }
                Ok(None) => {
                    return self.finish(Err(TransportError::Stream(
                        "stream worker exited without a terminal item".into(),
                    )))
                }
            }
        }
    }

    /// Mark the bridge terminal and stop the worker. Does not wait for it.
    pub fn close(&mut self) {
        if self.terminal.is_some() {
            return;
        }
        debug!("closing SSE stream bridge");
        self.terminal = Some(Ok(()));
        self.consumer.close();
        self.ctx.cancel();
    }

    fn finish(&mut self, outcome: Result<(), TransportError>) -> Result<Option<Message>, TransportError> {
        match &outcome {
            Ok(()) => debug!("SSE stream reached end of stream"),
            Err(err) => debug!(error = %err, "SSE stream ended with error"),
        }
        self.ctx.cancel();
        let result = replay(&outcome);
        self.terminal = Some(outcome);
        result
    }

    fn decode(&self, event: &Event) -> Result<Message, TransportError> {
        let (messages, _) = self.codec.decode(event.data.as_bytes())?;
        if messages.len() > 1 {
            // Only the first message of a frame is surfaced.
            debug!(dropped = messages.len() - 1, "SSE frame decoded to several messages");
        }
        messages
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::Decode("SSE event carried no message".into()))
    }
}

impl Drop for StreamBridge {
    fn drop(&mut self) {
        self.ctx.cancel();
    }
}

#[async_trait]
impl MessageReader for StreamBridge {
    async fn read(&mut self, ctx: &Context) -> Result<Option<Message>, TransportError> {
        StreamBridge::read(self, ctx).await
    }

    fn close(&mut self) {
        StreamBridge::close(self)
    }
}

async fn run_worker<S>(ctx: Context, reader: SseEventReader<S>, producer: QueueProducer<QueueItem<Event>>)
where
    S: Stream<Item = Result<Bytes, TransportError>> + Unpin,
{
    let outcome = reader
        .for_each(&ctx, |event| {
            if producer.push(QueueItem::Event(event)) {
                Ok(())
            } else {
                Err(TransportError::Cancelled)
            }
        })
        .await;
    // The loop has returned, so this is the last item ever pushed.
    producer.push(QueueItem::Terminal(outcome));
}

fn replay(outcome: &Result<(), TransportError>) -> Result<Option<Message>, TransportError> {
    match outcome {
        Ok(()) => Ok(None),
        Err(err) => Err(err.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::sse::{ByteStream, SseLineScanner};
    use futures::stream::{self, StreamExt};
    use serde_json::json;
    use std::time::Duration;

    fn bridge_over(body: ByteStream, ctx: &Context) -> StreamBridge {
        let reader = SseEventReader::new(SseLineScanner::new(body));
        StreamBridge::spawn(ctx, reader, Arc::new(JsonCodec))
    }

    fn body(raw: &'static [u8]) -> ByteStream {
        stream::iter(vec![Ok(Bytes::from_static(raw))]).boxed()
    }

    fn stalled(raw: &'static [u8]) -> ByteStream {
        stream::iter(vec![Ok(Bytes::from_static(raw))])
            .chain(stream::pending())
            .boxed()
    }

    async fn wait_for_worker(bridge: &StreamBridge) {
        for _ in 0..200 {
            if bridge.is_worker_finished() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("worker did not exit");
    }

    #[tokio::test]
    async fn n_events_take_n_plus_one_reads() {
        let ctx = Context::background();
        let mut bridge = bridge_over(
            body(b"data: {\"id\":1}\n\ndata: {\"id\":2}\n\ndata: {\"id\":3}\n\n"),
            &ctx,
        );
        for id in 1..=3 {
            let msg = bridge.read(&ctx).await.unwrap().expect("message");
            assert_eq!(msg.id(), Some(&json!(id)));
        }
        assert!(bridge.read(&ctx).await.unwrap().is_none());
        assert!(bridge.is_terminal());
        assert!(bridge.read(&ctx).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_event_fails_only_that_read() {
        let ctx = Context::background();
        let mut bridge = bridge_over(body(b"data: {oops\n\ndata: {\"id\":2}\n\n"), &ctx);
        let err = bridge.read(&ctx).await.unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
        assert!(!bridge.is_terminal());
        let msg = bridge.read(&ctx).await.unwrap().expect("second message");
        assert_eq!(msg.id(), Some(&json!(2)));
    }

    #[tokio::test]
    async fn batch_frame_surfaces_first_message_only() {
        let ctx = Context::background();
        let mut bridge = bridge_over(body(b"data: [{\"id\":1},{\"id\":2}]\n\n"), &ctx);
        let msg = bridge.read(&ctx).await.unwrap().expect("message");
        assert_eq!(msg.id(), Some(&json!(1)));
        assert!(bridge.read(&ctx).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn events_without_data_are_skipped() {
        let ctx = Context::background();
        let mut bridge = bridge_over(body(b"id: prime\nretry: 100\n\ndata: {\"id\":9}\n\n"), &ctx);
        let msg = bridge.read(&ctx).await.unwrap().expect("message");
        assert_eq!(msg.id(), Some(&json!(9)));
    }

    #[tokio::test]
    async fn mid_stream_error_keeps_earlier_messages_and_sticks() {
        let chunks: Vec<Result<Bytes, TransportError>> = vec![
            Ok(Bytes::from_static(b"data: {\"id\":1}\n\n")),
            Err(TransportError::Stream("connection reset".into())),
        ];
        let ctx = Context::background();
        let mut bridge = bridge_over(stream::iter(chunks).boxed(), &ctx);
        assert!(bridge.read(&ctx).await.unwrap().is_some());
        let first = bridge.read(&ctx).await.unwrap_err();
        let second = bridge.read(&ctx).await.unwrap_err();
        assert!(matches!(first, TransportError::Stream(_)));
        assert_eq!(first.to_string(), second.to_string());
    }

    #[tokio::test]
    async fn cancelling_before_a_read_returns_context_error_forever() {
        let ctx = Context::background();
        let mut bridge = bridge_over(stalled(b"data: {\"id\":1}\n\n"), &ctx);
        assert!(bridge.read(&ctx).await.unwrap().is_some());

        ctx.cancel();
        assert!(matches!(bridge.read(&ctx).await, Err(TransportError::Cancelled)));
        assert!(matches!(bridge.read(&ctx).await, Err(TransportError::Cancelled)));
        wait_for_worker(&bridge).await;
    }

    #[tokio::test]
    async fn cancellation_wakes_a_blocked_read() {
        let ctx = Context::background();
        let mut bridge = bridge_over(stalled(b""), &ctx);
        let cancel = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });
        assert!(matches!(bridge.read(&ctx).await, Err(TransportError::Cancelled)));
        wait_for_worker(&bridge).await;
    }

    #[tokio::test]
    async fn read_context_deadline_applies_to_the_wait() {
        let ctx = Context::background();
        let mut bridge = bridge_over(stalled(b""), &ctx);
        let read_ctx = ctx.with_timeout(Duration::from_millis(20));
        assert!(matches!(
            bridge.read(&read_ctx).await,
            Err(TransportError::DeadlineExceeded)
        ));
        assert!(matches!(
            bridge.read(&ctx).await,
            Err(TransportError::DeadlineExceeded)
        ));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_stops_worker() {
        let ctx = Context::background();
        let mut bridge = bridge_over(stalled(b"data: {\"id\":1}\n\n"), &ctx);
        bridge.close();
        bridge.close();
        assert!(bridge.read(&ctx).await.unwrap().is_none());
        assert!(bridge.read(&ctx).await.unwrap().is_none());
        wait_for_worker(&bridge).await;
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn close_after_terminal_keeps_stored_error() {
        let ctx = Context::background();
        let chunks: Vec<Result<Bytes, TransportError>> =
            vec![Err(TransportError::Stream("boom".into()))];
        let mut bridge = bridge_over(stream::iter(chunks).boxed(), &ctx);
        assert!(bridge.read(&ctx).await.is_err());
        bridge.close();
        assert!(matches!(bridge.read(&ctx).await, Err(TransportError::Stream(_))));
    }
}
