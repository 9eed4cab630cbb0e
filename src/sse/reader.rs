//! Callback-driven SSE event loop that owns the response body.

use bytes::Bytes;
use futures::Stream;
use tracing::debug;

use super::event::Event;
use super::scanner::SseLineScanner;
use super::ByteStream;
use crate::context::Context;
use crate::error::TransportError;

/// Drives an [`SseLineScanner`] until the stream ends, fails, or the context
/// is cancelled.
///
/// The reader owns the scanner and with it the body. `for_each` consumes the
/// reader, so the body is dropped exactly once when the loop exits, on every
/// exit path.
pub struct SseEventReader<S = ByteStream> {
    scanner: SseLineScanner<S>,
}

impl<S> SseEventReader<S>
where
    S: Stream<Item = Result<Bytes, TransportError>> + Unpin,
{
    pub fn new(scanner: SseLineScanner<S>) -> Self {
        Self { scanner }
    }

    /// Invoke `callback` for every event in order.
    ///
    /// Returns `Ok(())` on clean end-of-stream. A context that ends before or
    /// during a read wins over the scanner's own error.
    pub async fn for_each<F>(self, ctx: &Context, mut callback: F) -> Result<(), TransportError>
    where
        F: FnMut(Event) -> Result<(), TransportError>,
    {
        let Self { mut scanner } = self;

        let result = loop {
            if let Some(err) = ctx.err() {
                break Err(err);
            }

            let next = match ctx.run(scanner.next_event()).await {
                Ok(next) => next,
                Err(ctx_err) => break Err(ctx_err),
            };

            let event = match next {
                Ok(Some(event)) => event,
                Ok(None) => break Ok(()),
                Err(err) => break Err(ctx.err().unwrap_or(err)),
            };

            if let Err(err) = callback(event) {
                break Err(err);
            }
        };

        debug!(
            events = scanner.events_read(),
            last_event_id = scanner.last_event_id(),
            ok = result.is_ok(),
            "SSE event loop finished; closing body"
        );
        drop(scanner);
        result
    }
}
