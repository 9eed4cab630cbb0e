//! Pull-based reader over the messages of one round trip.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::context::Context;
use crate::error::TransportError;
use crate::types::Message;

/// Messages produced by one round trip.
#[async_trait]
pub trait MessageReader: Send {
    /// Read the next message. `Ok(None)` means end-of-stream.
    async fn read(&mut self, ctx: &Context) -> Result<Option<Message>, TransportError>;

    /// Release the reader. Calling it more than once is a no-op.
    fn close(&mut self);
}

/// Adapt a reader into a `Stream` that ends after end-of-stream or the first
/// error. The reader is closed when the stream finishes.
pub fn into_message_stream(
    mut reader: Box<dyn MessageReader>,
    ctx: Context,
) -> BoxStream<'static, Result<Message, TransportError>> {
    let stream = async_stream::stream! {
        loop {
            match reader.read(&ctx).await {
                Ok(Some(message)) => yield Ok(message),
                Ok(None) => break,
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
        reader.close();
    };
    Box::pin(stream)
}
