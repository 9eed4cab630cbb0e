//! One-shot reader for a fully buffered `application/json` reply.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::reader::MessageReader;
use crate::codec::Codec;
use crate::context::Context;
use crate::error::TransportError;
use crate::types::Message;

pub struct PingPongReader {
    body: Option<Bytes>,
    codec: Arc<dyn Codec>,
}

impl PingPongReader {
    pub fn new(body: Bytes, codec: Arc<dyn Codec>) -> Self {
        Self {
            body: Some(body),
            codec,
        }
    }
}

#[async_trait]
impl MessageReader for PingPongReader {
    async fn read(&mut self, _ctx: &Context) -> Result<Option<Message>, TransportError> {
        let Some(body) = self.body.take() else {
            return Ok(None);
        };
        let (messages, _) = self.codec.decode(&body)?;
        messages
            .into_iter()
            .next()
            .map(Some)
            .ok_or_else(|| TransportError::Decode("response carried no message".into()))
    }

    fn close(&mut self) {
        self.body = None;
    }
}
