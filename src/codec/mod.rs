//! Message codec: JSON-RPC payloads to and from bytes.

use crate::error::TransportError;
use crate::types::Message;

/// Encodes outbound messages and decodes inbound payloads.
///
/// `decode` returns every message found at the front of `bytes` plus the
/// undecoded remainder.
pub trait Codec: Send + Sync {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, TransportError>;

    fn decode<'a>(&self, bytes: &'a [u8]) -> Result<(Vec<Message>, &'a [u8]), TransportError>;
}

/// JSON codec accepting single objects and JSON-RPC batch arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, TransportError> {
        if !is_rpc_shaped(message.as_value()) {
            return Err(TransportError::Encode(
                "message must be a JSON object or an array of objects".into(),
            ));
        }
        serde_json::to_vec(message).map_err(|e| TransportError::Encode(e.to_string()))
    }

    fn decode<'a>(&self, bytes: &'a [u8]) -> Result<(Vec<Message>, &'a [u8]), TransportError> {
        let mut values = serde_json::Deserializer::from_slice(bytes).into_iter::<serde_json::Value>();
        let value = match values.next() {
            Some(Ok(value)) => value,
            Some(Err(e)) => return Err(TransportError::Decode(e.to_string())),
            None => return Err(TransportError::Decode("empty payload".into())),
        };
        let rest = &bytes[values.byte_offset()..];

        let messages = match value {
            serde_json::Value::Array(items) => {
                if items.is_empty() {
                    return Err(TransportError::Decode("empty batch".into()));
                }
                items
                    .into_iter()
                    .map(object_message)
                    .collect::<Result<Vec<_>, _>>()?
            }
            other => vec![object_message(other)?],
        };
        Ok((messages, rest))
    }
}

fn is_rpc_shaped(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Object(_) => true,
        serde_json::Value::Array(items) => {
            !items.is_empty() && items.iter().all(serde_json::Value::is_object)
        }
        _ => false,
    }
}

fn object_message(value: serde_json::Value) -> Result<Message, TransportError> {
    if value.is_object() {
        Ok(Message::new(value))
    } else {
        Err(TransportError::Decode(format!(
            "expected a JSON-RPC object, found {value}"
        )))
    }
}
