//! JSON-RPC message payload.

use serde::{Deserialize, Serialize};

/// An opaque JSON-RPC payload.
///
/// The transport treats a message as a unit to encode and decode. The
/// accessors below exist for callers and for log fields; nothing in the
/// transport branches on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(serde_json::Value);

impl Message {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Build a JSON-RPC 2.0 request.
    pub fn request(
        id: impl Into<serde_json::Value>,
        method: impl Into<String>,
        params: serde_json::Value,
    ) -> Self {
        Self(serde_json::json!({
            "jsonrpc": "2.0",
            "id": id.into(),
            "method": method.into(),
            "params": params,
        }))
    }

    /// Build a JSON-RPC 2.0 notification (no id).
    pub fn notification(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self(serde_json::json!({
            "jsonrpc": "2.0",
            "method": method.into(),
            "params": params,
        }))
    }

    pub fn id(&self) -> Option<&serde_json::Value> {
        self.0.get("id")
    }

    pub fn method(&self) -> Option<&str> {
        self.0.get("method").and_then(|m| m.as_str())
    }

    pub fn is_notification(&self) -> bool {
        self.method().is_some() && self.id().is_none()
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for Message {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_has_id_and_method() {
        let msg = Message::request(7, "tools/list", json!({}));
        assert_eq!(msg.id(), Some(&json!(7)));
        assert_eq!(msg.method(), Some("tools/list"));
        assert!(!msg.is_notification());
    }

    #[test]
    fn notification_has_no_id() {
        let msg = Message::notification("notifications/initialized", json!(null));
        assert!(msg.id().is_none());
        assert!(msg.is_notification());
    }

    #[test]
    fn response_is_neither_request_nor_notification() {
        let msg = Message::new(json!({"jsonrpc": "2.0", "id": 1, "result": {}}));
        assert!(msg.method().is_none());
        assert!(!msg.is_notification());
    }
}
