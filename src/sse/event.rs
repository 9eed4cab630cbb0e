//! Parsed SSE frame.

/// One Server-Sent-Events frame.
///
/// `data` holds every `data:` line of the frame joined with `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub event_type: String,
    pub data: String,
    pub id: Option<String>,
    pub retry_millis: Option<u64>,
}

impl Event {
    /// The event type, defaulting to `message` as browsers do.
    pub fn kind(&self) -> &str {
        if self.event_type.is_empty() {
            "message"
        } else {
            &self.event_type
        }
    }
}
