//! Error types for streamrpc.

pub mod unified;

pub use unified::ErrorCategory;

use std::sync::Arc;

use thiserror::Error;

/// Primary error type for all transport operations.
///
/// The type is `Clone` so that a stream which reached its terminal state can
/// hand the same error back on every later read. Sources that are not `Clone`
/// themselves are kept behind an `Arc`.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Network error: {0}")]
    Network(#[source] Arc<reqwest::Error>),

    #[error("Path not found: {address}")]
    NotFound { address: String },

    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Unsupported content type: {0:?}")]
    ContentType(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Context cancelled")]
    Cancelled,

    #[error("Context deadline exceeded")]
    DeadlineExceeded,

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("SSE token exceeds {limit} bytes")]
    TokenTooLong { limit: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(Arc::new(error))
    }
}

impl TransportError {
    /// Create an unexpected-status error, truncating the body excerpt.
    pub fn unexpected_status(status: u16, body: &str) -> Self {
        Self::UnexpectedStatus {
            status,
            body: excerpt(body, BODY_EXCERPT_LIMIT),
        }
    }

    /// Whether this error came from the caller's context rather than I/O.
    pub fn is_context_error(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// Classify this error into a category.
    ///
    /// Classification only: deciding whether to retry is left to the caller.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Encode(_) => ErrorCategory::Encode,
            Self::Network(_) => ErrorCategory::Network,
            Self::NotFound { .. } | Self::UnexpectedStatus { .. } => ErrorCategory::Status,
            Self::ContentType(_) => ErrorCategory::Protocol,
            Self::Decode(_) => ErrorCategory::Decode,
            Self::Cancelled | Self::DeadlineExceeded => ErrorCategory::Context,
            Self::Stream(_) | Self::TokenTooLong { .. } => ErrorCategory::Stream,
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }
}

/// Maximum number of body bytes carried in an unexpected-status error.
pub const BODY_EXCERPT_LIMIT: usize = 512;

fn excerpt(body: &str, limit: usize) -> String {
    if body.len() <= limit {
        return body.to_string();
    }
    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TransportError>;
