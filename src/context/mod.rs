//! Caller-supplied request context: cancellation, deadline, and ambient metadata.
//!
//! A [`Context`] is cheap to clone. Derived contexts ([`Context::with_cancel`],
//! [`Context::with_timeout`]) are cancelled when their parent is, but
//! cancelling a child never affects the parent.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

/// Ambient key/value metadata mirrored onto outgoing requests as headers.
pub type Metadata = BTreeMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
    metadata: Option<Arc<Metadata>>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a child that can be cancelled independently of `self`.
    pub fn with_cancel(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            metadata: self.metadata.clone(),
        }
    }

    /// Derive a child whose deadline is at most `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child with the earlier of `deadline` and the parent's deadline.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut child = self.with_cancel();
        child.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        child
    }

    /// Attach one metadata entry, copying the parent's map.
    pub fn with_metadata(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut metadata = self.metadata.as_deref().cloned().unwrap_or_default();
        metadata.insert(key.into(), value.into());
        let mut child = self.clone();
        child.metadata = Some(Arc::new(metadata));
        child
    }

    /// Replace the metadata map wholesale.
    pub fn with_metadata_map(&self, metadata: Metadata) -> Self {
        let mut child = self.clone();
        child.metadata = Some(Arc::new(metadata));
        child
    }

    /// All ambient metadata values, or `None` when none were attached.
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_deref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The error this context has ended with, if it has ended.
    pub fn err(&self) -> Option<TransportError> {
        if self.token.is_cancelled() {
            return Some(TransportError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(TransportError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolve once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> TransportError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => TransportError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => TransportError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                TransportError::Cancelled
            }
        }
    }

    /// Drive `future` to completion unless the context ends first.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, TransportError> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = future => Ok(output),
        }
    }
}
