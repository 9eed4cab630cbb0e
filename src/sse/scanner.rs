//! Incremental SSE line scanner.
//!
//! Bytes are pulled from the source only when the buffered data holds no
//! complete line. A line ends at `\n`, `\r`, or `\r\n`. A `\r` that is the
//! last buffered byte is held back until the next chunk arrives, because the
//! next chunk may start with the matching `\n`; only end-of-stream makes it a
//! boundary on its own.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tracing::trace;

use super::event::Event;
use super::ByteStream;
use crate::config::DEFAULT_MAX_TOKEN_SIZE;
use crate::error::TransportError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Tokenizes a byte stream into SSE [`Event`]s.
pub struct SseLineScanner<S = ByteStream> {
    source: S,
    buf: BytesMut,
    eof: bool,
    max_token_size: usize,
    pending: Event,
    // Any of event/data/id/retry was seen since the last dispatch, even empty.
    pending_set: bool,
    data_lines: usize,
    events_read: u64,
    last_event_id: Option<String>,
    at_stream_start: bool,
}

impl<S> SseLineScanner<S>
where
    S: Stream<Item = Result<Bytes, TransportError>> + Unpin,
{
    pub fn new(source: S) -> Self {
        Self::with_max_token_size(source, DEFAULT_MAX_TOKEN_SIZE)
    }

    /// Create a scanner that rejects lines longer than `max_token_size` bytes.
    /// Zero selects the default.
    pub fn with_max_token_size(source: S, max_token_size: usize) -> Self {
        let max_token_size = if max_token_size == 0 {
            DEFAULT_MAX_TOKEN_SIZE
        } else {
            max_token_size
        };
        Self {
            source,
            buf: BytesMut::new(),
            eof: false,
            max_token_size,
            pending: Event::default(),
            pending_set: false,
            data_lines: 0,
            events_read: 0,
            last_event_id: None,
            at_stream_start: true,
        }
    }

    /// Number of events emitted so far.
    pub fn events_read(&self) -> u64 {
        self.events_read
    }

    /// The most recent `id:` value seen on the stream.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Read the next complete event. `Ok(None)` means clean end-of-stream.
    pub async fn next_event(&mut self) -> Result<Option<Event>, TransportError> {
        loop {
            match self.next_line().await? {
                Some(line) => {
                    if let Some(event) = self.process_line(&line) {
                        return Ok(Some(event));
                    }
                }
                None => {
                    if self.pending_set {
                        return Ok(Some(self.dispatch()));
                    }
                    return Ok(None);
                }
            }
        }
    }

    async fn next_line(&mut self) -> Result<Option<Bytes>, TransportError> {
        loop {
            if let Some((line_len, advance)) = find_line_boundary(&self.buf, self.eof) {
                if line_len > self.max_token_size {
                    return Err(TransportError::TokenTooLong {
                        limit: self.max_token_size,
                    });
                }
                let mut line = self.buf.split_to(advance);
                line.truncate(line_len);
                return Ok(Some(line.freeze()));
            }

            if self.eof {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                if self.buf.len() > self.max_token_size {
                    return Err(TransportError::TokenTooLong {
                        limit: self.max_token_size,
                    });
                }
                return Ok(Some(self.buf.split().freeze()));
            }

            // A held-back trailing CR does not count toward the line length.
            let partial = match self.buf.last() {
                Some(b'\r') => self.buf.len() - 1,
                _ => self.buf.len(),
            };
            if partial > self.max_token_size {
                return Err(TransportError::TokenTooLong {
                    limit: self.max_token_size,
                });
            }

            self.fill().await?;
        }
    }

    async fn fill(&mut self) -> Result<(), TransportError> {
        match self.source.next().await {
            Some(Ok(chunk)) => self.buf.extend_from_slice(&chunk),
            Some(Err(e)) => return Err(e),
            None => self.eof = true,
        }
        Ok(())
    }

    fn process_line(&mut self, line: &[u8]) -> Option<Event> {
        let mut line = line;
        if self.at_stream_start {
            self.at_stream_start = false;
            line = line.strip_prefix(UTF8_BOM).unwrap_or(line);
        }

        if line.is_empty() {
            if self.pending_set {
                return Some(self.dispatch());
            }
            return None;
        }

        if line[0] == b':' {
            return None;
        }

        let (name, value) = match line.iter().position(|&b| b == b':') {
            Some(colon) => {
                let value = &line[colon + 1..];
                (&line[..colon], value.strip_prefix(b" ").unwrap_or(value))
            }
            None => (line, &[][..]),
        };

        match name {
            b"event" => {
                self.pending.event_type = String::from_utf8_lossy(value).into_owned();
                self.pending_set = true;
            }
            b"data" => {
                if self.data_lines > 0 {
                    self.pending.data.push('\n');
                }
                self.pending.data.push_str(&String::from_utf8_lossy(value));
                self.data_lines += 1;
                self.pending_set = true;
            }
            b"id" => {
                if !value.contains(&0) {
                    // An empty value resets the last-seen id.
                    let id = String::from_utf8_lossy(value).into_owned();
                    self.last_event_id = Some(id.clone());
                    self.pending.id = Some(id);
                    self.pending_set = true;
                }
            }
            b"retry" => {
                if let Some(millis) = parse_retry(value) {
                    self.pending.retry_millis = Some(millis);
                    self.pending_set = true;
                }
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Event {
        self.events_read += 1;
        self.pending_set = false;
        self.data_lines = 0;
        let event = std::mem::take(&mut self.pending);
        trace!(
            seq = self.events_read,
            kind = event.kind(),
            id = event.id.as_deref(),
            bytes = event.data.len(),
            "SSE event"
        );
        event
    }
}

/// Locate the first line boundary in `buf`.
///
/// Returns `(line_len, advance)`: the line content length and the number of
/// bytes to consume including the terminator. `None` means more bytes are
/// needed.
fn find_line_boundary(buf: &[u8], eof: bool) -> Option<(usize, usize)> {
    let pos = buf.iter().position(|&b| b == b'\r' || b == b'\n')?;
    if buf[pos] == b'\n' {
        return Some((pos, pos + 1));
    }
    match buf.get(pos + 1) {
        Some(b'\n') => Some((pos, pos + 2)),
        Some(_) => Some((pos, pos + 1)),
        None if eof => Some((pos, pos + 1)),
        None => None,
    }
}

fn parse_retry(value: &[u8]) -> Option<u64> {
    if value.is_empty() || !value.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(value).ok()?.parse().ok()
}
