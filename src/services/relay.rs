//! Stream relay
//!
//! Turns a raw upstream byte stream into a sequence of [`StreamEvent`]s.
//!
//! Bytes are decoded incrementally as UTF-8, split into newline-delimited
//! records, and every `data: ` record is parsed as JSON. The increment is
//! taken from `choices[0].delta.content` (OpenAI-compatible providers) or
//! `result` (Wenxin). `data: [DONE]` is skipped; only the upstream closing the
//! connection ends the sequence. Decoding state lives in [`RecordDecoder`], so
//! the fragments produced do not depend on where the chunk boundaries fall.

use crate::models::StreamEvent;
use crate::utils::error::{AppError, AppResult};
use crate::utils::logging::truncate_content;
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, trace, warn};

/// Boxed stream of relayed events
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental UTF-8 decoder
///
/// Keeps an incomplete trailing multi-byte sequence until the next chunk
/// completes it. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `chunk` (plus any carried bytes) as possible
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut consumed = 0;
        loop {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    consumed = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&rest[..valid]) {
                        out.push_str(text);
                    }
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            consumed += valid + len;
                        }
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            consumed += valid;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..consumed);
        out
    }

    /// Flush at end of stream; a dangling partial sequence becomes U+FFFD
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }

    /// Whether bytes are being carried over to the next chunk
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Record-level decoder: UTF-8 text, line framing and payload extraction
#[derive(Debug, Default)]
pub struct RecordDecoder {
    utf8: Utf8Decoder,
    partial: String,
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the fragments of every record it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.utf8.decode(chunk);
        self.partial.push_str(&text);
        self.drain_records()
    }

    /// Flush at end of stream, decoding a final record that had no newline
    pub fn finish(&mut self) -> Vec<String> {
        let tail = self.utf8.finish();
        self.partial.push_str(&tail);

        let mut fragments = self.drain_records();
        let last = std::mem::take(&mut self.partial);
        fragments.extend(decode_record(&last));
        fragments
    }

    fn drain_records(&mut self) -> Vec<String> {
        let mut fragments = Vec::new();
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            fragments.extend(decode_record(&line));
        }
        fragments
    }
}

/// Decode one record into its text increment, if it carries one
pub fn decode_record(line: &str) -> Option<String> {
    let record = line.trim_end_matches(|c| c == '\n' || c == '\r');
    if record.trim().is_empty() {
        return None;
    }

    let Some(payload) = record.strip_prefix(DATA_PREFIX) else {
        trace!("Skipping non-data record: {}", truncate_content(record, 80));
        return None;
    };

    if payload.trim() == DONE_SENTINEL {
        debug!("Received streaming response end marker");
        return None;
    }

    match extract_fragment(payload) {
        Ok(fragment) => fragment,
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

/// Extract the text increment from a JSON payload
///
/// Returns `Ok(None)` for well-formed payloads that carry no text.
pub fn extract_fragment(payload: &str) -> AppResult<Option<String>> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| AppError::Decode(format!("{} - data: {}", e, truncate_content(payload, 200))))?;

    let delta = value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());
    let result = value
        .get("result")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());

    Ok(delta.or(result).map(str::to_string))
}

#[derive(Debug)]
enum RelayState {
    Reading,
    Closing(StreamEvent),
    Done,
}

pin_project! {
    /// Lazy, single-pass relay from upstream bytes to [`StreamEvent`]s
    ///
    /// The upstream is only polled once every decoded fragment has been
    /// handed to the consumer.
    pub struct StreamRelay<S> {
        #[pin]
        upstream: S,
        decoder: RecordDecoder,
        pending: VecDeque<String>,
        state: RelayState,
        fragments: usize,
    }
}

impl<S> StreamRelay<S> {
    pub fn new(upstream: S) -> Self {
        Self {
            upstream,
            decoder: RecordDecoder::new(),
            pending: VecDeque::new(),
            state: RelayState::Reading,
            fragments: 0,
        }
    }
}

impl<S, E> Stream for StreamRelay<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(text) = this.pending.pop_front() {
                *this.fragments += 1;
                return Poll::Ready(Some(StreamEvent::TokenFragment(text)));
            }

            match std::mem::replace(&mut *this.state, RelayState::Done) {
                RelayState::Done => return Poll::Ready(None),
                RelayState::Closing(event) => {
                    debug!("Relay closed after {} fragments: {:?}", this.fragments, event);
                    return Poll::Ready(Some(event));
                }
                RelayState::Reading => *this.state = RelayState::Reading,
            }

            match this.upstream.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => {
                    this.pending.extend(this.decoder.feed(&chunk));
                }
                Poll::Ready(Some(Err(e))) => {
                    warn!("Provider streaming response error: {}", e);
                    *this.state = RelayState::Closing(StreamEvent::Error(format!("Stream error: {}", e)));
                }
                Poll::Ready(None) => {
                    this.pending.extend(this.decoder.finish());
                    *this.state = RelayState::Closing(StreamEvent::End);
                }
            }
        }
    }
}
