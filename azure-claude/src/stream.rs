//! Incremental decoding of the server-sent event body of a streaming call.
//!
//! Framing is line oriented: every event line starts with `data: ` and carries
//! either one JSON event object or the `[DONE]` sentinel. Blank lines and any
//! other line are ignored. A line that fails to parse is dropped on its own
//! and never ends the stream. Invalid UTF-8 is replaced, not rejected; only
//! an I/O failure of the body itself is fatal.

use crate::error::{LlmError, Result};
use crate::types::{FinishReason, StreamingUpdate};
use crate::wire::WireStreamEvent;
use futures_util::Stream;
use std::borrow::Cow;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    AwaitingLine,
    HasEvent,
    Done,
}

#[derive(Debug, PartialEq, Eq)]
enum Frame<'a> {
    Ignored,
    Sentinel,
    Data(&'a str),
}

fn classify(line: &str) -> Frame<'_> {
    if line.trim().is_empty() {
        return Frame::Ignored;
    }
    match line.strip_prefix(DATA_PREFIX) {
        Some(DONE_SENTINEL) => Frame::Sentinel,
        Some(data) => Frame::Data(data),
        None => Frame::Ignored,
    }
}

/// Decode one raw segment, dropping the `\r` of a CRLF terminator.
fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw)
}

fn parse_event(data: &str) -> Option<WireStreamEvent> {
    match serde_json::from_str(data) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!(%e, "dropping undecodable stream event");
            None
        }
    }
}

fn to_update(event: WireStreamEvent) -> Option<StreamingUpdate> {
    match event.kind.as_deref() {
        Some("content_block_delta") => event
            .delta
            .and_then(|d| d.text)
            .map(StreamingUpdate::text),
        Some("message_stop") => Some(StreamingUpdate::finished(FinishReason::Stop)),
        _ => None,
    }
}

/// Pull-based decoder producing one [`StreamingUpdate`] per relevant event.
///
/// Each call to [`StreamDecoder::next_update`] reads only as many lines as it
/// needs to produce the next update, so updates reach the caller in the same
/// order and at the same pace as the underlying body.
#[derive(Debug)]
pub struct StreamDecoder<R> {
    reader: R,
    buf: Vec<u8>,
    state: DecoderState,
    pending: Option<StreamingUpdate>,
}

impl<R> StreamDecoder<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            state: DecoderState::AwaitingLine,
            pending: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == DecoderState::Done
    }

    /// Returns `Ok(None)` once the sentinel is seen or the body ends.
    pub async fn next_update(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<StreamingUpdate>> {
        loop {
            match self.state {
                DecoderState::Done => return Ok(None),
                DecoderState::HasEvent => {
                    self.state = DecoderState::AwaitingLine;
                    if let Some(update) = self.pending.take() {
                        return Ok(Some(update));
                    }
                }
                DecoderState::AwaitingLine => {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        next = self.reader.read_until(b'\n', &mut self.buf) => Some(next),
                    };
                    let Some(next) = next else {
                        self.finish();
                        return Err(LlmError::Cancelled);
                    };
                    // Same segmentation as `tokio::io::Split::next_segment`.
                    let next = next.map(|n| {
                        if n == 0 && self.buf.is_empty() {
                            None
                        } else {
                            if self.buf.last() == Some(&b'\n') {
                                self.buf.pop();
                            }
                            Some(std::mem::take(&mut self.buf))
                        }
                    });
                    match next {
                        Ok(Some(raw)) => self.on_line(&decode_line(&raw)),
                        Ok(None) => {
                            tracing::debug!("stream body ended without sentinel");
                            self.finish();
                        }
                        Err(e) => {
                            self.finish();
                            return Err(LlmError::Http(format!("stream read failed: {e}")));
                        }
                    }
                }
            }
        }
    }

    fn on_line(&mut self, line: &str) {
        match classify(line) {
            Frame::Ignored => {}
            Frame::Sentinel => {
                tracing::debug!("stream sentinel received");
                self.finish();
            }
            Frame::Data(data) => {
                if let Some(update) = parse_event(data).and_then(to_update) {
                    self.pending = Some(update);
                    self.state = DecoderState::HasEvent;
                }
            }
        }
    }

    fn finish(&mut self) {
        self.pending = None;
        self.state = DecoderState::Done;
    }

    /// Hands back the reader, positioned just after the last line consumed.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> StreamDecoder<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    /// Drive the decoder as a stream. The reader is dropped as soon as the
    /// stream finishes, fails, or observes cancellation.
    pub fn into_updates(
        self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<StreamingUpdate>> + Send + 'static {
        futures_util::stream::unfold(Some((self, cancel)), |state| async move {
            let (mut decoder, cancel) = state?;
            match decoder.next_update(&cancel).await {
                Ok(Some(update)) => Some((Ok(update), Some((decoder, cancel)))),
                Ok(None) => None,
                Err(e) => {
                    drop(decoder);
                    Some((Err(e), None))
                }
            }
        })
    }
}
