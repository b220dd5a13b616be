//! Framing for the `/chat` response body.
//!
//! The body is a sequence of blocks separated by a blank line. A block is
//! either a named event (`event: <name>` followed by `data: <json>`) or a
//! bare `data: <payload>` line, where the payload is `[DONE]` or a JSON
//! encoded content fragment.
use std::collections::VecDeque;

use futures::StreamExt as _;
use futures::stream;
use tracing::{debug, trace, warn};

use crate::conversation::ConversationId;
use crate::errors::{FrameError, TransportError};
use crate::event::{Source, StreamEvent};
use crate::transport::ByteStream;

const DONE_SENTINEL: &str = "[DONE]";

/// One raw block cut out of the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental splitter that turns arbitrary byte chunks into frames.
///
/// Bytes are buffered until a whole block is available, so multi-byte
/// UTF-8 sequences split across chunks decode correctly. Each byte is
/// scanned for a block boundary once.
#[derive(Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    scanned: usize,
}

impl SseDecoder {
    /// Appends a chunk and returns every frame it completed.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        let mut consumed = 0;
        while let Some((block_end, next)) =
            next_block_end(&self.buf, consumed, consumed.max(self.scanned))
        {
            if let Some(frame) = parse_block(&self.buf[consumed..block_end]) {
                frames.push(frame);
            }
            consumed = next;
        }
        self.buf.drain(..consumed);
        self.scanned = self.buf.len();
        frames
    }

    /// Drops a trailing block the body ended without terminating and
    /// returns its length in bytes.
    pub fn finish(&mut self) -> usize {
        self.scanned = 0;
        std::mem::take(&mut self.buf).len()
    }
}

/// Finds the first blank line of the block starting at `start` whose
/// newline sits at or after `from`.
///
/// Returns the end of the block and the offset just past the blank line.
/// Lines may end in `\n` or `\r\n`.
fn next_block_end(buf: &[u8], start: usize, from: usize) -> Option<(usize, usize)> {
    let mut pos = from;
    while let Some(offset) = buf[pos..].iter().position(|&b| b == b'\n') {
        let newline = pos + offset;
        let line_start = match buf[..newline].last() {
            Some(b'\r') => newline - 1,
            _ => newline,
        };
        if line_start == start {
            return Some((start, newline + 1));
        }
        if buf[line_start - 1] == b'\n' {
            return Some((line_start - 1, newline + 1));
        }
        pos = newline + 1;
    }
    None
}

/// Reads the `event` and `data` fields of one block. Comment lines
/// (leading `:`) and other fields are ignored.
fn parse_block(block: &[u8]) -> Option<SseFrame> {
    let text = String::from_utf8_lossy(block);
    let mut event = None;
    let mut data: Option<String> = None;
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => event = Some(value.trim().to_string()),
            "data" => match data.as_mut() {
                Some(joined) => {
                    joined.push('\n');
                    joined.push_str(value);
                }
                None => data = Some(value.to_string()),
            },
            _ => {}
        }
    }
    if event.is_none() && data.is_none() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data.unwrap_or_default(),
    })
}

#[derive(serde::Deserialize)]
struct NewConversationPayload {
    id: String,
    #[serde(default)]
    title: String,
}

/// Maps one frame to a typed event.
pub fn frame_to_event(frame: &SseFrame) -> Result<StreamEvent, FrameError> {
    match frame.event.as_deref() {
        Some("new_conversation") => {
            let payload: NewConversationPayload = decode(&frame.data, "new_conversation")?;
            let id = ConversationId::parse(&payload.id)
                .ok_or(FrameError::InvalidConversationId(payload.id))?;
            Ok(StreamEvent::NewConversation {
                id,
                title: payload.title,
            })
        }
        Some("sources") => Ok(StreamEvent::Sources(decode(&frame.data, "sources")?)),
        Some("reasoning") => Ok(StreamEvent::ReasoningDelta {
            text: decode(&frame.data, "reasoning")?,
        }),
        Some(other) => Err(FrameError::UnknownEvent(other.to_string())),
        None if frame.data.trim() == DONE_SENTINEL => Ok(StreamEvent::Done),
        None => Ok(StreamEvent::ContentDelta {
            text: decode(&frame.data, "data")?,
        }),
    }
}

fn decode<T: serde::de::DeserializeOwned>(data: &str, event: &str) -> Result<T, FrameError> {
    let value: serde_json::Value =
        serde_json::from_str(data).map_err(|e| FrameError::InvalidJson(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| FrameError::UnexpectedPayload {
        event: event.to_string(),
        message: e.to_string(),
    })
}

/// Adapts a raw byte stream into a stream of typed events.
///
/// Malformed frames are logged and dropped; only transport failures are
/// surfaced as errors. The stream ends when the bytes run out.
pub fn event_stream(
    bytes_stream: ByteStream,
) -> impl futures::Stream<Item = Result<StreamEvent, TransportError>> + Send {
    struct State {
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<StreamEvent>,
        done: bool,
    }

    fn enqueue(pending: &mut VecDeque<StreamEvent>, frame: &SseFrame) {
        match frame_to_event(frame) {
            Ok(event) => {
                trace!(kind = event.kind(), "framed event");
                pending.push_back(event);
            }
            Err(err) => warn!(error = %err, "skipping malformed stream frame"),
        }
    }

    stream::try_unfold(
        State {
            bytes_stream,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        for frame in state.decoder.push_chunk(&chunk) {
                            enqueue(&mut state.pending, &frame);
                        }
                    }
                    Some(Err(err)) => return Err(err),
                    None => {
                        let dropped = state.decoder.finish();
                        if dropped > 0 {
                            debug!(dropped, "body ended inside a frame; discarding it");
                        }
                        state.done = true;
                    }
                }
            }
        },
    )
}
