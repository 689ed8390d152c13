//! Decoding of streamed chat completion bodies.
//!
//! A streaming response is newline-delimited text.  Lines that start with
//! `data: ` carry either a JSON chunk with `choices[0].delta.content` or the
//! `[DONE]` sentinel; every other line (blank separators, comments, `event:`
//! framing) is ignored.  Lines are split at the byte level and only complete
//! lines are decoded as UTF-8, so chunk boundaries never need to line up with
//! character or line boundaries.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use tokio_util::codec::Decoder;

use crate::observability::STREAM_BYTES;
use crate::types::{ChatCompletionChunk, StreamEvent};
use crate::{Error, Result};

const DATA_PREFIX: &[u8] = b"data: ";
const DONE_SENTINEL: &[u8] = b"[DONE]";

/////////////////////////////////////// EventStreamDecoder ///////////////////////////////////////

/// A [`Decoder`] that turns buffered body bytes into [`StreamEvent`]s.
///
/// A fresh decoder is created for every request; nothing carries over.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    // Bytes before this index are known not to contain a newline.
    next_index: usize,
}

impl EventStreamDecoder {
    /// Creates a new decoder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for EventStreamDecoder {
    type Item = StreamEvent;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<StreamEvent>> {
        loop {
            let Some(offset) = buf[self.next_index..].iter().position(|b| *b == b'\n') else {
                self.next_index = buf.len();
                return Ok(None);
            };
            let line = buf.split_to(self.next_index + offset + 1);
            self.next_index = 0;
            if let Some(event) = decode_line(&line[..line.len() - 1]) {
                return Ok(Some(event));
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<StreamEvent>> {
        if let Some(event) = self.decode(buf)? {
            return Ok(Some(event));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        self.next_index = 0;
        let line = buf.split();
        Ok(decode_line(&line))
    }
}

/// Decodes one line (without its terminating newline).
///
/// Returns `None` for lines that are not `data: ` lines at all.
pub fn decode_line(line: &[u8]) -> Option<StreamEvent> {
    let payload = line.trim_ascii().strip_prefix(DATA_PREFIX)?;
    if payload == DONE_SENTINEL {
        return Some(StreamEvent::Terminal);
    }
    let event = match serde_json::from_slice::<ChatCompletionChunk>(payload) {
        Ok(chunk) => match chunk.token() {
            Some(token) => StreamEvent::Token(token.to_string()),
            None => StreamEvent::Malformed,
        },
        Err(_) => StreamEvent::Malformed,
    };
    Some(event)
}

/////////////////////////////////////////// process_sse //////////////////////////////////////////

struct SseState<S> {
    stream: S,
    buffer: BytesMut,
    decoder: EventStreamDecoder,
    done: bool,
}

/// Process a stream of body chunks into a lazy stream of [`StreamEvent`]s.
///
/// The returned stream ends after the terminal event, at the end of the body,
/// or after the first transport error (which is yielded as an `Err`).
///
/// # Examples
///
/// ```
/// # use bytes::Bytes;
/// # use futures::stream::{self, StreamExt};
/// # use chatline::{Error, StreamEvent};
/// # use chatline::sse::process_sse;
/// # tokio_test::block_on(async {
/// let chunks = vec![
///     Ok::<_, Error>(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"con")),
///     Ok(Bytes::from_static(b"tent\":\"Hi\"}}]}\ndata: [DONE]\n")),
/// ];
/// let events: Vec<_> = process_sse(stream::iter(chunks)).collect().await;
/// assert_eq!(events.len(), 2);
/// assert!(matches!(&events[0], Ok(StreamEvent::Token(t)) if t == "Hi"));
/// assert!(matches!(&events[1], Ok(StreamEvent::Terminal)));
/// # });
/// ```
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Into<Error>,
{
    let state = SseState {
        stream: byte_stream,
        buffer: BytesMut::new(),
        decoder: EventStreamDecoder::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }

            // Drain every complete line before reading more.
            match state.decoder.decode(&mut state.buffer) {
                Ok(Some(event)) => {
                    state.done = event.is_terminal();
                    return Some((Ok(event), state));
                }
                Ok(None) => {}
                Err(err) => {
                    state.done = true;
                    return Some((Err(err), state));
                }
            }

            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    state.buffer.extend_from_slice(&bytes);
                }
                Some(Err(err)) => {
                    state.done = true;
                    return Some((Err(err.into()), state));
                }
                None => {
                    state.done = true;
                    return match state.decoder.decode_eof(&mut state.buffer) {
                        Ok(Some(event)) => Some((Ok(event), state)),
                        Ok(None) => None,
                        Err(err) => Some((Err(err), state)),
                    };
                }
            }
        }
    })
}
