use crate::clients::openai::models::ChatCompletionChunk;
use crate::error::{ClientError, DecodeError};
use async_stream::stream;
use bytes::{Bytes, BytesMut};
use futures_core::stream::Stream;
use futures_util::StreamExt;
use tokio_util::codec::{Decoder, LinesCodec};
use tracing::{debug, trace};

pub const DATA_PREFIX: &str = "data:";
pub const DONE_SENTINEL: &str = "[DONE]";

/// One decoded `data:` line of a chat completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// `choices[0].delta.content`, `""` when the payload had none.
    Delta(String),
    /// The `[DONE]` sentinel.
    Done,
}

/// Incremental decoder for the chat completion event stream.
///
/// Bytes are buffered until [`LinesCodec`] finds a full line, so a `data:` line
/// (or a multi-byte character) split across chunk boundaries decodes the same
/// as if it had arrived whole. Lines other than `data:` lines (blank
/// separators, comments, `event:` or `id:` fields) are skipped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: BytesMut,
    lines: LinesCodec,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the events for every line it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, DecodeError> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(line) = self.lines.decode(&mut self.pending)? {
            events.extend(parse_line(&line)?);
        }
        Ok(events)
    }

    /// Decode whatever is left once the stream has ended (a final line
    /// without a trailing newline).
    pub fn finish(&mut self) -> Result<Vec<SseEvent>, DecodeError> {
        let mut events = Vec::new();
        while let Some(line) = self.lines.decode_eof(&mut self.pending)? {
            events.extend(parse_line(&line)?);
        }
        Ok(events)
    }

    /// Bytes held back waiting for the end of their line.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

fn parse_line(line: &str) -> Result<Option<SseEvent>, DecodeError> {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed == DONE_SENTINEL {
        return Ok(Some(SseEvent::Done));
    }
    let chunk: ChatCompletionChunk = serde_json::from_str(trimmed)
        .map_err(|e| DecodeError::Json(e, trimmed.to_string()))?;
    Ok(Some(SseEvent::Delta(chunk.delta_content().to_string())))
}

/// Concatenate the text of every delta in `events`.
pub fn join_deltas(events: &[SseEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            SseEvent::Delta(text) => Some(text.as_str()),
            SseEvent::Done => None,
        })
        .collect()
}

/// Decode a complete event stream body into the accumulated answer text.
pub fn decode_text(body: &[u8]) -> Result<String, DecodeError> {
    let mut decoder = SseDecoder::new();
    let mut text = join_deltas(&decoder.feed(body)?);
    text.push_str(&join_deltas(&decoder.finish()?));
    Ok(text)
}

/// Turn a relayed byte stream into the text each chunk contributed.
///
/// Yields exactly one item per received chunk (possibly `""` when the chunk
/// only extended a partial line), plus one more if the stream ended on an
/// unterminated line. The first error ends the stream.
pub fn stream_deltas<S, E>(byte_stream: S) -> impl Stream<Item = Result<String, ClientError>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<ClientError>,
{
    stream! {
        let mut decoder = SseDecoder::new();
        let mut byte_stream = Box::pin(byte_stream);
        let mut chunks = 0usize;
        let mut failed = false;

        while let Some(chunk_result) = byte_stream.next().await {
            chunks += 1;
            let decoded = chunk_result
                .map_err(Into::<ClientError>::into)
                .and_then(|bytes| decoder.feed(&bytes).map_err(ClientError::from));
            match decoded {
                Ok(events) => {
                    trace!(chunk = chunks, events = events.len(), buffered = decoder.buffered(), "Decoded chunk");
                    yield Ok(join_deltas(&events));
                }
                Err(err) => {
                    failed = true;
                    yield Err(err);
                    break;
                }
            }
        }

        if !failed {
            match decoder.finish() {
                Ok(events) if !events.is_empty() => yield Ok(join_deltas(&events)),
                Ok(_) => {}
                Err(err) => yield Err(err.into()),
            }
        }
        debug!(chunks, failed, "Event stream ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carriage_returns_and_comments_are_tolerated() {
        let body = b": keep-alive\r\nevent: message\r\ndata: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\r\n\r\n";
        assert_eq!(decode_text(body).unwrap(), "ok");
    }

    #[test]
    fn data_without_space_is_accepted() {
        let body = b"data:{\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n\n";
        assert_eq!(decode_text(body).unwrap(), "hi");
    }

    #[test]
    fn partial_line_is_held_back() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"choices\":[{\"delta\":").unwrap().is_empty());
        assert!(decoder.buffered() > 0);
        let events = decoder.feed(b"{\"content\":\"Yes\"}}]}\n\n").unwrap();
        assert_eq!(events, vec![SseEvent::Delta("Yes".into())]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn unterminated_final_line_is_decoded_on_finish() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: [DONE]").unwrap().is_empty());
        assert_eq!(decoder.finish().unwrap(), vec![SseEvent::Done]);
    }

    #[test]
    fn long_line_in_small_chunks_is_held_until_complete() {
        let content = "x".repeat(20_000);
        let line = format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{content}\"}}}}]}}\n\n");
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        for chunk in line.as_bytes().chunks(16) {
            events.extend(decoder.feed(chunk).unwrap());
        }
        assert_eq!(events, vec![SseEvent::Delta(content)]);
        assert_eq!(decoder.buffered(), 0);
        assert!(decoder.finish().unwrap().is_empty());
    }

    #[test]
    fn invalid_utf8_line_is_an_error() {
        let mut decoder = SseDecoder::new();
        assert!(matches!(decoder.feed(b"data: \xff\xfe\n"), Err(DecodeError::Lines(_))));
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let err = decode_text(b"data: {not json}\n\n").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_, raw) if raw == "{not json}"));
    }

    #[test]
    fn split_multibyte_character_survives() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"caf\u{e9}\"}}]}\n\n".as_bytes();
        let split = body.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&body[..split]).unwrap().is_empty());
        assert_eq!(join_deltas(&decoder.feed(&body[split..]).unwrap()), "caf\u{e9}");
    }
}
