use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::error::ChatError;

/// Incremental decoder turning raw bytes into event payloads.
///
/// Bytes may be split anywhere, including inside a multi-byte character:
/// lines are only decoded once their terminating newline has arrived.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, ChatError> {
        self.buf.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = decode_line(line)?;
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }
        Ok(events)
    }

    pub fn finish(&mut self) -> Result<Option<String>, ChatError> {
        if !self.buf.is_empty() {
            let mut line = std::mem::take(&mut self.buf);
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = decode_line(line)?;
            if let Some(event) = self.process_line(&line) {
                return Ok(Some(event));
            }
        }
        Ok(self.dispatch())
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let data = self.data.join("\n");
        self.data.clear();
        Some(data)
    }
}

fn decode_line(line: Vec<u8>) -> Result<String, ChatError> {
    String::from_utf8(line)
        .map_err(|err| ChatError::protocol(format!("invalid UTF-8 in event stream: {err}")))
}

pub fn decode<S>(byte_stream: S) -> impl Stream<Item = Result<String, ChatError>>
where
    S: Stream<Item = Result<Bytes, ChatError>>,
{
    try_stream! {
        let mut byte_stream = Box::pin(byte_stream);
        let mut decoder = SseDecoder::default();

        while let Some(bytes) = byte_stream.next().await {
            for data in decoder.push(&bytes?)? {
                yield data;
            }
        }

        if let Some(data) = decoder.finish()? {
            yield data;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SseDecoder, decode};
    use crate::error::ChatError;
    use bytes::Bytes;
    use futures::{StreamExt, stream};

    #[test]
    fn decodes_events_split_across_pushes() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\"").expect("push").is_empty());
        assert!(decoder.push(b":1}\n").expect("push").is_empty());
        assert_eq!(decoder.push(b"\n").expect("push"), vec!["{\"a\":1}"]);
    }

    #[test]
    fn handles_crlf_comments_and_other_fields() {
        let mut decoder = SseDecoder::default();
        let events = decoder
            .push(b": keep-alive\r\nevent: delta\r\nid: 7\r\ndata:no-space\r\n\r\n")
            .expect("push");
        assert_eq!(events, vec!["no-space"]);
    }

    #[test]
    fn joins_multi_line_data() {
        let mut decoder = SseDecoder::default();
        let events = decoder
            .push(b"data: first\ndata: second\n\ndata: [DONE]\n\n")
            .expect("push");
        assert_eq!(events, vec!["first\nsecond", "[DONE]"]);
    }

    #[test]
    fn blank_lines_without_data_dispatch_nothing() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"\n\n: ping\n\n").expect("push").is_empty());
    }

    #[test]
    fn keeps_multi_byte_characters_split_across_pushes() {
        let bytes = "data: héllo\n\n".as_bytes();
        let split = bytes
            .iter()
            .position(|&b| b == 0xC3)
            .expect("encoded é present")
            + 1;

        let mut decoder = SseDecoder::default();
        assert!(decoder.push(&bytes[..split]).expect("push").is_empty());
        assert_eq!(decoder.push(&bytes[split..]).expect("push"), vec!["héllo"]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: tail").expect("push").is_empty());
        assert_eq!(decoder.finish().expect("finish"), Some("tail".to_string()));
        assert_eq!(decoder.finish().expect("finish"), None);
    }

    #[test]
    fn rejects_invalid_utf8() {
        let mut decoder = SseDecoder::default();
        let err = decoder
            .push(b"data: \xFF\xFE\n\n")
            .expect_err("invalid bytes should fail");
        assert!(matches!(err, ChatError::Protocol(_)));
    }

    #[tokio::test]
    async fn decode_stream_yields_payloads_then_stops_on_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"data: one\n\nda")),
            Ok(Bytes::from_static(b"ta: two\n\n")),
            Err(ChatError::transport("connection reset")),
            Ok(Bytes::from_static(b"data: never\n\n")),
        ];
        let items: Vec<Result<String, ChatError>> = decode(stream::iter(chunks)).collect().await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().expect("first"), "one");
        assert_eq!(items[1].as_ref().expect("second"), "two");
        assert!(matches!(items[2], Err(ChatError::Transport(_))));
    }
}
