//! Incremental decoder for the `event:` / `data:` line transport.
//!
//! Bytes are buffered until a newline arrives, so a chunk boundary inside a
//! line or inside a multi-byte UTF-8 sequence is carried to the next call.
//! Blank lines carry no meaning here, and the last seen event type stays in
//! effect for every following `data:` line until another `event:` replaces it.

use memchr::memchr;
use serde_json::Value;
use tracing::warn;

const EVENT_MARKER: &str = "event:";
const DATA_MARKER: &str = "data:";

#[derive(Debug, Clone, PartialEq)]
pub struct StreamFrame {
    pub event: String,
    pub data: Value,
}

#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
    pending_event: Option<String>,
    malformed: usize,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every frame completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(relative) = memchr(b'\n', &buffer[start..]) {
            let end = start + relative;
            match std::str::from_utf8(&buffer[start..end]) {
                Ok(line) => {
                    if let Some(frame) = self.process_line(line) {
                        frames.push(frame);
                    }
                }
                Err(err) => {
                    self.malformed += 1;
                    warn!(error = %err, "dropping stream line with invalid UTF-8");
                }
            }
            start = end + 1;
        }
        buffer.drain(..start);
        self.buffer = buffer;
        frames
    }

    pub fn feed_str(&mut self, chunk: &str) -> Vec<StreamFrame> {
        self.feed(chunk.as_bytes())
    }

    pub fn pending_event(&self) -> Option<&str> {
        self.pending_event.as_deref()
    }

    /// Bytes of an unterminated trailing line.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Lines dropped because they were not valid UTF-8 or JSON.
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    fn process_line(&mut self, raw: &str) -> Option<StreamFrame> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }

        if let Some(event) = line.strip_prefix(EVENT_MARKER) {
            self.pending_event = Some(event.trim().to_string());
            return None;
        }

        let payload = line.strip_prefix(DATA_MARKER)?.trim_start();
        let event = self.pending_event.as_ref()?;
        match serde_json::from_str::<Value>(payload) {
            Ok(data) => Some(StreamFrame {
                event: event.clone(),
                data,
            }),
            Err(err) => {
                self.malformed += 1;
                warn!(event = %event, error = %err, "dropping malformed data line");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HI: &str = "event: text\ndata: {\"text\":\"hi\"}\n";

    fn hi_frame() -> StreamFrame {
        StreamFrame {
            event: "text".into(),
            data: json!({"text": "hi"}),
        }
    }

    #[test]
    fn single_chunk_yields_one_frame() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.feed_str(HI), vec![hi_frame()]);
        assert_eq!(parser.buffered_len(), 0);
    }

    #[test]
    fn every_split_offset_yields_the_same_frame() {
        for split in 0..=HI.len() {
            let mut parser = FrameParser::new();
            let mut frames = parser.feed(&HI.as_bytes()[..split]);
            frames.extend(parser.feed(&HI.as_bytes()[split..]));
            assert_eq!(frames, vec![hi_frame()], "split at {split}");
        }
    }

    #[test]
    fn byte_at_a_time_keeps_the_tail_between_calls() {
        let input = format!("{HI}event: a2ui\ndata: {{\"data\":{{}}}}\nevent: done\ndata: {{}}\n");
        let mut parser = FrameParser::new();
        let mut events = Vec::new();
        for (offset, byte) in input.bytes().enumerate() {
            let before = parser.buffered_len();
            let frames = parser.feed(&[byte]);
            if byte == b'\n' {
                assert_eq!(parser.buffered_len(), 0, "offset {offset}");
            } else {
                assert_eq!(parser.buffered_len(), before + 1, "offset {offset}");
            }
            events.extend(frames.into_iter().map(|f| f.event));
        }
        assert_eq!(events, vec!["text", "a2ui", "done"]);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let input = "event: text\ndata: {\"text\":\"응답\"}\n".as_bytes();
        let cut = input.iter().position(|b| *b >= 0x80).unwrap() + 1;
        let mut parser = FrameParser::new();
        assert!(parser.feed(&input[..cut]).is_empty());
        let frames = parser.feed(&input[cut..]);
        assert_eq!(frames[0].data, json!({"text": "응답"}));
        assert_eq!(parser.malformed_count(), 0);
    }

    #[test]
    fn trailing_partial_line_is_held_back() {
        let mut parser = FrameParser::new();
        assert!(parser.feed_str("event: done\ndata: {}").is_empty());
        assert_eq!(parser.pending_event(), Some("done"));
        assert_eq!(parser.buffered_len(), "data: {}".len());
        assert_eq!(parser.feed_str("\n").len(), 1);
    }

    #[test]
    fn malformed_data_line_is_skipped() {
        let mut parser = FrameParser::new();
        let frames =
            parser.feed_str("event: text\ndata: not-json\ndata: {\"text\":\"ok\"}\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, json!({"text": "ok"}));
        assert_eq!(parser.malformed_count(), 1);
    }

    #[test]
    fn data_without_event_is_ignored() {
        let mut parser = FrameParser::new();
        assert!(parser.feed_str("data: {\"a\":1}\n\n").is_empty());
        assert_eq!(parser.malformed_count(), 0);
    }

    #[test]
    fn event_type_persists_across_data_lines_and_blank_lines() {
        let mut parser = FrameParser::new();
        let frames = parser.feed_str(
            "event: text\ndata: {\"text\":\"a\"}\n\ndata: {\"text\":\"b\"}\r\nevent:done\ndata:{}\n",
        );
        let events: Vec<&str> = frames.iter().map(|f| f.event.as_str()).collect();
        assert_eq!(events, vec!["text", "text", "done"]);
    }

    #[test]
    fn invalid_utf8_line_is_dropped() {
        let mut parser = FrameParser::new();
        let mut input = b"event: text\ndata: {\"text\":\"".to_vec();
        input.extend_from_slice(&[0xff, 0xfe]);
        input.extend_from_slice(b"\"}\ndata: {\"text\":\"fine\"}\n");
        let frames = parser.feed(&input);
        assert_eq!(frames.len(), 1);
        assert_eq!(parser.malformed_count(), 1);
    }
}
