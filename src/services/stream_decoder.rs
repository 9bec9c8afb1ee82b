// Streaming Protocol Decoders
// Generic SSE line framer plus per-provider text-delta extraction

use serde_json::Value;

use crate::models::WireProtocol;

/// Pulls zero or one text delta out of one complete event line.
pub trait DeltaExtractor: Send {
    fn extract(&self, line: &str) -> Option<String>;
}

fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data: ")
}

fn non_empty_text(value: &Value) -> Option<String> {
    value.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

/// `data: {"choices":[{"delta":{"content":"..."}}]}`, terminated by `data: [DONE]`.
pub struct OpenAiDeltas;

impl DeltaExtractor for OpenAiDeltas {
    fn extract(&self, line: &str) -> Option<String> {
        let payload = data_payload(line)?;
        if payload == "[DONE]" {
            return None;
        }
        let event: Value = serde_json::from_str(payload).ok()?;
        non_empty_text(&event["choices"][0]["delta"]["content"])
    }
}

/// `data: {"type":"content_block_delta","delta":{"text":"..."}}`; other event types carry no text.
pub struct AnthropicDeltas;

impl DeltaExtractor for AnthropicDeltas {
    fn extract(&self, line: &str) -> Option<String> {
        let payload = data_payload(line)?;
        let event: Value = serde_json::from_str(payload).ok()?;
        if event["type"].as_str() != Some("content_block_delta") {
            return None;
        }
        non_empty_text(&event["delta"]["text"])
    }
}

/// `data: {"candidates":[{"content":{"parts":[{"text":"..."}]}}]}`.
pub struct GeminiDeltas;

impl DeltaExtractor for GeminiDeltas {
    fn extract(&self, line: &str) -> Option<String> {
        let payload = data_payload(line)?.trim();
        if payload.is_empty() {
            return None;
        }
        let event: Value = serde_json::from_str(payload).ok()?;
        non_empty_text(&event["candidates"][0]["content"]["parts"][0]["text"])
    }
}

impl DeltaExtractor for WireProtocol {
    fn extract(&self, line: &str) -> Option<String> {
        match self {
            WireProtocol::OpenAi => OpenAiDeltas.extract(line),
            WireProtocol::Anthropic => AnthropicDeltas.extract(line),
            WireProtocol::Gemini => GeminiDeltas.extract(line),
        }
    }
}

/// Buffers raw bytes until a full `\n`-terminated line is available, then hands the line
/// (minus a trailing `\r`) to the extractor. Splitting happens on bytes, so a multi-byte
/// character cut across two chunks is reassembled before decoding.
pub struct LineFramer<E> {
    buf: Vec<u8>,
    extractor: E,
}

pub type StreamDecoder = LineFramer<WireProtocol>;

impl<E: DeltaExtractor> LineFramer<E> {
    pub fn new(extractor: E) -> Self {
        Self { buf: Vec::new(), extractor }
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut deltas = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            self.decode_line(&line[..line.len() - 1], &mut deltas);
        }
        deltas
    }

    /// Decode whatever unterminated line is left once the stream ends.
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buf);
        let mut deltas = Vec::new();
        if !rest.is_empty() {
            self.decode_line(&rest, &mut deltas);
        }
        deltas
    }

    fn decode_line(&self, raw: &[u8], deltas: &mut Vec<String>) {
        let line = String::from_utf8_lossy(raw);
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if let Some(delta) = self.extractor.extract(line) {
            deltas.push(delta);
        }
    }
}

/// Decode a whole body in one go.
pub fn decode_all<E: DeltaExtractor>(extractor: E, body: &[u8]) -> Vec<String> {
    let mut framer = LineFramer::new(extractor);
    let mut deltas = framer.feed(body);
    deltas.extend(framer.finish());
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPENAI_BODY: &str = "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\"lo ✓\"}}]}\n\n\
data: [DONE]\n\n";

    #[test]
    fn test_openai_deltas() {
        assert_eq!(decode_all(OpenAiDeltas, OPENAI_BODY.as_bytes()), vec!["Hel", "lo ✓"]);
    }

    #[test]
    fn test_anthropic_deltas() {
        let body = "event: message_start\n\
data: {\"type\":\"message_start\",\"message\":{}}\n\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n\
data: {\"type\":\"message_stop\"}\n\n";
        assert_eq!(decode_all(AnthropicDeltas, body.as_bytes()), vec!["Hi"]);
    }

    #[test]
    fn test_gemini_deltas_with_crlf() {
        let body = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"One\"}]}}]}\r\n\r\n\
data:    \r\n\
data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\" two\"}]}}]}  \r\n";
        assert_eq!(decode_all(GeminiDeltas, body.as_bytes()), vec!["One", " two"]);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let body = "data: {not json\n: keep-alive\ndata: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n";
        assert_eq!(decode_all(WireProtocol::OpenAi, body.as_bytes()), vec!["ok"]);
    }

    #[test]
    fn test_byte_at_a_time_matches_whole() {
        let mut framer = LineFramer::new(OpenAiDeltas);
        let mut deltas = Vec::new();
        for b in OPENAI_BODY.as_bytes() {
            deltas.extend(framer.feed(std::slice::from_ref(b)));
        }
        deltas.extend(framer.finish());
        assert_eq!(deltas, decode_all(OpenAiDeltas, OPENAI_BODY.as_bytes()));
    }

    #[test]
    fn test_trailing_line_decoded_on_finish() {
        let mut framer = LineFramer::new(WireProtocol::Gemini);
        let partial = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"tail\"}]}}]}";
        assert!(framer.feed(partial.as_bytes()).is_empty());
        assert_eq!(framer.finish(), vec!["tail"]);
        assert!(framer.finish().is_empty());
    }
}
