//! SSE framing (C5). Strips the wire-level envelope so adapters only ever
//! see a bare event payload; never re-serializes a payload it didn't build
//! itself.

pub mod accumulator;
pub mod anthropic_emitter;

use crate::adapter::StreamFraming;

/// The `[DONE]` sentinel OpenAI-Chat and AI-SDK terminate their SSE stream
/// with. Dialects framed as `SseLineDelimited` have no equivalent — their
/// stream simply closes.
const DONE_SENTINEL: &str = "[DONE]";

/// Incrementally unwraps raw SSE bytes into bare data payloads. Owns only a
/// pending-bytes buffer; holds no dialect-specific state.
pub struct SseFramer {
    buffer: String,
    framing: StreamFraming,
}

impl SseFramer {
    pub fn new(framing: StreamFraming) -> Self {
        Self { buffer: String::new(), framing }
    }

    /// Feeds newly received bytes and returns every complete event's data
    /// payload now available. `SseStandard` events are `\n\n`-delimited
    /// blocks that may join multiple `data:` lines; `SseLineDelimited`
    /// events are each a single `\n`-terminated line with no blank-line
    /// separator. A `[DONE]` sentinel event (`SseStandard` only) is
    /// consumed but never returned as a payload.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        match self.framing {
            StreamFraming::SseStandard => self.feed_standard(),
            StreamFraming::SseLineDelimited => self.feed_line_delimited(),
        }
    }

    fn feed_standard(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(idx) = self.buffer.find("\n\n") {
            let event: String = self.buffer.drain(..idx + 2).collect();
            if let Some(payload) = extract_data(&event)
                && payload != DONE_SENTINEL
            {
                out.push(payload);
            }
        }
        out
    }

    fn feed_line_delimited(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(idx) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..idx + 1).collect();
            if let Some(payload) = extract_line(&line) {
                out.push(payload);
            }
        }
        out
    }

    /// Flushes a trailing event with no terminating blank line/newline — the
    /// shape sources of either framing use when the connection simply
    /// closes mid-event.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.trim().is_empty() {
            return None;
        }

        let event = std::mem::take(&mut self.buffer);
        match self.framing {
            StreamFraming::SseStandard => extract_data(&event).filter(|payload| payload != DONE_SENTINEL),
            StreamFraming::SseLineDelimited => extract_line(&event),
        }
    }
}

/// Joins every `data:` line in an event block (multi-line payloads are
/// joined with `\n`, matching the SSE spec); ignores `event:`/`id:`/comment
/// lines, since every dialect here already tags its event type inside the
/// JSON body.
fn extract_data(event: &str) -> Option<String> {
    let lines: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();

    if lines.is_empty() { None } else { Some(lines.join("\n")) }
}

/// Extracts one line-delimited event's payload. Tolerates an optional
/// leading `data:` prefix (some line-delimited upstreams still tag lines
/// that way) but otherwise treats the trimmed line itself as the payload;
/// a blank line yields no event.
fn extract_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let payload = trimmed.strip_prefix("data:").map(str::trim_start).unwrap_or(trimmed);
    (!payload.is_empty()).then(|| payload.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_data_prefix_and_done_sentinel() {
        let mut framer = SseFramer::new(StreamFraming::SseStandard);
        let payloads = framer.feed("data: {\"a\":1}\n\ndata: [DONE]\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn line_delimited_framing_has_no_sentinel_to_strip() {
        let mut framer = SseFramer::new(StreamFraming::SseLineDelimited);
        let payloads = framer.feed("data: {\"type\":\"ping\"}\n\n");
        assert_eq!(payloads, vec!["{\"type\":\"ping\"}"]);
    }

    #[test]
    fn partial_event_is_buffered_until_the_blank_line_arrives() {
        let mut framer = SseFramer::new(StreamFraming::SseStandard);
        assert!(framer.feed("data: {\"a\"").is_empty());
        let payloads = framer.feed(":1}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn finish_flushes_a_trailing_event_with_no_blank_line() {
        let mut framer = SseFramer::new(StreamFraming::SseLineDelimited);
        framer.feed("data: {\"a\":1}");
        assert_eq!(framer.finish(), Some("{\"a\":1}".to_string()));
    }

    /// A genuine line-delimited upstream has no blank-line separator at
    /// all; each single `\n` must flush its own event from `feed` directly.
    #[test]
    fn line_delimited_framing_flushes_on_a_single_newline_with_no_blank_line_separator() {
        let mut framer = SseFramer::new(StreamFraming::SseLineDelimited);
        let payloads = framer.feed("{\"a\":1}\n{\"b\":2}\n");
        assert_eq!(payloads, vec!["{\"a\":1}".to_string(), "{\"b\":2}".to_string()]);
    }
}
