//! Anthropic's streaming lifecycle (`message_start` / `content_block_*` /
//! `message_delta` / `message_stop`) can't be reconstructed one IR chunk at a
//! time — unlike every other dialect here, it needs running state across the
//! whole stream. This is that state machine; the streaming engine drives it
//! directly instead of going through `DialectAdapter::transform_stream_chunk`
//! for this one dialect (see `adapter::anthropic`).

use std::collections::HashMap;

use crate::messages::anthropic::{self, ContentDelta};
use crate::messages::unified::{self, StreamChunk, StreamChunkKind, StreamDelta, UsageInfo};
use crate::streaming::accumulator::ToolCallAccumulator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenBlock {
    Text,
    Thinking,
    ToolUse,
}

pub struct AnthropicStreamEmitter {
    model: String,
    started: bool,
    next_index: u32,
    open_block: Option<(u32, OpenBlock)>,
    tool_indices: HashMap<u32, u32>,
    tool_calls: ToolCallAccumulator,
    usage: UsageInfo,
}

impl AnthropicStreamEmitter {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            started: false,
            next_index: 0,
            open_block: None,
            tool_indices: HashMap::new(),
            tool_calls: ToolCallAccumulator::new(),
            usage: UsageInfo::default(),
        }
    }

    /// Feeds one IR chunk and returns every Anthropic event it produces (zero,
    /// one, or several — e.g. a `Done` chunk closes the open block, emits the
    /// final `message_delta`, and then `message_stop`).
    pub fn push(&mut self, response_id: &str, chunk: &StreamChunk) -> Vec<anthropic::StreamEvent> {
        let mut events = Vec::new();

        if !self.started {
            self.started = true;
            events.push(anthropic::StreamEvent::MessageStart {
                message: anthropic::StreamMessageStart {
                    id: response_id.to_string(),
                    role: anthropic::Role::Assistant,
                    content: Vec::new(),
                    model: self.model.clone(),
                    usage: anthropic::Usage::default(),
                },
            });
        }

        match chunk.kind {
            StreamChunkKind::Content => {
                if let Some(StreamDelta::Text { text }) = &chunk.delta {
                    events.extend(self.ensure_block(OpenBlock::Text));
                    events.push(anthropic::StreamEvent::ContentBlockDelta {
                        index: self.open_block.unwrap().0,
                        delta: ContentDelta::TextDelta { text: text.clone() },
                    });
                }
            }
            StreamChunkKind::Thinking => {
                if let Some(StreamDelta::Thinking { text }) = &chunk.delta {
                    events.extend(self.ensure_block(OpenBlock::Thinking));
                    events.push(anthropic::StreamEvent::ContentBlockDelta {
                        index: self.open_block.unwrap().0,
                        delta: ContentDelta::ThinkingDelta { thinking: text.clone() },
                    });
                }
            }
            StreamChunkKind::ToolCall => {
                if let Some(StreamDelta::ToolCall(delta)) = &chunk.delta {
                    events.extend(self.ensure_tool_block(delta.index, delta.id.as_deref(), delta.name.as_deref()));
                    self.tool_calls.push(response_id, delta);

                    if let Some(fragment) = &delta.partial_json {
                        let index = self.tool_indices[&delta.index];
                        events.push(anthropic::StreamEvent::ContentBlockDelta {
                            index,
                            delta: ContentDelta::InputJsonDelta {
                                partial_json: fragment.clone(),
                            },
                        });
                    }
                }
            }
            StreamChunkKind::Usage => {
                if let Some(usage) = &chunk.usage {
                    self.usage = *usage;
                }
            }
            StreamChunkKind::Done => {
                events.extend(self.close_open_block());

                if let Some(usage) = &chunk.usage {
                    self.usage = *usage;
                }

                let has_tool_calls = self.tool_indices.values().next().is_some();
                let stop_reason = chunk.stop_reason.unwrap_or(unified::StopReason::EndTurn);

                events.push(anthropic::StreamEvent::MessageDelta {
                    delta: anthropic::MessageDelta {
                        stop_reason: Some(unified::to_anthropic::stop_reason(stop_reason, has_tool_calls)),
                        stop_sequence: None,
                    },
                    usage: unified::to_anthropic::usage(self.usage),
                });
                events.push(anthropic::StreamEvent::MessageStop);
            }
            StreamChunkKind::Error => {
                events.extend(self.close_open_block());
                events.push(anthropic::StreamEvent::Error {
                    error: anthropic::ErrorDetails {
                        r#type: "overloaded_error".into(),
                        message: chunk.error.clone().unwrap_or_default(),
                    },
                });
            }
        }

        events
    }

    fn ensure_block(&mut self, kind: OpenBlock) -> Vec<anthropic::StreamEvent> {
        if self.open_block.map(|(_, k)| k) == Some(kind) {
            return Vec::new();
        }

        let mut events = self.close_open_block();
        let index = self.next_index;
        self.next_index += 1;
        self.open_block = Some((index, kind));

        let content_block = match kind {
            OpenBlock::Text => anthropic::Content::Text(anthropic::TextBlock {
                text: String::new(),
                cache_control: None,
            }),
            OpenBlock::Thinking => anthropic::Content::Thinking {
                thinking: String::new(),
                signature: String::new(),
            },
            OpenBlock::ToolUse => unreachable!("tool blocks are opened through ensure_tool_block"),
        };

        events.push(anthropic::StreamEvent::ContentBlockStart { index, content_block });
        events
    }

    fn ensure_tool_block(&mut self, tool_index: u32, id: Option<&str>, name: Option<&str>) -> Vec<anthropic::StreamEvent> {
        if self.tool_indices.contains_key(&tool_index) {
            return Vec::new();
        }

        let mut events = self.close_open_block();
        let index = self.next_index;
        self.next_index += 1;
        self.tool_indices.insert(tool_index, index);
        self.open_block = Some((index, OpenBlock::ToolUse));

        events.push(anthropic::StreamEvent::ContentBlockStart {
            index,
            content_block: anthropic::Content::ToolUse {
                id: id.unwrap_or_default().to_string(),
                name: name.unwrap_or_default().to_string(),
                input: serde_json::Value::Object(serde_json::Map::new()),
            },
        });
        events
    }

    fn close_open_block(&mut self) -> Vec<anthropic::StreamEvent> {
        match self.open_block.take() {
            Some((index, _)) => vec![anthropic::StreamEvent::ContentBlockStop { index }],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::unified::ToolCallDelta;

    fn text_chunk(text: &str) -> StreamChunk {
        StreamChunk {
            id: "resp-1".into(),
            kind: StreamChunkKind::Content,
            delta: Some(StreamDelta::Text { text: text.into() }),
            stop_reason: None,
            usage: None,
            error: None,
        }
    }

    fn done_chunk(stop_reason: unified::StopReason) -> StreamChunk {
        StreamChunk {
            id: "resp-1".into(),
            kind: StreamChunkKind::Done,
            delta: None,
            stop_reason: Some(stop_reason),
            usage: Some(UsageInfo {
                input_tokens: 10,
                output_tokens: 5,
                ..Default::default()
            }),
            error: None,
        }
    }

    #[test]
    fn first_chunk_emits_message_start_then_a_text_block() {
        let mut emitter = AnthropicStreamEmitter::new("claude-3-5-sonnet");
        let events = emitter.push("resp-1", &text_chunk("hi"));

        assert!(matches!(events[0], anthropic::StreamEvent::MessageStart { .. }));
        assert!(matches!(events[1], anthropic::StreamEvent::ContentBlockStart { index: 0, .. }));
        assert!(matches!(events[2], anthropic::StreamEvent::ContentBlockDelta { index: 0, .. }));
    }

    #[test]
    fn subsequent_text_chunks_reuse_the_open_block() {
        let mut emitter = AnthropicStreamEmitter::new("claude-3-5-sonnet");
        emitter.push("resp-1", &text_chunk("hi"));
        let events = emitter.push("resp-1", &text_chunk(" there"));

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], anthropic::StreamEvent::ContentBlockDelta { index: 0, .. }));
    }

    #[test]
    fn done_chunk_closes_the_block_and_stops_the_message() {
        let mut emitter = AnthropicStreamEmitter::new("claude-3-5-sonnet");
        emitter.push("resp-1", &text_chunk("hi"));
        let events = emitter.push("resp-1", &done_chunk(unified::StopReason::EndTurn));

        assert!(matches!(events[0], anthropic::StreamEvent::ContentBlockStop { index: 0 }));
        assert!(matches!(events[1], anthropic::StreamEvent::MessageDelta { .. }));
        assert!(matches!(events[2], anthropic::StreamEvent::MessageStop));
    }

    #[test]
    fn tool_call_deltas_open_a_distinct_block_from_text() {
        let mut emitter = AnthropicStreamEmitter::new("claude-3-5-sonnet");
        emitter.push("resp-1", &text_chunk("hi"));

        let tool_chunk = StreamChunk {
            id: "resp-1".into(),
            kind: StreamChunkKind::ToolCall,
            delta: Some(StreamDelta::ToolCall(ToolCallDelta {
                index: 0,
                id: Some("call_1".into()),
                name: Some("get_weather".into()),
                partial_json: Some("{}".into()),
                arguments: None,
            })),
            stop_reason: None,
            usage: None,
            error: None,
        };

        let events = emitter.push("resp-1", &tool_chunk);
        assert!(matches!(events[0], anthropic::StreamEvent::ContentBlockStop { index: 0 }));
        assert!(matches!(events[1], anthropic::StreamEvent::ContentBlockStart { index: 1, .. }));
    }
}
