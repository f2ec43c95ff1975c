//! Anthropic → IR conversions.

use crate::messages::{anthropic, unified};

pub fn request(req: anthropic::Request) -> unified::UnifiedRequest {
    let (system, system_blocks) = match req.system {
        Some(anthropic::SystemPrompt::Text(text)) => (Some(text), None),
        Some(anthropic::SystemPrompt::Blocks(blocks)) => {
            let flattened = blocks.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join("\n");
            let blocks = blocks
                .into_iter()
                .map(|b| unified::SystemBlock {
                    text: b.text,
                    cache_control: b.cache_control.map(cache_control),
                })
                .collect();
            (Some(flattened), Some(blocks))
        }
        None => (None, None),
    };

    unified::UnifiedRequest {
        messages: req.messages.into_iter().map(message).collect(),
        system,
        system_blocks,
        tools: req.tools.map(|tools| tools.into_iter().map(tool).collect()),
        tool_choice: req.tool_choice.map(tool_choice),
        config: Some(unified::GenerationConfig {
            max_tokens: Some(req.max_tokens),
            temperature: req.temperature,
            top_p: req.top_p,
            top_k: req.top_k,
            stop_sequences: req.stop_sequences,
        }),
        thinking: req.thinking.map(thinking_config),
        stream: req.stream,
        metadata: Some(unified::UnifiedMetadata {
            user_id: req.metadata.and_then(|m| m.user_id),
            model: Some(req.model),
            extra: Default::default(),
        }),
    }
}

fn thinking_config(config: anthropic::ThinkingConfig) -> unified::ThinkingConfig {
    match config {
        anthropic::ThinkingConfig::Enabled { budget_tokens, .. } => unified::ThinkingConfig {
            enabled: true,
            budget: Some(budget_tokens),
        },
        anthropic::ThinkingConfig::Disabled { .. } => unified::ThinkingConfig {
            enabled: false,
            budget: None,
        },
    }
}

fn cache_control(cc: anthropic::CacheControl) -> unified::CacheControl {
    match cc {
        anthropic::CacheControl::Ephemeral { ttl } => unified::CacheControl {
            kind: unified::CacheControlKind::Ephemeral,
            ttl: ttl.map(cache_control_ttl),
        },
    }
}

fn cache_control_ttl(ttl: anthropic::CacheControlTtl) -> unified::CacheControlTtl {
    match ttl {
        anthropic::CacheControlTtl::FiveMinutes => unified::CacheControlTtl::FiveMinutes,
        anthropic::CacheControlTtl::OneHour => unified::CacheControlTtl::OneHour,
        anthropic::CacheControlTtl::Unknown(s) => unified::CacheControlTtl::Unknown(s),
    }
}

fn message(msg: anthropic::Message) -> unified::UnifiedMessage {
    let role = match msg.role {
        anthropic::Role::User => unified::UnifiedRole::User,
        anthropic::Role::Assistant => unified::UnifiedRole::Assistant,
    };

    unified::UnifiedMessage {
        role,
        parts: msg.content.into_iter().map(content).collect(),
    }
}

fn content(block: anthropic::Content) -> unified::ContentPart {
    match block {
        anthropic::Content::Text(text) => unified::ContentPart::Text(unified::TextPart {
            text: text.text,
            cache_control: text.cache_control.map(cache_control),
        }),
        anthropic::Content::Image { source } => match source {
            anthropic::ImageSource::Base64 { media_type, data } => {
                unified::ContentPart::Image(unified::ImagePart::from_base64(media_type, data))
            }
            anthropic::ImageSource::Url { url } => unified::ContentPart::Image(unified::ImagePart::from_url("", url)),
        },
        anthropic::Content::ToolUse { id, name, input } => unified::ContentPart::ToolCall(unified::ToolCallPart {
            id,
            name,
            arguments: unified::ToolArguments::Value(input),
        }),
        anthropic::Content::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => unified::ContentPart::ToolResult(unified::ToolResultPart {
            tool_call_id: tool_use_id,
            content: content.as_text(),
            is_error,
        }),
        anthropic::Content::Thinking { thinking, signature } => unified::ContentPart::Thinking(unified::ThinkingPart {
            text: thinking,
            signature: Some(signature),
            redacted: false,
        }),
        // Redacted thinking carries no recoverable text (DESIGN.md §3).
        anthropic::Content::RedactedThinking { .. } => unified::ContentPart::Thinking(unified::ThinkingPart {
            text: String::new(),
            signature: None,
            redacted: true,
        }),
    }
}

fn tool(t: anthropic::Tool) -> unified::UnifiedTool {
    unified::UnifiedTool {
        name: t.name,
        description: Some(t.description),
        parameters: t.input_schema,
    }
}

fn tool_choice(choice: anthropic::ToolChoice) -> unified::UnifiedToolChoice {
    match choice {
        anthropic::ToolChoice::Auto => unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::Auto),
        anthropic::ToolChoice::Any => unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::Required),
        anthropic::ToolChoice::Tool { name } => unified::UnifiedToolChoice::Specific {
            kind: unified::ToolChoiceSpecificKind::Tool,
            name,
        },
    }
}

pub fn response(resp: anthropic::Response) -> unified::UnifiedResponse {
    let content: Vec<_> = resp.content.into_iter().map(content).collect();
    let thinking: Vec<_> = content
        .iter()
        .filter_map(|p| match p {
            unified::ContentPart::Thinking(t) => Some(t.clone()),
            _ => None,
        })
        .collect();

    let has_tool_calls = content.iter().any(|p| matches!(p, unified::ContentPart::ToolCall(_)));

    unified::UnifiedResponse {
        id: resp.id,
        model: Some(resp.model),
        content,
        stop_reason: stop_reason(resp.stop_reason, has_tool_calls),
        usage: Some(usage(resp.usage)),
        thinking: if thinking.is_empty() { None } else { Some(thinking) },
    }
}

fn stop_reason(reason: Option<anthropic::StopReason>, has_tool_calls: bool) -> unified::StopReason {
    if has_tool_calls {
        return unified::StopReason::ToolUse;
    }

    match reason {
        Some(anthropic::StopReason::EndTurn) => unified::StopReason::EndTurn,
        Some(anthropic::StopReason::MaxTokens) => unified::StopReason::MaxTokens,
        Some(anthropic::StopReason::StopSequence) => unified::StopReason::StopSequence,
        Some(anthropic::StopReason::ToolUse) => unified::StopReason::ToolUse,
        None => unified::StopReason::Null,
    }
}

fn usage(u: anthropic::Usage) -> unified::UsageInfo {
    unified::UsageInfo {
        input_tokens: u.input_tokens,
        output_tokens: u.output_tokens,
        total_tokens: Some(u.input_tokens + u.output_tokens),
        cached_tokens: u.cache_read_input_tokens,
        thinking_tokens: None,
    }
}

/// Parses a single Anthropic SSE event into zero or one IR chunks. Tool-call
/// index fixup: Anthropic emits the argument index as a `content_block`
/// index shared with text/thinking blocks, so the caller must track
/// `(response, content_block_index) -> tool_call_index` itself; this
/// function emits the content-block index unchanged and leaves remapping to
/// the accumulator.
pub fn stream_event(id: &str, event: anthropic::StreamEvent) -> Option<unified::StreamChunk> {
    let cow_id: std::borrow::Cow<'static, str> = id.to_string().into();

    match event {
        anthropic::StreamEvent::ContentBlockDelta { index, delta } => match delta {
            anthropic::ContentDelta::TextDelta { text } => Some(unified::StreamChunk {
                id: cow_id,
                kind: unified::StreamChunkKind::Content,
                delta: Some(unified::StreamDelta::Text { text }),
                stop_reason: None,
                usage: None,
                error: None,
            }),
            anthropic::ContentDelta::ThinkingDelta { thinking } => Some(unified::StreamChunk {
                id: cow_id,
                kind: unified::StreamChunkKind::Thinking,
                delta: Some(unified::StreamDelta::Thinking { text: thinking }),
                stop_reason: None,
                usage: None,
                error: None,
            }),
            anthropic::ContentDelta::InputJsonDelta { partial_json } => Some(unified::StreamChunk {
                id: cow_id,
                kind: unified::StreamChunkKind::ToolCall,
                delta: Some(unified::StreamDelta::ToolCall(unified::ToolCallDelta {
                    index,
                    id: None,
                    name: None,
                    partial_json: Some(partial_json),
                    arguments: None,
                })),
                stop_reason: None,
                usage: None,
                error: None,
            }),
            // Signature deltas carry no IR-observable content; the engine
            // attaches the signature to the finalized Thinking part instead.
            anthropic::ContentDelta::SignatureDelta { .. } => None,
        },
        anthropic::StreamEvent::ContentBlockStart { index, content_block } => match content_block {
            anthropic::Content::ToolUse { id: call_id, name, .. } => Some(unified::StreamChunk {
                id: cow_id,
                kind: unified::StreamChunkKind::ToolCall,
                delta: Some(unified::StreamDelta::ToolCall(unified::ToolCallDelta {
                    index,
                    id: Some(call_id),
                    name: Some(name),
                    partial_json: None,
                    arguments: None,
                })),
                stop_reason: None,
                usage: None,
                error: None,
            }),
            _ => None,
        },
        anthropic::StreamEvent::MessageDelta { delta, usage: u } => Some(unified::StreamChunk {
            id: cow_id,
            kind: unified::StreamChunkKind::Done,
            delta: None,
            stop_reason: Some(stop_reason(delta.stop_reason, false)),
            usage: Some(usage(u)),
            error: None,
        }),
        anthropic::StreamEvent::Error { error } => Some(unified::StreamChunk {
            id: cow_id,
            kind: unified::StreamChunkKind::Error,
            delta: None,
            stop_reason: Some(unified::StopReason::Error),
            usage: None,
            error: Some(error.message),
        }),
        // message_start/content_block_stop/message_stop/ping are lifecycle
        // markers with no IR-observable payload.
        anthropic::StreamEvent::MessageStart { .. }
        | anthropic::StreamEvent::ContentBlockStop { .. }
        | anthropic::StreamEvent::MessageStop
        | anthropic::StreamEvent::Ping => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_thinking_has_no_text_but_is_marked() {
        let part = content(anthropic::Content::RedactedThinking { data: "opaque".into() });
        let unified::ContentPart::Thinking(t) = part else {
            panic!("expected thinking part");
        };
        assert!(t.redacted);
        assert_eq!(t.text, "");
    }

    #[test]
    fn tool_use_in_content_overrides_stop_reason_to_tool_use() {
        assert_eq!(
            stop_reason(Some(anthropic::StopReason::EndTurn), true),
            unified::StopReason::ToolUse
        );
    }
}
