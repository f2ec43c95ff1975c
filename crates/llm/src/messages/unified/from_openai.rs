//! OpenAI-Chat → IR conversions. Moves, never clones, the incoming wire
//! value.

use crate::messages::{openai, unified};

pub fn request(req: openai::ChatCompletionRequest) -> unified::UnifiedRequest {
    let mut system_parts = Vec::new();
    let mut messages = Vec::with_capacity(req.messages.len());

    for msg in req.messages {
        match msg.role {
            openai::ChatRole::System => {
                if let Some(content) = msg.content {
                    system_parts.push(content.as_text());
                }
            }
            _ => messages.push(message(msg)),
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n"))
    };

    unified::UnifiedRequest {
        messages,
        system,
        system_blocks: None,
        tools: req.tools.map(|tools| tools.into_iter().map(tool).collect()),
        tool_choice: req.tool_choice.map(tool_choice),
        config: Some(unified::GenerationConfig {
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            top_p: req.top_p,
            top_k: None,
            stop_sequences: req.stop.map(stop_sequences),
        }),
        thinking: None,
        stream: req.stream,
        metadata: Some(unified::UnifiedMetadata {
            user_id: req.user,
            model: Some(req.model),
            extra: Default::default(),
        }),
    }
}

fn stop_sequences(stop: openai::StopSequences) -> Vec<String> {
    match stop {
        openai::StopSequences::One(s) => vec![s],
        openai::StopSequences::Many(v) => v,
    }
}

fn message(msg: openai::ChatMessage) -> unified::UnifiedMessage {
    let role = match msg.role {
        openai::ChatRole::User => unified::UnifiedRole::User,
        openai::ChatRole::Assistant => unified::UnifiedRole::Assistant,
        openai::ChatRole::Tool => unified::UnifiedRole::Tool,
        openai::ChatRole::System => unified::UnifiedRole::User,
    };

    let mut parts = Vec::new();

    if let Some(content) = msg.content {
        match content {
            openai::MessageContent::Text(text) => {
                if !text.is_empty() {
                    parts.push(unified::ContentPart::Text(unified::TextPart {
                        text,
                        cache_control: None,
                    }));
                }
            }
            openai::MessageContent::Parts(blocks) => {
                for block in blocks {
                    match block {
                        openai::ContentBlock::Text { text } => {
                            parts.push(unified::ContentPart::Text(unified::TextPart {
                                text,
                                cache_control: None,
                            }));
                        }
                        openai::ContentBlock::ImageUrl { image_url } => {
                            parts.push(unified::ContentPart::Image(unified::ImagePart::from_url(
                                "",
                                image_url.url,
                            )));
                        }
                    }
                }
            }
        }
    }

    if let Some(tool_call_id) = msg.tool_call_id {
        // A `role=tool` message carries exactly one result, keyed by id.
        let content = parts
            .iter()
            .find_map(|p| match p {
                unified::ContentPart::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .unwrap_or_default();
        parts.clear();
        parts.push(unified::ContentPart::ToolResult(unified::ToolResultPart {
            tool_call_id,
            content,
            is_error: None,
        }));
    }

    if let Some(tool_calls) = msg.tool_calls {
        for call in tool_calls {
            parts.push(unified::ContentPart::ToolCall(unified::ToolCallPart {
                id: call.id,
                name: call.function.name,
                arguments: unified::ToolArguments::Raw(call.function.arguments),
            }));
        }
    }

    unified::UnifiedMessage { role, parts }
}

fn tool(t: openai::Tool) -> unified::UnifiedTool {
    unified::UnifiedTool {
        name: t.function.name,
        description: t.function.description,
        parameters: t.function.parameters,
    }
}

fn tool_choice(choice: openai::ToolChoice) -> unified::UnifiedToolChoice {
    match choice {
        openai::ToolChoice::Mode(openai::ToolChoiceMode::Auto) => {
            unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::Auto)
        }
        openai::ToolChoice::Mode(openai::ToolChoiceMode::None) => {
            unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::None)
        }
        openai::ToolChoice::Mode(openai::ToolChoiceMode::Required) => {
            unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::Required)
        }
        openai::ToolChoice::Specific { function, .. } => unified::UnifiedToolChoice::Specific {
            kind: unified::ToolChoiceSpecificKind::Tool,
            name: function.name,
        },
    }
}

pub fn response(resp: openai::ChatCompletionResponse) -> unified::UnifiedResponse {
    let choice = resp.choices.into_iter().next();
    let (content, stop_reason) = match choice {
        Some(choice) => {
            let message = message(choice.message);
            let stop_reason = finish_reason(choice.finish_reason, has_tool_calls(&message));
            (message.parts, stop_reason)
        }
        None => (Vec::new(), unified::StopReason::Null),
    };

    unified::UnifiedResponse {
        id: resp.id,
        model: Some(resp.model),
        content,
        stop_reason,
        usage: resp.usage.map(usage),
        thinking: None,
    }
}

fn has_tool_calls(message: &unified::UnifiedMessage) -> bool {
    message.tool_calls().next().is_some()
}

fn finish_reason(reason: Option<openai::FinishReason>, has_tool_calls: bool) -> unified::StopReason {
    if has_tool_calls {
        return unified::StopReason::ToolUse;
    }

    match reason {
        Some(openai::FinishReason::Stop) => unified::StopReason::EndTurn,
        Some(openai::FinishReason::Length) => unified::StopReason::MaxTokens,
        Some(openai::FinishReason::ToolCalls) => unified::StopReason::ToolUse,
        Some(openai::FinishReason::ContentFilter) => unified::StopReason::ContentFilter,
        None => unified::StopReason::Null,
    }
}

fn usage(u: openai::Usage) -> unified::UsageInfo {
    unified::UsageInfo {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
        total_tokens: Some(u.total_tokens),
        cached_tokens: None,
        thinking_tokens: None,
    }
}

/// Parses a single Chat-style stream chunk into zero or more IR chunks.
/// `[DONE]` must be recognized by the caller (the streaming engine) before
/// reaching this function; it is a framing sentinel, not a JSON payload.
pub fn stream_chunk(chunk: openai::ChatCompletionChunk) -> Vec<unified::StreamChunk> {
    let id: std::borrow::Cow<'static, str> = chunk.id.clone().into();
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Vec::new();
    };

    let mut out = Vec::new();

    if let Some(content) = choice.delta.content
        && !content.is_empty()
    {
        out.push(unified::StreamChunk {
            id: id.clone(),
            kind: unified::StreamChunkKind::Content,
            delta: Some(unified::StreamDelta::Text { text: content }),
            stop_reason: None,
            usage: None,
            error: None,
        });
    }

    if let Some(tool_calls) = choice.delta.tool_calls {
        for call in tool_calls {
            out.push(unified::StreamChunk {
                id: id.clone(),
                kind: unified::StreamChunkKind::ToolCall,
                delta: Some(unified::StreamDelta::ToolCall(unified::ToolCallDelta {
                    index: call.index,
                    id: call.id,
                    name: call.function.as_ref().and_then(|f| f.name.clone()),
                    partial_json: call.function.and_then(|f| f.arguments),
                    arguments: None,
                })),
                stop_reason: None,
                usage: None,
                error: None,
            });
        }
    }

    if let Some(reason) = choice.finish_reason {
        out.push(unified::StreamChunk {
            id: id.clone(),
            kind: unified::StreamChunkKind::Done,
            delta: None,
            stop_reason: Some(finish_reason(Some(reason), false)),
            usage: chunk.usage.map(usage),
            error: None,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_messages_are_concatenated_into_a_flat_system_field() {
        let req = openai::ChatCompletionRequest {
            model: "gpt-4o".into(),
            messages: vec![
                openai::ChatMessage {
                    role: openai::ChatRole::System,
                    content: Some(openai::MessageContent::Text("be brief".into())),
                    name: None,
                    tool_calls: None,
                    tool_call_id: None,
                },
                openai::ChatMessage {
                    role: openai::ChatRole::User,
                    content: Some(openai::MessageContent::Text("hi".into())),
                    name: None,
                    tool_calls: None,
                    tool_call_id: None,
                },
            ],
            max_tokens: None,
            temperature: None,
            top_p: None,
            stop: None,
            stream: None,
            tools: None,
            tool_choice: None,
            user: None,
        };

        let ir = request(req);
        assert_eq!(ir.system.as_deref(), Some("be brief"));
        assert_eq!(ir.messages.len(), 1);
        assert_eq!(ir.metadata.unwrap().model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn a_present_tool_call_overrides_stop_finish_reason() {
        let message = unified::UnifiedMessage {
            role: unified::UnifiedRole::Assistant,
            parts: vec![unified::ContentPart::ToolCall(unified::ToolCallPart {
                id: "call_1".into(),
                name: "f".into(),
                arguments: unified::ToolArguments::Raw("{}".into()),
            })],
        };

        assert_eq!(
            finish_reason(Some(openai::FinishReason::Stop), has_tool_calls(&message)),
            unified::StopReason::ToolUse
        );
    }
}
