//! IR → OpenAI-Chat conversions.

use crate::messages::{openai, unified};

pub fn request(ir: unified::UnifiedRequest, model_override: Option<String>) -> openai::ChatCompletionRequest {
    let mut messages = Vec::with_capacity(ir.messages.len() + 1);

    if let Some(system) = ir.system {
        messages.push(openai::ChatMessage {
            role: openai::ChatRole::System,
            content: Some(openai::MessageContent::Text(system)),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        });
    }

    messages.extend(ir.messages.into_iter().map(message));

    let model = model_override
        .or_else(|| ir.metadata.as_ref().and_then(|m| m.model.clone()))
        .unwrap_or_default();

    let config = ir.config.unwrap_or_default();

    openai::ChatCompletionRequest {
        model,
        messages,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
        stop: config.stop_sequences.map(openai::StopSequences::Many),
        stream: ir.stream,
        tools: ir.tools.map(|tools| tools.into_iter().map(tool).collect()),
        tool_choice: ir.tool_choice.map(tool_choice),
        user: ir.metadata.and_then(|m| m.user_id),
    }
}

fn message(msg: unified::UnifiedMessage) -> openai::ChatMessage {
    let role = match msg.role {
        unified::UnifiedRole::User => openai::ChatRole::User,
        unified::UnifiedRole::Assistant => openai::ChatRole::Assistant,
        unified::UnifiedRole::Tool => openai::ChatRole::Tool,
    };

    // role=tool carries exactly one result.
    if let unified::UnifiedRole::Tool = msg.role
        && let Some(unified::ContentPart::ToolResult(result)) = msg.parts.into_iter().next()
    {
        return openai::ChatMessage {
            role,
            content: Some(openai::MessageContent::Text(result.content)),
            name: None,
            tool_calls: None,
            tool_call_id: Some(result.tool_call_id),
        };
    }

    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for part in msg.parts {
        match part {
            unified::ContentPart::Text(t) => text.push_str(&t.text),
            unified::ContentPart::ToolCall(call) => {
                let arguments = match call.arguments {
                    unified::ToolArguments::Raw(s) => s,
                    unified::ToolArguments::Value(v) => serde_json::to_string(&v).unwrap_or_default(),
                };
                tool_calls.push(openai::ToolCall {
                    id: call.id,
                    r#type: openai::ToolCallType::Function,
                    function: openai::FunctionCall {
                        name: call.name,
                        arguments,
                    },
                });
            }
            // OpenAI-Chat has no image/thinking/tool-result-on-non-tool-role
            // representation in the request path; dropped silently.
            unified::ContentPart::Image(_) | unified::ContentPart::Thinking(_) | unified::ContentPart::ToolResult(_) => {}
        }
    }

    openai::ChatMessage {
        role,
        content: if text.is_empty() { None } else { Some(openai::MessageContent::Text(text)) },
        name: None,
        tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        tool_call_id: None,
    }
}

fn tool(t: unified::UnifiedTool) -> openai::Tool {
    openai::Tool {
        r#type: openai::ToolCallType::Function,
        function: openai::FunctionDefinition {
            name: t.name,
            description: t.description,
            parameters: t.parameters,
        },
    }
}

fn tool_choice(choice: unified::UnifiedToolChoice) -> openai::ToolChoice {
    match choice {
        unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::Auto) => {
            openai::ToolChoice::Mode(openai::ToolChoiceMode::Auto)
        }
        unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::None) => {
            openai::ToolChoice::Mode(openai::ToolChoiceMode::None)
        }
        unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::Required) => {
            openai::ToolChoice::Mode(openai::ToolChoiceMode::Required)
        }
        unified::UnifiedToolChoice::Specific { name, .. } => openai::ToolChoice::Specific {
            r#type: openai::ToolCallType::Function,
            function: openai::ToolChoiceFunction { name },
        },
    }
}

pub fn response(ir: unified::UnifiedResponse, created: i64) -> openai::ChatCompletionResponse {
    let has_tool_calls = ir
        .content
        .iter()
        .any(|p| matches!(p, unified::ContentPart::ToolCall(_)));

    let message = message(unified::UnifiedMessage {
        role: unified::UnifiedRole::Assistant,
        parts: ir.content,
    });

    openai::ChatCompletionResponse {
        id: ir.id,
        object: "chat.completion".into(),
        created,
        model: ir.model.unwrap_or_default(),
        choices: vec![openai::Choice {
            index: 0,
            message,
            finish_reason: Some(finish_reason(ir.stop_reason, has_tool_calls)),
        }],
        usage: ir.usage.map(usage),
    }
}

fn finish_reason(reason: unified::StopReason, has_tool_calls: bool) -> openai::FinishReason {
    if has_tool_calls {
        return openai::FinishReason::ToolCalls;
    }

    match reason {
        unified::StopReason::EndTurn | unified::StopReason::StopSequence | unified::StopReason::Null => {
            openai::FinishReason::Stop
        }
        unified::StopReason::MaxTokens => openai::FinishReason::Length,
        unified::StopReason::ToolUse => openai::FinishReason::ToolCalls,
        unified::StopReason::ContentFilter | unified::StopReason::Error => openai::FinishReason::ContentFilter,
    }
}

fn usage(u: unified::UsageInfo) -> openai::Usage {
    openai::Usage {
        prompt_tokens: u.input_tokens,
        completion_tokens: u.output_tokens,
        total_tokens: u.total_tokens.unwrap_or(u.input_tokens + u.output_tokens),
    }
}

/// Emits a chunk frame from an IR stream chunk. A `ToolCall` IR chunk with
/// `partial_json` set emits the fragment as-is (no re-parse/re-serialize,
/// preserving the streaming-engine's partial-JSON invariant).
pub fn stream_chunk(chunk: unified::StreamChunk, model: &str, created: i64) -> Option<openai::ChatCompletionChunk> {
    let (delta, finish_reason, usage) = match chunk.kind {
        unified::StreamChunkKind::Content => {
            let text = match chunk.delta {
                Some(unified::StreamDelta::Text { text }) => text,
                _ => return None,
            };
            (
                openai::ChunkDelta {
                    content: Some(text),
                    ..Default::default()
                },
                None,
                None,
            )
        }
        unified::StreamChunkKind::ToolCall => {
            let Some(unified::StreamDelta::ToolCall(call)) = chunk.delta else {
                return None;
            };
            let arguments = call
                .partial_json
                .or_else(|| call.arguments.map(|v| serde_json::to_string(&v).unwrap_or_default()));
            (
                openai::ChunkDelta {
                    tool_calls: Some(vec![openai::ToolCallDelta {
                        index: call.index,
                        id: call.id,
                        r#type: Some(openai::ToolCallType::Function),
                        function: Some(openai::FunctionCallDelta {
                            name: call.name,
                            arguments,
                        }),
                    }]),
                    ..Default::default()
                },
                None,
                None,
            )
        }
        unified::StreamChunkKind::Done => (
            openai::ChunkDelta::default(),
            chunk.stop_reason.map(to_openai_finish),
            chunk.usage.map(usage),
        ),
        unified::StreamChunkKind::Thinking | unified::StreamChunkKind::Usage | unified::StreamChunkKind::Error => {
            return None;
        }
    };

    Some(openai::ChatCompletionChunk {
        id: chunk.id.into_owned(),
        object: "chat.completion.chunk".into(),
        created,
        model: model.to_string(),
        choices: vec![openai::ChunkChoice {
            index: 0,
            delta,
            finish_reason,
        }],
        usage,
    })
}

fn to_openai_finish(reason: unified::StopReason) -> openai::FinishReason {
    finish_reason(reason, reason == unified::StopReason::ToolUse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fragment_passes_through_without_reparsing() {
        let chunk = unified::StreamChunk {
            id: "chatcmpl_1".into(),
            kind: unified::StreamChunkKind::ToolCall,
            delta: Some(unified::StreamDelta::ToolCall(unified::ToolCallDelta {
                index: 0,
                id: Some("call_1".into()),
                name: Some("get_weather".into()),
                partial_json: Some(r#"{"x":1"#.into()),
                arguments: None,
            })),
            stop_reason: None,
            usage: None,
            error: None,
        };

        let out = stream_chunk(chunk, "gpt-4o", 0).unwrap();
        let tool_calls = out.choices[0].delta.tool_calls.as_ref().unwrap();
        assert_eq!(
            tool_calls[0].function.as_ref().unwrap().arguments.as_deref(),
            Some(r#"{"x":1"#)
        );
    }
}
