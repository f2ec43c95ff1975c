//! IR → Gemini `generateContent` conversions.

use serde_json::Value;

use crate::messages::{gemini, unified};

pub fn request(ir: unified::UnifiedRequest) -> gemini::GenerateRequest {
    let system_instruction = ir.system.map(|text| gemini::SystemInstruction {
        parts: vec![gemini::Part {
            text: Some(text),
            ..Default::default()
        }],
    });

    let config = ir.config.unwrap_or_default();

    gemini::GenerateRequest {
        contents: ir.messages.into_iter().map(message).collect(),
        system_instruction,
        tools: ir.tools.map(|tools| {
            vec![gemini::ToolDeclaration {
                function_declarations: tools.into_iter().map(tool).collect(),
            }]
        }),
        tool_config: ir.tool_choice.map(tool_choice),
        generation_config: Some(gemini::GenerationConfig {
            max_output_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            stop_sequences: config.stop_sequences,
            thinking_config: ir.thinking.map(thinking_config),
        }),
    }
}

fn thinking_config(config: unified::ThinkingConfig) -> gemini::ThinkingConfig {
    gemini::ThinkingConfig {
        thinking_budget: config.budget,
        include_thoughts: Some(config.enabled),
    }
}

fn message(msg: unified::UnifiedMessage) -> gemini::Content {
    // Gemini has no tool role; tool results travel as `user` content (spec
    // role mapping: `user` covers both user and tool turns).
    let role = match msg.role {
        unified::UnifiedRole::User | unified::UnifiedRole::Tool => gemini::ContentRole::User,
        unified::UnifiedRole::Assistant => gemini::ContentRole::Model,
    };

    gemini::Content {
        role,
        parts: msg.parts.into_iter().map(part).collect(),
    }
}

fn part(part: unified::ContentPart) -> gemini::Part {
    match part {
        unified::ContentPart::Text(t) => gemini::Part {
            text: Some(t.text),
            ..Default::default()
        },
        unified::ContentPart::Image(image) => gemini::Part {
            inline_data: Some(gemini::InlineData {
                mime_type: image.mime_type,
                data: image.data.unwrap_or_default(),
            }),
            ..Default::default()
        },
        unified::ContentPart::ToolCall(call) => gemini::Part {
            function_call: Some(gemini::FunctionCall {
                name: call.name,
                args: call.arguments.as_value(),
                id: Some(call.id),
            }),
            ..Default::default()
        },
        unified::ContentPart::ToolResult(result) => gemini::Part {
            function_response: Some(gemini::FunctionResponse {
                name: result.tool_call_id.clone(),
                response: serde_json::from_str::<Value>(&result.content)
                    .unwrap_or_else(|_| serde_json::json!({ "result": result.content })),
                id: Some(result.tool_call_id),
            }),
            ..Default::default()
        },
        unified::ContentPart::Thinking(t) => gemini::Part {
            text: Some(t.text),
            thought: true,
            thought_signature: t.signature,
            ..Default::default()
        },
    }
}

fn tool(t: unified::UnifiedTool) -> gemini::FunctionDeclaration {
    let mut parameters = t.parameters;
    gemini::strip_unsupported_schema_fields(&mut parameters);

    gemini::FunctionDeclaration {
        name: t.name,
        description: t.description,
        parameters,
    }
}

fn tool_choice(choice: unified::UnifiedToolChoice) -> gemini::ToolConfig {
    let mode = match choice {
        unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::Auto) => gemini::FunctionCallingMode::Auto,
        unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::None) => gemini::FunctionCallingMode::None,
        unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::Required) => gemini::FunctionCallingMode::Any,
        // Gemini has no way to pin a single named tool; `ANY` is the closest
        // approximation (forces some tool call, not necessarily this one).
        unified::UnifiedToolChoice::Specific { .. } => gemini::FunctionCallingMode::Any,
    };

    gemini::ToolConfig {
        function_calling_config: gemini::FunctionCallingConfig { mode },
    }
}

pub fn response(ir: unified::UnifiedResponse, response_id: String) -> gemini::GenerateResponse {
    let has_tool_calls = ir.content.iter().any(|p| matches!(p, unified::ContentPart::ToolCall(_)));

    gemini::GenerateResponse {
        candidates: vec![gemini::Candidate {
            content: gemini::Content {
                role: gemini::ContentRole::Model,
                parts: ir.content.into_iter().map(part).collect(),
            },
            finish_reason: Some(finish_reason(ir.stop_reason, has_tool_calls)),
        }],
        usage_metadata: ir.usage.map(usage),
        response_id: Some(response_id),
        model_version: ir.model,
    }
}

fn finish_reason(reason: unified::StopReason, has_tool_calls: bool) -> gemini::FinishReason {
    if has_tool_calls {
        return gemini::FinishReason::Stop;
    }

    match reason {
        unified::StopReason::EndTurn
        | unified::StopReason::ToolUse
        | unified::StopReason::StopSequence
        | unified::StopReason::Null => gemini::FinishReason::Stop,
        unified::StopReason::MaxTokens => gemini::FinishReason::MaxTokens,
        unified::StopReason::ContentFilter => gemini::FinishReason::Safety,
        unified::StopReason::Error => gemini::FinishReason::Other,
    }
}

fn usage(u: unified::UsageInfo) -> gemini::UsageMetadata {
    gemini::UsageMetadata {
        prompt_token_count: u.input_tokens,
        candidates_token_count: u.output_tokens,
        total_token_count: u.total_tokens.unwrap_or(u.input_tokens + u.output_tokens),
        cached_content_token_count: u.cached_tokens,
        thoughts_token_count: u.thinking_tokens,
    }
}

/// Emits one `generateContent` stream fragment per IR chunk. `Done` chunks
/// carry no parts of their own; they only close out the candidate with a
/// finish reason and usage totals.
pub fn stream_chunk(chunk: unified::StreamChunk) -> Option<gemini::GenerateResponse> {
    let part = match chunk.kind {
        unified::StreamChunkKind::Content => match chunk.delta {
            Some(unified::StreamDelta::Text { text }) => gemini::Part {
                text: Some(text),
                ..Default::default()
            },
            _ => return None,
        },
        unified::StreamChunkKind::Thinking => match chunk.delta {
            Some(unified::StreamDelta::Thinking { text }) => gemini::Part {
                text: Some(text),
                thought: true,
                ..Default::default()
            },
            _ => return None,
        },
        unified::StreamChunkKind::ToolCall => {
            let Some(unified::StreamDelta::ToolCall(call)) = chunk.delta else {
                return None;
            };
            gemini::Part {
                function_call: Some(gemini::FunctionCall {
                    name: call.name.unwrap_or_default(),
                    args: call.arguments.unwrap_or(Value::Null),
                    id: call.id,
                }),
                ..Default::default()
            }
        }
        unified::StreamChunkKind::Done => {
            return Some(gemini::GenerateResponse {
                candidates: vec![gemini::Candidate {
                    content: gemini::Content {
                        role: gemini::ContentRole::Model,
                        parts: Vec::new(),
                    },
                    finish_reason: Some(chunk.stop_reason.map(|r| finish_reason(r, false)).unwrap_or(gemini::FinishReason::Stop)),
                }],
                usage_metadata: chunk.usage.map(usage),
                response_id: None,
                model_version: None,
            });
        }
        unified::StreamChunkKind::Usage | unified::StreamChunkKind::Error => return None,
    };

    Some(gemini::GenerateResponse {
        candidates: vec![gemini::Candidate {
            content: gemini::Content {
                role: gemini::ContentRole::Model,
                parts: vec![part],
            },
            finish_reason: None,
        }],
        usage_metadata: None,
        response_id: None,
        model_version: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_role_message_becomes_user_role_content() {
        let msg = message(unified::UnifiedMessage {
            role: unified::UnifiedRole::Tool,
            parts: vec![unified::ContentPart::ToolResult(unified::ToolResultPart {
                tool_call_id: "call_1".into(),
                content: r#"{"ok":true}"#.into(),
                is_error: None,
            })],
        });

        assert_eq!(msg.role, gemini::ContentRole::User);
        assert!(msg.parts[0].function_response.is_some());
    }

    #[test]
    fn content_filter_stop_reason_maps_to_safety() {
        assert_eq!(finish_reason(unified::StopReason::ContentFilter, false), gemini::FinishReason::Safety);
    }

    #[test]
    fn schema_is_stripped_before_being_sent_to_gemini() {
        let t = unified::UnifiedTool {
            name: "f".into(),
            description: None,
            parameters: serde_json::json!({"type": "object", "additionalProperties": false}),
        };

        let decl = tool(t);
        assert!(decl.parameters.get("additionalProperties").is_none());
    }
}
