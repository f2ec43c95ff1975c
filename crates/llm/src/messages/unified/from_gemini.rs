//! Gemini `generateContent` → IR conversions.

use crate::messages::{gemini, unified};

pub fn request(req: gemini::GenerateRequest) -> unified::UnifiedRequest {
    let system = req.system_instruction.map(|instr| {
        instr
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    });

    let config = req.generation_config;

    unified::UnifiedRequest {
        messages: req.contents.into_iter().map(message).collect(),
        system,
        system_blocks: None,
        tools: req.tools.map(|decls| decls.into_iter().flat_map(tool_declaration).collect()),
        tool_choice: req.tool_config.map(tool_choice),
        config: config.as_ref().map(generation_config),
        thinking: config.as_ref().and_then(thinking_config),
        stream: None,
        metadata: Some(unified::UnifiedMetadata {
            user_id: None,
            model: None,
            extra: Default::default(),
        }),
    }
}

fn generation_config(config: &gemini::GenerationConfig) -> unified::GenerationConfig {
    unified::GenerationConfig {
        max_tokens: config.max_output_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
        top_k: config.top_k,
        stop_sequences: config.stop_sequences.clone(),
    }
}

fn thinking_config(config: &gemini::GenerationConfig) -> Option<unified::ThinkingConfig> {
    config.thinking_config.as_ref().map(|t| unified::ThinkingConfig {
        enabled: t.include_thoughts.unwrap_or(t.thinking_budget.is_some()),
        budget: t.thinking_budget,
    })
}

fn message(content: gemini::Content) -> unified::UnifiedMessage {
    // Gemini has no separate tool role: function responses travel as `user`
    // content alongside (or instead of) text, so a bare `user` content's role
    // is preserved as-is even when every part is a ToolResult.
    let role = match content.role {
        gemini::ContentRole::User => unified::UnifiedRole::User,
        gemini::ContentRole::Model => unified::UnifiedRole::Assistant,
    };

    unified::UnifiedMessage {
        role,
        parts: content.parts.into_iter().map(part).collect(),
    }
}

fn part(part: gemini::Part) -> unified::ContentPart {
    if let Some(call) = part.function_call {
        return unified::ContentPart::ToolCall(unified::ToolCallPart {
            id: call.id.unwrap_or_else(|| call.name.clone()),
            name: call.name,
            arguments: unified::ToolArguments::Value(call.args),
        });
    }

    if let Some(response) = part.function_response {
        return unified::ContentPart::ToolResult(unified::ToolResultPart {
            tool_call_id: response.id.unwrap_or_else(|| response.name.clone()),
            content: response.response.to_string(),
            is_error: None,
        });
    }

    if let Some(inline) = part.inline_data {
        return unified::ContentPart::Image(unified::ImagePart::from_base64(inline.mime_type, inline.data));
    }

    if part.thought {
        return unified::ContentPart::Thinking(unified::ThinkingPart {
            text: part.text.unwrap_or_default(),
            signature: part.thought_signature,
            redacted: false,
        });
    }

    unified::ContentPart::Text(unified::TextPart {
        text: part.text.unwrap_or_default(),
        cache_control: None,
    })
}

fn tool_declaration(decl: gemini::ToolDeclaration) -> Vec<unified::UnifiedTool> {
    decl.function_declarations
        .into_iter()
        .map(|f| unified::UnifiedTool {
            name: f.name,
            description: f.description,
            parameters: f.parameters,
        })
        .collect()
}

fn tool_choice(config: gemini::ToolConfig) -> unified::UnifiedToolChoice {
    match config.function_calling_config.mode {
        gemini::FunctionCallingMode::Auto => unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::Auto),
        gemini::FunctionCallingMode::None => unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::None),
        gemini::FunctionCallingMode::Any => unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::Required),
    }
}

pub fn response(resp: gemini::GenerateResponse) -> unified::UnifiedResponse {
    let candidate = resp.candidates.into_iter().next();
    let (content, stop_reason) = match candidate {
        Some(candidate) => {
            let message = message(candidate.content);
            let has_tool_calls = message.tool_calls().next().is_some();
            let stop_reason = finish_reason(candidate.finish_reason, has_tool_calls);
            (message.parts, stop_reason)
        }
        None => (Vec::new(), unified::StopReason::Null),
    };

    unified::UnifiedResponse {
        id: resp.response_id.unwrap_or_default(),
        model: resp.model_version,
        content,
        stop_reason,
        usage: resp.usage_metadata.map(usage),
        thinking: None,
    }
}

/// `SAFETY`, `BLOCKLIST`, `PROHIBITED_CONTENT` and `SPII` all map to
/// `content_filter`; `RECITATION` is grouped with them since it is also a
/// policy-driven cutoff rather than a natural completion. A present function
/// call always overrides the mapped reason to `tool_use`.
fn finish_reason(reason: Option<gemini::FinishReason>, has_tool_calls: bool) -> unified::StopReason {
    if has_tool_calls {
        return unified::StopReason::ToolUse;
    }

    match reason {
        Some(gemini::FinishReason::Stop) => unified::StopReason::EndTurn,
        Some(gemini::FinishReason::MaxTokens) => unified::StopReason::MaxTokens,
        Some(
            gemini::FinishReason::Safety
            | gemini::FinishReason::Recitation
            | gemini::FinishReason::Blocklist
            | gemini::FinishReason::ProhibitedContent
            | gemini::FinishReason::Spii,
        ) => unified::StopReason::ContentFilter,
        Some(gemini::FinishReason::Other) | None => unified::StopReason::Null,
    }
}

fn usage(u: gemini::UsageMetadata) -> unified::UsageInfo {
    unified::UsageInfo {
        input_tokens: u.prompt_token_count,
        output_tokens: u.candidates_token_count,
        total_tokens: Some(u.total_token_count),
        cached_tokens: u.cached_content_token_count,
        thinking_tokens: u.thoughts_token_count,
    }
}

/// Parses a single Gemini stream chunk (one `GenerateResponse` fragment, as
/// delivered per SSE event) into zero or more IR chunks.
pub fn stream_chunk(id: &str, chunk: gemini::GenerateResponse) -> Vec<unified::StreamChunk> {
    let cow_id: std::borrow::Cow<'static, str> = id.to_string().into();
    let Some(candidate) = chunk.candidates.into_iter().next() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut tool_call_index = 0;

    for part in candidate.content.parts {
        if let Some(call) = part.function_call {
            out.push(unified::StreamChunk {
                id: cow_id.clone(),
                kind: unified::StreamChunkKind::ToolCall,
                delta: Some(unified::StreamDelta::ToolCall(unified::ToolCallDelta {
                    index: tool_call_index,
                    id: Some(call.id.unwrap_or_else(|| call.name.clone())),
                    name: Some(call.name),
                    partial_json: None,
                    arguments: Some(call.args),
                })),
                stop_reason: None,
                usage: None,
                error: None,
            });
            tool_call_index += 1;
        } else if part.thought {
            out.push(unified::StreamChunk {
                id: cow_id.clone(),
                kind: unified::StreamChunkKind::Thinking,
                delta: Some(unified::StreamDelta::Thinking {
                    text: part.text.unwrap_or_default(),
                }),
                stop_reason: None,
                usage: None,
                error: None,
            });
        } else if let Some(text) = part.text {
            out.push(unified::StreamChunk {
                id: cow_id.clone(),
                kind: unified::StreamChunkKind::Content,
                delta: Some(unified::StreamDelta::Text { text }),
                stop_reason: None,
                usage: None,
                error: None,
            });
        }
    }

    if let Some(reason) = candidate.finish_reason {
        let has_tool_calls = out.iter().any(|c| c.kind == unified::StreamChunkKind::ToolCall);
        out.push(unified::StreamChunk {
            id: cow_id,
            kind: unified::StreamChunkKind::Done,
            delta: None,
            stop_reason: Some(finish_reason(Some(reason), has_tool_calls)),
            usage: chunk.usage_metadata.map(usage),
            error: None,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_finish_reason_maps_to_content_filter() {
        assert_eq!(
            finish_reason(Some(gemini::FinishReason::Safety), false),
            unified::StopReason::ContentFilter
        );
    }

    #[test]
    fn function_call_overrides_finish_reason_to_tool_use() {
        assert_eq!(
            finish_reason(Some(gemini::FinishReason::Stop), true),
            unified::StopReason::ToolUse
        );
    }

    #[test]
    fn thought_part_becomes_thinking_content() {
        let part_value = gemini::Part {
            text: Some("reasoning...".into()),
            thought: true,
            ..Default::default()
        };

        let converted = part(part_value);
        let unified::ContentPart::Thinking(t) = converted else {
            panic!("expected thinking part");
        };
        assert_eq!(t.text, "reasoning...");
    }
}
