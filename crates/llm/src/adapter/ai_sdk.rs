//! AI-SDK mirrors OpenAI-Chat closely enough (spec §4.1) that its
//! conversions are written directly here rather than through a
//! `messages::unified::{from,to}_ai_sdk` pair — there's no second place in
//! the crate that would reuse them.

use serde_json::Value;

use super::{AdapterConfig, DialectAdapter, StreamFraming};
use crate::error::{GatewayError, Result};
use crate::messages::ai_sdk;
use crate::messages::unified::{
    ContentPart, GenerationConfig, ImagePart, StopReason, StreamChunk, StreamChunkKind, StreamDelta, TextPart,
    ToolArguments, ToolCallDelta, ToolCallPart, ToolChoiceMode, ToolChoiceSpecificKind, ToolResultPart, UnifiedMessage,
    UnifiedMetadata, UnifiedRequest, UnifiedResponse, UnifiedRole, UnifiedTool, UnifiedToolChoice, UsageInfo,
};

pub struct AiSdkAdapter {
    config: AdapterConfig,
}

impl AiSdkAdapter {
    pub fn new() -> Self {
        Self {
            config: AdapterConfig { model_prefixes: Vec::new() },
        }
    }
}

impl Default for AiSdkAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectAdapter for AiSdkAdapter {
    fn name(&self) -> &'static str {
        "ai-sdk"
    }

    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn is_supported_request(&self, raw: &Value) -> bool {
        raw.get("prompt").is_some_and(Value::is_array)
    }

    fn parse_request(&self, raw: Value) -> Result<UnifiedRequest> {
        let req: ai_sdk::CallRequest = serde_json::from_value(raw).map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        Ok(request(req))
    }

    fn transform_request(&self, ir: UnifiedRequest, model_override: Option<String>) -> Result<Value> {
        serde_json::to_value(to_request(ir, model_override)).map_err(|e| GatewayError::InvalidRequest(e.to_string()))
    }

    fn parse_response(&self, raw: Value) -> Result<UnifiedResponse> {
        let resp: ai_sdk::CallResult = serde_json::from_value(raw).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(response(resp))
    }

    fn transform_response(&self, ir: UnifiedResponse, _created: i64) -> Result<Value> {
        serde_json::to_value(to_response(ir)).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    fn stream_framing(&self) -> StreamFraming {
        StreamFraming::SseStandard
    }

    fn parse_stream_chunk(&self, response_id: &str, raw: &str) -> Result<Vec<StreamChunk>> {
        let part: ai_sdk::StreamPart = serde_json::from_str(raw).map_err(|e| GatewayError::StreamParseError(e.to_string()))?;
        Ok(vec![stream_part(response_id, part)])
    }

    fn transform_stream_chunk(&self, chunk: StreamChunk, _model: &str, _created: i64) -> Result<Option<Value>> {
        match to_stream_part(chunk) {
            Some(part) => serde_json::to_value(part).map(Some).map_err(|e| GatewayError::InvalidResponse(e.to_string())),
            None => Ok(None),
        }
    }
}

fn request(req: ai_sdk::CallRequest) -> UnifiedRequest {
    let mut system = None;
    let mut messages = Vec::with_capacity(req.prompt.len());

    for msg in req.prompt {
        if let ai_sdk::PromptRole::System = msg.role {
            system = Some(
                msg.content
                    .iter()
                    .filter_map(|p| match p {
                        ai_sdk::PromptPart::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join(""),
            );
            continue;
        }

        messages.push(message(msg));
    }

    UnifiedRequest {
        messages,
        system,
        system_blocks: None,
        tools: req.tools.map(|tools| tools.into_iter().map(from_tool).collect()),
        tool_choice: req.tool_choice.map(tool_choice),
        config: Some(GenerationConfig {
            max_tokens: req.max_output_tokens,
            temperature: req.temperature,
            top_p: None,
            top_k: None,
            stop_sequences: None,
        }),
        thinking: None,
        stream: None,
        metadata: Some(UnifiedMetadata {
            user_id: None,
            model: Some(req.model),
            extra: Default::default(),
        }),
    }
}

fn message(msg: ai_sdk::PromptMessage) -> UnifiedMessage {
    let role = match msg.role {
        ai_sdk::PromptRole::User => UnifiedRole::User,
        ai_sdk::PromptRole::Assistant => UnifiedRole::Assistant,
        ai_sdk::PromptRole::Tool => UnifiedRole::Tool,
        ai_sdk::PromptRole::System => UnifiedRole::User,
    };

    UnifiedMessage {
        role,
        parts: msg.content.into_iter().map(prompt_part).collect(),
    }
}

fn prompt_part(part: ai_sdk::PromptPart) -> ContentPart {
    match part {
        ai_sdk::PromptPart::Text { text } => ContentPart::Text(TextPart { text, cache_control: None }),
        ai_sdk::PromptPart::File { media_type, data } => ContentPart::Image(ImagePart::from_base64(media_type, data)),
        ai_sdk::PromptPart::ToolCall { tool_call_id, tool_name, args } => ContentPart::ToolCall(ToolCallPart {
            id: tool_call_id,
            name: tool_name,
            arguments: ToolArguments::Value(args),
        }),
        ai_sdk::PromptPart::ToolResult { tool_call_id, result, .. } => ContentPart::ToolResult(ToolResultPart {
            tool_call_id,
            content: result.to_string(),
            is_error: None,
        }),
    }
}

fn from_tool(t: ai_sdk::Tool) -> UnifiedTool {
    UnifiedTool {
        name: t.name,
        description: t.description,
        parameters: t.parameters,
    }
}

fn tool(t: UnifiedTool) -> ai_sdk::Tool {
    ai_sdk::Tool {
        name: t.name,
        description: t.description,
        parameters: t.parameters,
    }
}

fn tool_choice(choice: ai_sdk::ToolChoice) -> UnifiedToolChoice {
    match choice {
        ai_sdk::ToolChoice::Auto => UnifiedToolChoice::Mode(ToolChoiceMode::Auto),
        ai_sdk::ToolChoice::None => UnifiedToolChoice::Mode(ToolChoiceMode::None),
        ai_sdk::ToolChoice::Required => UnifiedToolChoice::Mode(ToolChoiceMode::Required),
        ai_sdk::ToolChoice::Tool { tool_name } => UnifiedToolChoice::Specific {
            kind: ToolChoiceSpecificKind::Tool,
            name: tool_name,
        },
    }
}

fn to_tool_choice(choice: UnifiedToolChoice) -> ai_sdk::ToolChoice {
    match choice {
        UnifiedToolChoice::Mode(ToolChoiceMode::Auto) => ai_sdk::ToolChoice::Auto,
        UnifiedToolChoice::Mode(ToolChoiceMode::None) => ai_sdk::ToolChoice::None,
        UnifiedToolChoice::Mode(ToolChoiceMode::Required) => ai_sdk::ToolChoice::Required,
        UnifiedToolChoice::Specific { name, .. } => ai_sdk::ToolChoice::Tool { tool_name: name },
    }
}

fn to_request(ir: UnifiedRequest, model_override: Option<String>) -> ai_sdk::CallRequest {
    let model = model_override.or_else(|| ir.metadata.as_ref().and_then(|m| m.model.clone())).unwrap_or_default();
    let mut prompt = Vec::with_capacity(ir.messages.len() + 1);

    if let Some(system) = ir.system {
        prompt.push(ai_sdk::PromptMessage {
            role: ai_sdk::PromptRole::System,
            content: vec![ai_sdk::PromptPart::Text { text: system }],
        });
    }

    prompt.extend(ir.messages.into_iter().map(to_message));

    let config = ir.config.unwrap_or_default();

    ai_sdk::CallRequest {
        model,
        prompt,
        max_output_tokens: config.max_tokens,
        temperature: config.temperature,
        tools: ir.tools.map(|tools| tools.into_iter().map(tool).collect()),
        tool_choice: ir.tool_choice.map(to_tool_choice),
    }
}

fn to_message(msg: UnifiedMessage) -> ai_sdk::PromptMessage {
    let role = match msg.role {
        UnifiedRole::User => ai_sdk::PromptRole::User,
        UnifiedRole::Assistant => ai_sdk::PromptRole::Assistant,
        UnifiedRole::Tool => ai_sdk::PromptRole::Tool,
    };

    ai_sdk::PromptMessage {
        role,
        content: msg.parts.into_iter().map(to_prompt_part).collect(),
    }
}

fn to_prompt_part(part: ContentPart) -> ai_sdk::PromptPart {
    match part {
        ContentPart::Text(t) => ai_sdk::PromptPart::Text { text: t.text },
        ContentPart::Image(image) => ai_sdk::PromptPart::File {
            media_type: image.mime_type,
            data: image.data.or(image.url).unwrap_or_default(),
        },
        ContentPart::ToolCall(call) => ai_sdk::PromptPart::ToolCall {
            tool_call_id: call.id,
            tool_name: call.name,
            args: call.arguments.as_value(),
        },
        ContentPart::ToolResult(result) => ai_sdk::PromptPart::ToolResult {
            tool_call_id: result.tool_call_id,
            tool_name: String::new(),
            result: serde_json::from_str(&result.content).unwrap_or(Value::String(result.content)),
        },
        // AI-SDK's part protocol has no thinking representation; dropped.
        ContentPart::Thinking(_) => ai_sdk::PromptPart::Text { text: String::new() },
    }
}

fn response(resp: ai_sdk::CallResult) -> UnifiedResponse {
    let content: Vec<_> = resp.content.into_iter().map(prompt_part).collect();
    let has_tool_calls = content.iter().any(|p| matches!(p, ContentPart::ToolCall(_)));

    UnifiedResponse {
        id: String::new(),
        model: None,
        content,
        stop_reason: finish_reason(resp.finish_reason, has_tool_calls),
        usage: Some(UsageInfo {
            input_tokens: resp.usage.input_tokens,
            output_tokens: resp.usage.output_tokens,
            total_tokens: Some(resp.usage.input_tokens + resp.usage.output_tokens),
            cached_tokens: None,
            thinking_tokens: None,
        }),
        thinking: None,
    }
}

fn finish_reason(reason: ai_sdk::FinishReason, has_tool_calls: bool) -> StopReason {
    if has_tool_calls {
        return StopReason::ToolUse;
    }

    match reason {
        ai_sdk::FinishReason::Stop => StopReason::EndTurn,
        ai_sdk::FinishReason::Length => StopReason::MaxTokens,
        ai_sdk::FinishReason::ToolCalls => StopReason::ToolUse,
        ai_sdk::FinishReason::ContentFilter => StopReason::ContentFilter,
        ai_sdk::FinishReason::Error => StopReason::Error,
        ai_sdk::FinishReason::Unknown => StopReason::Null,
    }
}

fn to_finish_reason(reason: StopReason, has_tool_calls: bool) -> ai_sdk::FinishReason {
    if has_tool_calls {
        return ai_sdk::FinishReason::ToolCalls;
    }

    match reason {
        StopReason::EndTurn | StopReason::StopSequence | StopReason::Null => ai_sdk::FinishReason::Stop,
        StopReason::MaxTokens => ai_sdk::FinishReason::Length,
        StopReason::ToolUse => ai_sdk::FinishReason::ToolCalls,
        StopReason::ContentFilter => ai_sdk::FinishReason::ContentFilter,
        StopReason::Error => ai_sdk::FinishReason::Error,
    }
}

fn to_response(ir: UnifiedResponse) -> ai_sdk::CallResult {
    let has_tool_calls = ir.content.iter().any(|p| matches!(p, ContentPart::ToolCall(_)));
    let finish_reason = to_finish_reason(ir.stop_reason, has_tool_calls);

    ai_sdk::CallResult {
        content: ir.content.into_iter().map(to_prompt_part).collect(),
        finish_reason,
        usage: ir.usage.map(|u| ai_sdk::Usage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        }).unwrap_or_default(),
    }
}

fn stream_part(response_id: &str, part: ai_sdk::StreamPart) -> StreamChunk {
    let id: std::borrow::Cow<'static, str> = response_id.to_string().into();

    match part {
        ai_sdk::StreamPart::TextDelta { delta, .. } => StreamChunk {
            id,
            kind: StreamChunkKind::Content,
            delta: Some(StreamDelta::Text { text: delta }),
            stop_reason: None,
            usage: None,
            error: None,
        },
        ai_sdk::StreamPart::ToolInputDelta { id: tool_id, delta } => StreamChunk {
            id,
            kind: StreamChunkKind::ToolCall,
            delta: Some(StreamDelta::ToolCall(ToolCallDelta {
                index: 0,
                id: Some(tool_id),
                name: None,
                partial_json: Some(delta),
                arguments: None,
            })),
            stop_reason: None,
            usage: None,
            error: None,
        },
        ai_sdk::StreamPart::ToolCall { tool_call_id, tool_name, args } => StreamChunk {
            id,
            kind: StreamChunkKind::ToolCall,
            delta: Some(StreamDelta::ToolCall(ToolCallDelta {
                index: 0,
                id: Some(tool_call_id),
                name: Some(tool_name),
                partial_json: None,
                arguments: Some(args),
            })),
            stop_reason: None,
            usage: None,
            error: None,
        },
        ai_sdk::StreamPart::Finish { finish_reason: reason, usage } => StreamChunk {
            id,
            kind: StreamChunkKind::Done,
            delta: None,
            stop_reason: Some(finish_reason(reason, false)),
            usage: Some(UsageInfo {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
                total_tokens: Some(usage.input_tokens + usage.output_tokens),
                cached_tokens: None,
                thinking_tokens: None,
            }),
            error: None,
        },
        ai_sdk::StreamPart::Error { message } => StreamChunk {
            id,
            kind: StreamChunkKind::Error,
            delta: None,
            stop_reason: Some(StopReason::Error),
            usage: None,
            error: Some(message),
        },
    }
}

fn to_stream_part(chunk: StreamChunk) -> Option<ai_sdk::StreamPart> {
    match chunk.kind {
        StreamChunkKind::Content => match chunk.delta {
            Some(StreamDelta::Text { text }) => Some(ai_sdk::StreamPart::TextDelta {
                id: chunk.id.into_owned(),
                delta: text,
            }),
            _ => None,
        },
        StreamChunkKind::ToolCall => match chunk.delta {
            Some(StreamDelta::ToolCall(call)) => {
                if let Some(partial_json) = call.partial_json {
                    Some(ai_sdk::StreamPart::ToolInputDelta {
                        id: call.id.unwrap_or_default(),
                        delta: partial_json,
                    })
                } else {
                    Some(ai_sdk::StreamPart::ToolCall {
                        tool_call_id: call.id.unwrap_or_default(),
                        tool_name: call.name.unwrap_or_default(),
                        args: call.arguments.unwrap_or(Value::Null),
                    })
                }
            }
            _ => None,
        },
        StreamChunkKind::Done => Some(ai_sdk::StreamPart::Finish {
            finish_reason: chunk.stop_reason.map(|r| to_finish_reason(r, r == StopReason::ToolUse)).unwrap_or(ai_sdk::FinishReason::Stop),
            usage: chunk
                .usage
                .map(|u| ai_sdk::Usage {
                    input_tokens: u.input_tokens,
                    output_tokens: u.output_tokens,
                })
                .unwrap_or_default(),
        }),
        StreamChunkKind::Error => Some(ai_sdk::StreamPart::Error {
            message: chunk.error.unwrap_or_default(),
        }),
        StreamChunkKind::Thinking | StreamChunkKind::Usage => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_role_is_extracted_into_flat_system_field() {
        let req = ai_sdk::CallRequest {
            model: "gpt-4o".into(),
            prompt: vec![
                ai_sdk::PromptMessage {
                    role: ai_sdk::PromptRole::System,
                    content: vec![ai_sdk::PromptPart::Text { text: "be brief".into() }],
                },
                ai_sdk::PromptMessage {
                    role: ai_sdk::PromptRole::User,
                    content: vec![ai_sdk::PromptPart::Text { text: "hi".into() }],
                },
            ],
            max_output_tokens: None,
            temperature: None,
            tools: None,
            tool_choice: None,
        };

        let ir = request(req);
        assert_eq!(ir.system.as_deref(), Some("be brief"));
        assert_eq!(ir.messages.len(), 1);
    }

    #[test]
    fn tool_call_in_content_overrides_finish_reason_to_tool_calls() {
        let ir_content = vec![ContentPart::ToolCall(ToolCallPart {
            id: "call_1".into(),
            name: "f".into(),
            arguments: ToolArguments::Raw("{}".into()),
        })];
        let has_tool_calls = ir_content.iter().any(|p| matches!(p, ContentPart::ToolCall(_)));
        assert_eq!(to_finish_reason(StopReason::EndTurn, has_tool_calls), ai_sdk::FinishReason::ToolCalls);
    }

    #[test]
    fn partial_json_tool_delta_round_trips_without_reparsing() {
        let chunk = stream_part("resp_1", ai_sdk::StreamPart::ToolInputDelta { id: "call_1".into(), delta: r#"{"x":1"#.into() });
        assert_eq!(chunk.kind, StreamChunkKind::ToolCall);
        let Some(StreamDelta::ToolCall(call)) = chunk.delta else {
            panic!("expected tool call delta");
        };
        assert_eq!(call.partial_json.as_deref(), Some(r#"{"x":1"#));
    }
}
