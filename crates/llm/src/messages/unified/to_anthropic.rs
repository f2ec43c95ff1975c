//! IR → Anthropic conversions.

use crate::messages::{anthropic, unified};
use crate::unknown_fields::UnknownFields;

const DEFAULT_MAX_TOKENS: u32 = 4096;

pub fn request(ir: unified::UnifiedRequest, model_override: Option<String>) -> anthropic::Request {
    let model = model_override
        .or_else(|| ir.metadata.as_ref().and_then(|m| m.model.clone()))
        .unwrap_or_default();

    // Prefer system_blocks (preserves per-block cache hints); otherwise
    // synthesize one block from the flattened `system` string.
    let system = match (ir.system_blocks, ir.system) {
        (Some(blocks), _) => Some(anthropic::SystemPrompt::Blocks(
            blocks.into_iter().map(system_block).collect(),
        )),
        (None, Some(text)) => Some(anthropic::SystemPrompt::Blocks(vec![anthropic::TextBlock {
            text,
            cache_control: None,
        }])),
        (None, None) => None,
    };

    let config = ir.config.unwrap_or_default();

    anthropic::Request {
        model,
        messages: ir.messages.into_iter().map(message).collect(),
        max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        system,
        temperature: config.temperature,
        top_p: config.top_p,
        top_k: config.top_k,
        stop_sequences: config.stop_sequences,
        stream: ir.stream,
        metadata: ir.metadata.as_ref().and_then(|m| m.user_id.clone()).map(|user_id| anthropic::Metadata {
            user_id: Some(user_id),
            unknown_fields: UnknownFields::default(),
        }),
        tools: ir.tools.map(|tools| tools.into_iter().map(tool).collect()),
        tool_choice: ir.tool_choice.map(tool_choice),
        thinking: ir.thinking.map(thinking_config),
        unknown_fields: UnknownFields::default(),
    }
}

fn system_block(block: unified::SystemBlock) -> anthropic::TextBlock {
    anthropic::TextBlock {
        text: block.text,
        cache_control: block.cache_control.map(cache_control),
    }
}

fn thinking_config(config: unified::ThinkingConfig) -> anthropic::ThinkingConfig {
    if config.enabled {
        anthropic::ThinkingConfig::Enabled {
            budget_tokens: config.budget.unwrap_or(1024),
            unknown_fields: UnknownFields::default(),
        }
    } else {
        anthropic::ThinkingConfig::Disabled {
            unknown_fields: UnknownFields::default(),
        }
    }
}

fn cache_control(cc: unified::CacheControl) -> anthropic::CacheControl {
    anthropic::CacheControl::Ephemeral {
        ttl: cc.ttl.map(cache_control_ttl),
    }
}

fn cache_control_ttl(ttl: unified::CacheControlTtl) -> anthropic::CacheControlTtl {
    match ttl {
        unified::CacheControlTtl::FiveMinutes => anthropic::CacheControlTtl::FiveMinutes,
        unified::CacheControlTtl::OneHour => anthropic::CacheControlTtl::OneHour,
        unified::CacheControlTtl::Unknown(s) => anthropic::CacheControlTtl::Unknown(s),
    }
}

fn message(msg: unified::UnifiedMessage) -> anthropic::Message {
    // Anthropic has no `role=tool`; tool results are user-role content
    // blocks (DESIGN.md Open Question 2: round-trip as the source's role,
    // so a bare UnifiedRole::Tool message becomes a user turn here).
    let role = match msg.role {
        unified::UnifiedRole::User | unified::UnifiedRole::Tool => anthropic::Role::User,
        unified::UnifiedRole::Assistant => anthropic::Role::Assistant,
    };

    anthropic::Message {
        role,
        content: msg.parts.into_iter().map(content).collect(),
    }
}

fn content(part: unified::ContentPart) -> anthropic::Content {
    match part {
        unified::ContentPart::Text(t) => anthropic::Content::Text(anthropic::TextBlock {
            text: t.text,
            cache_control: t.cache_control.map(cache_control),
        }),
        unified::ContentPart::Image(image) => {
            let source = if let Some(data) = image.data {
                anthropic::ImageSource::Base64 {
                    media_type: image.mime_type,
                    data,
                }
            } else {
                anthropic::ImageSource::Url {
                    url: image.url.unwrap_or_default(),
                }
            };
            anthropic::Content::Image { source }
        }
        unified::ContentPart::ToolCall(call) => anthropic::Content::ToolUse {
            id: call.id,
            name: call.name,
            input: call.arguments.as_value(),
        },
        unified::ContentPart::ToolResult(result) => anthropic::Content::ToolResult {
            tool_use_id: result.tool_call_id,
            content: anthropic::ToolResultContent::Text(result.content),
            is_error: result.is_error,
        },
        unified::ContentPart::Thinking(t) if t.redacted => {
            anthropic::Content::RedactedThinking { data: String::new() }
        }
        unified::ContentPart::Thinking(t) => anthropic::Content::Thinking {
            thinking: t.text,
            signature: t.signature.unwrap_or_default(),
        },
    }
}

fn tool(t: unified::UnifiedTool) -> anthropic::Tool {
    anthropic::Tool {
        name: t.name,
        description: t.description.unwrap_or_default(),
        input_schema: t.parameters,
    }
}

fn tool_choice(choice: unified::UnifiedToolChoice) -> anthropic::ToolChoice {
    match choice {
        unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::Auto) => anthropic::ToolChoice::Auto,
        unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::Required) => anthropic::ToolChoice::Any,
        // Anthropic has no "none"; the closest available semantics is `auto`
        // since Anthropic doesn't let a request forbid tool use outright.
        unified::UnifiedToolChoice::Mode(unified::ToolChoiceMode::None) => anthropic::ToolChoice::Auto,
        unified::UnifiedToolChoice::Specific { name, .. } => anthropic::ToolChoice::Tool { name },
    }
}

pub fn response(ir: unified::UnifiedResponse) -> anthropic::Response {
    let has_tool_calls = ir.content.iter().any(|p| matches!(p, unified::ContentPart::ToolCall(_)));

    anthropic::Response {
        id: ir.id,
        r#type: "message".into(),
        role: anthropic::Role::Assistant,
        content: ir.content.into_iter().map(content).collect(),
        model: ir.model.unwrap_or_default(),
        stop_reason: Some(stop_reason(ir.stop_reason, has_tool_calls)),
        stop_sequence: None,
        usage: ir.usage.map(usage).unwrap_or_default(),
    }
}

pub(crate) fn stop_reason(reason: unified::StopReason, has_tool_calls: bool) -> anthropic::StopReason {
    if has_tool_calls {
        return anthropic::StopReason::ToolUse;
    }

    match reason {
        unified::StopReason::EndTurn | unified::StopReason::ContentFilter | unified::StopReason::Error | unified::StopReason::Null => {
            anthropic::StopReason::EndTurn
        }
        unified::StopReason::MaxTokens => anthropic::StopReason::MaxTokens,
        unified::StopReason::ToolUse => anthropic::StopReason::ToolUse,
        unified::StopReason::StopSequence => anthropic::StopReason::StopSequence,
    }
}

pub(crate) fn usage(u: unified::UsageInfo) -> anthropic::Usage {
    anthropic::Usage {
        input_tokens: u.input_tokens,
        output_tokens: u.output_tokens,
        cache_creation_input_tokens: None,
        cache_read_input_tokens: u.cached_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_max_tokens_falls_back_to_default() {
        let ir = unified::UnifiedRequest {
            messages: vec![unified::UnifiedMessage {
                role: unified::UnifiedRole::User,
                parts: vec![unified::ContentPart::Text(unified::TextPart {
                    text: "hi".into(),
                    cache_control: None,
                })],
            }],
            ..Default::default()
        };

        let req = request(ir, Some("claude-3-opus".into()));
        assert_eq!(req.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn message_with_text_and_tool_call_snapshots_each_block_once() {
        let msg = unified::UnifiedMessage {
            role: unified::UnifiedRole::Assistant,
            parts: vec![
                unified::ContentPart::Text(unified::TextPart {
                    text: "I'll calculate that for you.".into(),
                    cache_control: None,
                }),
                unified::ContentPart::ToolCall(unified::ToolCallPart {
                    id: "tool_123".into(),
                    name: "calculator".into(),
                    arguments: unified::ToolArguments::Value(serde_json::json!({"expression": "2+2"})),
                }),
            ],
        };

        let anthropic_message = message(msg);

        insta::assert_json_snapshot!(anthropic_message, @r###"
        {
          "role": "assistant",
          "content": [
            {
              "type": "text",
              "text": "I'll calculate that for you."
            },
            {
              "type": "tool_use",
              "id": "tool_123",
              "name": "calculator",
              "input": {
                "expression": "2+2"
              }
            }
          ]
        }
        "###);
    }

    #[test]
    fn system_blocks_preserve_cache_control_over_flattened_system() {
        let ir = unified::UnifiedRequest {
            system: Some("ignored when blocks present".into()),
            system_blocks: Some(vec![unified::SystemBlock {
                text: "be brief".into(),
                cache_control: Some(unified::CacheControl {
                    kind: unified::CacheControlKind::Ephemeral,
                    ttl: Some(unified::CacheControlTtl::OneHour),
                }),
            }]),
            ..Default::default()
        };

        let req = request(ir, None);
        let Some(anthropic::SystemPrompt::Blocks(blocks)) = req.system else {
            panic!("expected blocks");
        };
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].cache_control.is_some());
    }
}
