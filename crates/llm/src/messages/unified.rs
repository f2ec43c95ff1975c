//! The dialect-neutral intermediate representation (IR).
//!
//! Every adapter parses its wire format into these types and transforms them
//! back out; nothing outside this module should need to know a dialect's
//! wire shape. Values are constructed once, consumed once, and discarded —
//! there is no mutation after construction except inside the streaming
//! accumulator, which owns its working state exclusively.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod from_anthropic;
pub mod from_gemini;
pub mod from_openai;
pub mod to_anthropic;
pub mod to_gemini;
pub mod to_openai;

/// A dialect-neutral chat request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnifiedRequest {
    pub messages: Vec<UnifiedMessage>,

    /// Flattened system prompt. Populated even when `system_blocks` is also
    /// present, so callers that only look at `system` keep working.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// System prompt preserved as separate blocks so per-block cache hints
    /// survive a round-trip through dialects that understand them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_blocks: Option<Vec<SystemBlock>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<UnifiedTool>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<UnifiedToolChoice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<GenerationConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<UnifiedMetadata>,
}

/// `system` prompt content preserved as a distinct block, carrying its own
/// cache-control hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemBlock {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

/// Anthropic-style ephemeral cache-control hint, with optional TTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheControl {
    pub kind: CacheControlKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<CacheControlTtl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheControlKind {
    Ephemeral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheControlTtl {
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(untagged)]
    Unknown(String),
}

/// Sampling and length controls common across dialects. Any field a target
/// dialect does not support is silently dropped on transform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

/// Extended-thinking / reasoning request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingConfig {
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnifiedMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// The authoritative model name for this request (I4): populated from
    /// the source dialect's `model` field on parse, written back to the
    /// target dialect's `model` field on transform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Arbitrary passthrough keys not otherwise modeled.
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifiedRole {
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedMessage {
    pub role: UnifiedRole,
    pub parts: Vec<ContentPart>,
}

impl UnifiedMessage {
    /// All `ToolCall` parts in this message, in order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallPart> {
        self.parts.iter().filter_map(|part| match part {
            ContentPart::ToolCall(call) => Some(call),
            _ => None,
        })
    }

    /// Concatenation of every `Text` part's body, in order. Used by P2's
    /// cross-dialect textual-content comparison.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// A tagged union of everything that can appear inside a message or a
/// response's content sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text(TextPart),
    Image(ImagePart),
    ToolCall(ToolCallPart),
    ToolResult(ToolResultPart),
    Thinking(ThinkingPart),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

/// I2: exactly one of `data` / `url` is set. Constructors enforce this;
/// deserialization from an untrusted source does not re-validate it because
/// a malformed input simply produces a part a transform drops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePart {
    /// May be empty for URL-sourced images (see DESIGN.md Open Question 3).
    pub mime_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ImagePart {
    pub fn from_base64(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: Some(data.into()),
            url: None,
        }
    }

    pub fn from_url(mime_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: None,
            url: Some(url.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallPart {
    pub id: String,
    pub name: String,
    pub arguments: ToolArguments,
}

/// Tool-call arguments as either a parsed object or a raw (possibly still
/// incomplete) JSON string. Kept untagged so adapters that only ever see a
/// JSON string (OpenAI-Chat) don't force a parse they don't need.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolArguments {
    Value(Value),
    Raw(String),
}

impl ToolArguments {
    /// Best-effort accessor used by cross-dialect comparisons (P2): parses
    /// `Raw` on demand rather than storing both forms.
    pub fn as_value(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Raw(s) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultPart {
    pub tool_call_id: String,
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// I3: these are the same logical objects whether they appear inside a
/// message's `parts` or a response's top-level `thinking` list — a transform
/// emits one copy, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingPart {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// When true, `text` is empty and unavailable: the source only disclosed
    /// that thinking happened, not its content.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub redacted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedTool {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnifiedToolChoice {
    Mode(ToolChoiceMode),
    Specific { kind: ToolChoiceSpecificKind, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoiceMode {
    Auto,
    None,
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoiceSpecificKind {
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedResponse {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub content: Vec<ContentPart>,

    pub stop_reason: StopReason,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageInfo>,

    /// See I3: mirrors any `Thinking` parts already present in `content`,
    /// never a second copy of the same text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<Vec<ThinkingPart>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    StopSequence,
    ContentFilter,
    Error,
    #[serde(other)]
    Null,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageInfo {
    pub input_tokens: u32,
    pub output_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_tokens: Option<u32>,
}

/// A single increment of a streaming response. `id` uses `Cow` like the
/// teacher's `UnifiedChunk` so a chunk that doesn't need to own a fresh
/// string (the common case: the same response id repeated every chunk) can
/// borrow it instead of allocating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub id: Cow<'static, str>,

    #[serde(rename = "type")]
    pub kind: StreamChunkKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<StreamDelta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamChunkKind {
    Content,
    Thinking,
    ToolCall,
    Usage,
    Done,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamDelta {
    Text { text: String },
    Thinking { text: String },
    ToolCall(ToolCallDelta),
}

/// A partial tool call as it streams in. `partial_json` carries the raw,
/// not-yet-valid-on-its-own fragment of the arguments string; the engine's
/// accumulator is the only thing that ever concatenates these (see
/// `streaming::accumulator`). `arguments` is set instead when the source
/// dialect hands over a complete structured object in one shot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_json: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_text_concatenation_ignores_non_text_parts() {
        let message = UnifiedMessage {
            role: UnifiedRole::Assistant,
            parts: vec![
                ContentPart::Text(TextPart {
                    text: "hello ".into(),
                    cache_control: None,
                }),
                ContentPart::ToolCall(ToolCallPart {
                    id: "call_1".into(),
                    name: "get_weather".into(),
                    arguments: ToolArguments::Raw("{}".into()),
                }),
                ContentPart::Text(TextPart {
                    text: "world".into(),
                    cache_control: None,
                }),
            ],
        };

        assert_eq!(message.text(), "hello world");
        assert_eq!(message.tool_calls().count(), 1);
    }

    #[test]
    fn raw_tool_arguments_parse_on_demand() {
        let args = ToolArguments::Raw(r#"{"x":1,"y":2}"#.into());
        assert_eq!(args.as_value(), serde_json::json!({"x": 1, "y": 2}));
    }

    #[test]
    fn invalid_raw_arguments_fall_back_to_string_value() {
        let args = ToolArguments::Raw("not json".into());
        assert_eq!(args.as_value(), Value::String("not json".into()));
    }

    #[test]
    fn stop_reason_round_trips_through_serde() {
        let json = serde_json::to_value(StopReason::ContentFilter).unwrap();
        assert_eq!(json, serde_json::json!("content_filter"));
    }
}
