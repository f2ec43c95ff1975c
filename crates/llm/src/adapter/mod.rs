//! The `DialectAdapter` contract (spec §4.1): every dialect a request or
//! response might arrive in implements the same eight pure operations, so
//! the registry, facade, and streaming engine never special-case a
//! particular wire format.
//!
//! All operations are synchronous and non-suspending — parsing and
//! transforming never wait on anything, because this crate makes no network
//! calls of its own (spec §1, §5).

mod ai_sdk;
mod anthropic;
mod antigravity;
mod gemini;
mod openai_chat;

pub use ai_sdk::AiSdkAdapter;
pub use anthropic::AnthropicAdapter;
pub use antigravity::AntigravityAdapter;
pub use gemini::GeminiAdapter;
pub use openai_chat::OpenAiChatAdapter;

use serde_json::Value;

use crate::error::Result;
use crate::messages::unified::{StreamChunk, UnifiedRequest, UnifiedResponse};

/// How a dialect frames its streamed events on the wire. The streaming
/// engine (`streaming::mod`) strips framing before handing a bare payload to
/// `parse_stream_chunk`; this only tells it which stripping rule to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFraming {
    /// Standard SSE: `data: <json>\n\n`, terminated by a literal `[DONE]`
    /// payload (OpenAI-Chat, AI-SDK).
    SseStandard,
    /// SSE with no `[DONE]` sentinel; the stream simply closes after the
    /// terminal event (Anthropic, Gemini, Antigravity).
    SseLineDelimited,
}

/// Per-adapter configuration resolved once at registry build time.
#[derive(Debug, Clone, Default)]
pub struct AdapterConfig {
    /// Model name prefixes this adapter should claim during router
    /// inference (e.g. `"claude-"` for Anthropic), independent of explicit
    /// `:provider` suffixes or static mappings.
    pub model_prefixes: Vec<String>,
}

/// A single dialect's parse/transform operations, over loosely-typed JSON at
/// the boundary so the registry can hold adapters for every dialect behind
/// one object-safe trait without a wire-type generic parameter.
pub trait DialectAdapter: Send + Sync {
    /// Stable provider name used by the router and registry (e.g.
    /// `"openai"`, `"anthropic"`, `"gemini"`, `"antigravity"`, `"ai-sdk"`).
    fn name(&self) -> &'static str;

    fn config(&self) -> &AdapterConfig;

    /// Structural check only: is this shaped like a request this dialect
    /// would accept? Never errors; a request that fails this is routed
    /// elsewhere or rejected upstream of the adapter, not inside it.
    fn is_supported_request(&self, raw: &Value) -> bool;

    /// Whether `model` is one this adapter's dialect would plausibly serve
    /// (used by the router's prefix-matching step, not a hard allowlist).
    fn is_supported_model(&self, model: &str) -> bool {
        self.config().model_prefixes.iter().any(|prefix| model.starts_with(prefix.as_str()))
    }

    fn parse_request(&self, raw: Value) -> Result<UnifiedRequest>;

    /// `model_override` wins over whatever `ir.metadata.model` carries (I4):
    /// the router passes the resolved upstream model name here after
    /// stripping any `:provider` suffix.
    fn transform_request(&self, ir: UnifiedRequest, model_override: Option<String>) -> Result<Value>;

    fn parse_response(&self, raw: Value) -> Result<UnifiedResponse>;

    fn transform_response(&self, ir: UnifiedResponse, created: i64) -> Result<Value>;

    fn stream_framing(&self) -> StreamFraming;

    /// Parses one already-unframed stream payload into zero or more IR
    /// chunks. `response_id` is the accumulator's tracked id for this
    /// response, supplied for dialects whose wire events don't carry one of
    /// their own (Anthropic, Gemini, Antigravity).
    fn parse_stream_chunk(&self, response_id: &str, raw: &str) -> Result<Vec<StreamChunk>>;

    /// Transforms one IR chunk into a dialect-native stream event, or `None`
    /// for chunk kinds this dialect's streaming protocol has no
    /// representation for (P4: never forces a chunk to mean something it
    /// doesn't).
    fn transform_stream_chunk(&self, chunk: StreamChunk, model: &str, created: i64) -> Result<Option<Value>>;
}
