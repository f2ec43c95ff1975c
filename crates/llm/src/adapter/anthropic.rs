use serde_json::Value;

use super::{AdapterConfig, DialectAdapter, StreamFraming};
use crate::error::{GatewayError, Result};
use crate::messages::anthropic;
use crate::messages::unified::{self, StreamChunk, UnifiedRequest, UnifiedResponse};

pub struct AnthropicAdapter {
    config: AdapterConfig,
}

impl AnthropicAdapter {
    pub fn new() -> Self {
        Self {
            config: AdapterConfig {
                model_prefixes: vec!["claude-".into()],
            },
        }
    }
}

impl Default for AnthropicAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectAdapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn is_supported_request(&self, raw: &Value) -> bool {
        // `max_tokens` is required by Anthropic and absent from OpenAI-Chat's
        // required fields, making it the cheapest structural discriminator.
        raw.get("messages").is_some_and(Value::is_array) && raw.get("max_tokens").is_some_and(Value::is_u64)
    }

    fn parse_request(&self, raw: Value) -> Result<UnifiedRequest> {
        let req: anthropic::Request = serde_json::from_value(raw).map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        Ok(unified::from_anthropic::request(req))
    }

    fn transform_request(&self, ir: UnifiedRequest, model_override: Option<String>) -> Result<Value> {
        let req = unified::to_anthropic::request(ir, model_override);
        serde_json::to_value(req).map_err(|e| GatewayError::InvalidRequest(e.to_string()))
    }

    fn parse_response(&self, raw: Value) -> Result<UnifiedResponse> {
        let resp: anthropic::Response = serde_json::from_value(raw).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(unified::from_anthropic::response(resp))
    }

    fn transform_response(&self, ir: UnifiedResponse, _created: i64) -> Result<Value> {
        let resp = unified::to_anthropic::response(ir);
        serde_json::to_value(resp).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    fn stream_framing(&self) -> StreamFraming {
        StreamFraming::SseLineDelimited
    }

    fn parse_stream_chunk(&self, response_id: &str, raw: &str) -> Result<Vec<StreamChunk>> {
        let event: anthropic::StreamEvent = serde_json::from_str(raw).map_err(|e| GatewayError::StreamParseError(e.to_string()))?;
        Ok(unified::from_anthropic::stream_event(response_id, event).into_iter().collect())
    }

    fn transform_stream_chunk(&self, _chunk: StreamChunk, _model: &str, _created: i64) -> Result<Option<Value>> {
        // Anthropic's streaming protocol is a lifecycle of distinct event
        // types (message_start/content_block_*/message_delta/message_stop)
        // that a single IR chunk can't deterministically reconstruct without
        // the accumulator's running state; the streaming engine drives this
        // dialect's emission directly rather than through this hook.
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_without_max_tokens_is_unsupported() {
        let adapter = AnthropicAdapter::new();
        assert!(!adapter.is_supported_request(&serde_json::json!({"messages": []})));
    }

    #[test]
    fn model_prefix_matches_claude_only() {
        let adapter = AnthropicAdapter::new();
        assert!(adapter.is_supported_model("claude-3-5-sonnet"));
        assert!(!adapter.is_supported_model("gpt-4o"));
    }
}
