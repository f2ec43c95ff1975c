use serde_json::Value;

use super::{AdapterConfig, DialectAdapter, StreamFraming};
use crate::error::{GatewayError, Result};
use crate::messages::openai;
use crate::messages::unified::{self, StreamChunk, UnifiedRequest, UnifiedResponse};

pub struct OpenAiChatAdapter {
    config: AdapterConfig,
}

impl OpenAiChatAdapter {
    pub fn new() -> Self {
        Self {
            config: AdapterConfig {
                model_prefixes: vec!["gpt-".into(), "o1".into(), "o3".into(), "chatgpt-".into()],
            },
        }
    }
}

impl Default for OpenAiChatAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectAdapter for OpenAiChatAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn is_supported_request(&self, raw: &Value) -> bool {
        raw.get("messages").is_some_and(Value::is_array) && raw.get("model").is_some_and(Value::is_string)
    }

    fn parse_request(&self, raw: Value) -> Result<UnifiedRequest> {
        let req: openai::ChatCompletionRequest =
            serde_json::from_value(raw).map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        Ok(unified::from_openai::request(req))
    }

    fn transform_request(&self, ir: UnifiedRequest, model_override: Option<String>) -> Result<Value> {
        let req = unified::to_openai::request(ir, model_override);
        serde_json::to_value(req).map_err(|e| GatewayError::InvalidRequest(e.to_string()))
    }

    fn parse_response(&self, raw: Value) -> Result<UnifiedResponse> {
        let resp: openai::ChatCompletionResponse =
            serde_json::from_value(raw).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(unified::from_openai::response(resp))
    }

    fn transform_response(&self, ir: UnifiedResponse, created: i64) -> Result<Value> {
        let resp = unified::to_openai::response(ir, created);
        serde_json::to_value(resp).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    fn stream_framing(&self) -> StreamFraming {
        StreamFraming::SseStandard
    }

    fn parse_stream_chunk(&self, _response_id: &str, raw: &str) -> Result<Vec<StreamChunk>> {
        let chunk: openai::ChatCompletionChunk =
            serde_json::from_str(raw).map_err(|e| GatewayError::StreamParseError(e.to_string()))?;
        Ok(unified::from_openai::stream_chunk(chunk))
    }

    fn transform_stream_chunk(&self, chunk: StreamChunk, model: &str, created: i64) -> Result<Option<Value>> {
        match unified::to_openai::stream_chunk(chunk, model, created) {
            Some(chunk) => serde_json::to_value(chunk).map(Some).map_err(|e| GatewayError::InvalidResponse(e.to_string())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_prefix_match_covers_gpt_and_o_series() {
        let adapter = OpenAiChatAdapter::new();
        assert!(adapter.is_supported_model("gpt-4o"));
        assert!(adapter.is_supported_model("o3-mini"));
        assert!(!adapter.is_supported_model("claude-3-opus"));
    }

    #[test]
    fn request_without_messages_array_is_unsupported() {
        let adapter = OpenAiChatAdapter::new();
        assert!(!adapter.is_supported_request(&serde_json::json!({"model": "gpt-4o"})));
    }
}
