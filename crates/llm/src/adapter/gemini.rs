use serde_json::Value;

use super::{AdapterConfig, DialectAdapter, StreamFraming};
use crate::error::{GatewayError, Result};
use crate::messages::gemini;
use crate::messages::unified::{self, StreamChunk, UnifiedRequest, UnifiedResponse};

pub struct GeminiAdapter {
    config: AdapterConfig,
}

impl GeminiAdapter {
    pub fn new() -> Self {
        Self {
            config: AdapterConfig {
                model_prefixes: vec!["gemini-".into()],
            },
        }
    }
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectAdapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn is_supported_request(&self, raw: &Value) -> bool {
        raw.get("contents").is_some_and(Value::is_array)
    }

    fn parse_request(&self, raw: Value) -> Result<UnifiedRequest> {
        let req: gemini::GenerateRequest = serde_json::from_value(raw).map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        Ok(unified::from_gemini::request(req))
    }

    fn transform_request(&self, ir: UnifiedRequest, _model_override: Option<String>) -> Result<Value> {
        // Gemini carries the model in the URL path, not the request body;
        // `model_override` is the router's concern, not this payload's.
        let req = unified::to_gemini::request(ir);
        serde_json::to_value(req).map_err(|e| GatewayError::InvalidRequest(e.to_string()))
    }

    fn parse_response(&self, raw: Value) -> Result<UnifiedResponse> {
        let resp: gemini::GenerateResponse = serde_json::from_value(raw).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(unified::from_gemini::response(resp))
    }

    fn transform_response(&self, ir: UnifiedResponse, _created: i64) -> Result<Value> {
        let response_id = ir.id.clone();
        let resp = unified::to_gemini::response(ir, response_id);
        serde_json::to_value(resp).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    fn stream_framing(&self) -> StreamFraming {
        StreamFraming::SseLineDelimited
    }

    fn parse_stream_chunk(&self, response_id: &str, raw: &str) -> Result<Vec<StreamChunk>> {
        let chunk: gemini::GenerateResponse = serde_json::from_str(raw).map_err(|e| GatewayError::StreamParseError(e.to_string()))?;
        Ok(unified::from_gemini::stream_chunk(response_id, chunk))
    }

    fn transform_stream_chunk(&self, chunk: StreamChunk, _model: &str, _created: i64) -> Result<Option<Value>> {
        match unified::to_gemini::stream_chunk(chunk) {
            Some(fragment) => serde_json::to_value(fragment).map(Some).map_err(|e| GatewayError::InvalidResponse(e.to_string())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_without_contents_array_is_unsupported() {
        let adapter = GeminiAdapter::new();
        assert!(!adapter.is_supported_request(&serde_json::json!({"model": "gemini-2.0-flash"})));
    }
}
