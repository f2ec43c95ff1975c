use serde_json::Value;

use super::{AdapterConfig, DialectAdapter, StreamFraming};
use crate::antigravity_repair;
use crate::error::{GatewayError, Result};
use crate::messages::antigravity::{AntigravityRequest, AntigravityResponse};
use crate::messages::unified::{self, StreamChunk, UnifiedRequest, UnifiedResponse};

/// Antigravity's key in `UnifiedMetadata::extra` holding the session
/// signature, round-tripped on every request/response in the same session
/// (see `signature_store`).
const SESSION_SIGNATURE_KEY: &str = "antigravity_session_signature";

pub struct AntigravityAdapter {
    config: AdapterConfig,
}

impl AntigravityAdapter {
    pub fn new() -> Self {
        Self {
            config: AdapterConfig {
                model_prefixes: vec!["antigravity-".into()],
            },
        }
    }
}

impl Default for AntigravityAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectAdapter for AntigravityAdapter {
    fn name(&self) -> &'static str {
        "antigravity"
    }

    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn is_supported_request(&self, raw: &Value) -> bool {
        raw.get("contents").is_some_and(Value::is_array) && raw.get("sessionSignature").is_some()
    }

    fn parse_request(&self, raw: Value) -> Result<UnifiedRequest> {
        let req: AntigravityRequest = serde_json::from_value(raw).map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        let mut ir = unified::from_gemini::request(req.inner);

        if let Some(signature) = req.session_signature {
            let metadata = ir.metadata.get_or_insert_with(Default::default);
            metadata.extra.insert(SESSION_SIGNATURE_KEY.into(), Value::String(signature));
        }

        Ok(ir)
    }

    fn transform_request(&self, ir: UnifiedRequest, _model_override: Option<String>) -> Result<Value> {
        let session_signature = ir
            .metadata
            .as_ref()
            .and_then(|m| m.extra.get(SESSION_SIGNATURE_KEY))
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut inner = unified::to_gemini::request(ir);
        antigravity_repair::repair(&mut inner.contents);

        let req = AntigravityRequest { inner, session_signature };
        serde_json::to_value(req).map_err(|e| GatewayError::InvalidRequest(e.to_string()))
    }

    fn parse_response(&self, raw: Value) -> Result<UnifiedResponse> {
        let resp: AntigravityResponse = serde_json::from_value(raw).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(unified::from_gemini::response(resp.inner))
    }

    fn transform_response(&self, ir: UnifiedResponse, _created: i64) -> Result<Value> {
        let response_id = ir.id.clone();
        let inner = unified::to_gemini::response(ir, response_id);
        let resp = AntigravityResponse {
            inner,
            session_signature: None,
        };
        serde_json::to_value(resp).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    fn stream_framing(&self) -> StreamFraming {
        StreamFraming::SseLineDelimited
    }

    fn parse_stream_chunk(&self, response_id: &str, raw: &str) -> Result<Vec<StreamChunk>> {
        let chunk: AntigravityResponse = serde_json::from_str(raw).map_err(|e| GatewayError::StreamParseError(e.to_string()))?;
        Ok(unified::from_gemini::stream_chunk(response_id, chunk.inner))
    }

    fn transform_stream_chunk(&self, chunk: StreamChunk, _model: &str, _created: i64) -> Result<Option<Value>> {
        match unified::to_gemini::stream_chunk(chunk) {
            Some(fragment) => {
                let wrapped = AntigravityResponse {
                    inner: fragment,
                    session_signature: None,
                };
                serde_json::to_value(wrapped).map(Some).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_without_session_signature_is_unsupported() {
        let adapter = AntigravityAdapter::new();
        assert!(!adapter.is_supported_request(&serde_json::json!({"contents": []})));
    }
}
