//! Transform Facade (C4): the single entry point that turns a request or
//! response from one dialect into another, by parsing into the IR and
//! transforming back out. Stateless — every call is independent.

use serde_json::Value;

use crate::error::Result;
use crate::messages::unified;
use crate::registry::Registry;

pub struct Facade<'a> {
    registry: &'a Registry,
}

impl<'a> Facade<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Parses `raw` as `from_dialect` and transforms it into `to_dialect`'s
    /// wire shape, resolving `model_override` (typically the router's
    /// resolved upstream model name) into the target payload.
    ///
    /// `thinking_override` lets a caller overwrite `ir.thinking` between
    /// parse and transform: `None` leaves it untouched, `Some(None)` clears
    /// it, `Some(Some(cfg))` replaces it outright.
    pub fn transform_request(
        &self,
        from_dialect: &str,
        to_dialect: &str,
        raw: Value,
        model_override: Option<String>,
        thinking_override: Option<Option<unified::ThinkingConfig>>,
    ) -> Result<Value> {
        log::debug!("transforming request from {from_dialect} to {to_dialect}");
        let source = self.registry.get(from_dialect)?;
        let target = self.registry.get(to_dialect)?;

        let mut ir = source.parse_request(raw)?;
        if let Some(thinking) = thinking_override {
            ir.thinking = thinking;
        }
        target.transform_request(ir, model_override)
    }

    pub fn transform_response(&self, from_dialect: &str, to_dialect: &str, raw: Value, created: i64) -> Result<Value> {
        log::debug!("transforming response from {from_dialect} to {to_dialect}");
        let source = self.registry.get(from_dialect)?;
        let target = self.registry.get(to_dialect)?;

        let ir = source.parse_response(raw)?;
        target.transform_response(ir, created)
    }

    /// Parses one streamed payload already in `from_dialect`'s wire shape
    /// and emits every chunk `to_dialect`'s wire shape can represent (P4:
    /// chunk kinds the target has no event for are dropped, never forced).
    ///
    /// Not valid when `to_dialect` is `"anthropic"`: its multi-event
    /// lifecycle needs running state this one-chunk-in-one-payload-out call
    /// can't carry, so `AnthropicAdapter::transform_stream_chunk` always
    /// returns `Ok(None)` here. Drive that target with
    /// `streaming::anthropic_emitter::AnthropicStreamEmitter` directly.
    pub fn transform_stream_chunk(
        &self,
        from_dialect: &str,
        to_dialect: &str,
        response_id: &str,
        raw: &str,
        model: &str,
        created: i64,
    ) -> Result<Vec<Value>> {
        let source = self.registry.get(from_dialect)?;
        let target = self.registry.get(to_dialect)?;

        let chunks = source.parse_stream_chunk(response_id, raw)?;
        chunks
            .into_iter()
            .filter_map(|chunk| target.transform_stream_chunk(chunk, model, created).transpose())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_minimal_request_from_openai_to_anthropic() {
        let registry = Registry::with_default_adapters();
        let facade = Facade::new(&registry);

        let raw = serde_json::json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "hi"}],
        });

        let out = facade.transform_request("openai", "anthropic", raw, Some("claude-3-5-sonnet".into()), None).unwrap();
        assert_eq!(out["model"], "claude-3-5-sonnet");
        assert_eq!(out["messages"][0]["role"], "user");
    }

    #[test]
    fn unknown_dialect_name_is_an_error() {
        let registry = Registry::with_default_adapters();
        let facade = Facade::new(&registry);
        let err = facade.transform_request("openai", "bedrock", serde_json::json!({}), None, None).unwrap_err();
        assert!(matches!(err, crate::error::GatewayError::UnknownProvider(_)));
    }

    #[test]
    fn thinking_override_replaces_whatever_the_source_parsed() {
        let registry = Registry::with_default_adapters();
        let facade = Facade::new(&registry);

        let raw = serde_json::json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "hi"}],
        });

        let override_config = Some(Some(unified::ThinkingConfig { enabled: true, budget: Some(1024) }));
        let out = facade.transform_request("openai", "anthropic", raw, None, override_config).unwrap();
        assert_eq!(out["thinking"]["budget_tokens"], 1024);
    }
}
