//! Provider Registry (C3): a write-once map from provider name to adapter,
//! populated at startup and read many times afterward.

use std::collections::HashMap;
use std::sync::Arc;

use crate::adapter::{AiSdkAdapter, AnthropicAdapter, AntigravityAdapter, DialectAdapter, GeminiAdapter, OpenAiChatAdapter};
use crate::error::{GatewayError, Result};

#[derive(Clone)]
pub struct Registry {
    adapters: HashMap<&'static str, Arc<dyn DialectAdapter>>,
}

impl Registry {
    pub fn new() -> Self {
        Self { adapters: HashMap::new() }
    }

    /// The five dialects this crate knows about (spec §1), registered under
    /// their own names.
    pub fn with_default_adapters() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(OpenAiChatAdapter::new()));
        registry.register(Arc::new(AnthropicAdapter::new()));
        registry.register(Arc::new(GeminiAdapter::new()));
        registry.register(Arc::new(AntigravityAdapter::new()));
        registry.register(Arc::new(AiSdkAdapter::new()));
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn DialectAdapter>) {
        self.adapters.insert(adapter.name(), adapter);
    }

    pub fn has(&self, provider: &str) -> bool {
        self.adapters.contains_key(provider)
    }

    pub fn get(&self, provider: &str) -> Result<Arc<dyn DialectAdapter>> {
        self.adapters.get(provider).cloned().ok_or_else(|| GatewayError::UnknownProvider(provider.to_string()))
    }

    pub fn list(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.adapters.keys().copied()
    }

    pub fn clear(&mut self) {
        self.adapters.clear();
    }

    /// Finds the first registered adapter whose `is_supported_request`
    /// structural check passes. Used by the facade when the caller hasn't
    /// already pinned a dialect via the endpoint it hit.
    pub fn detect(&self, raw: &serde_json::Value) -> Option<Arc<dyn DialectAdapter>> {
        self.adapters.values().find(|adapter| adapter.is_supported_request(raw)).cloned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_default_adapters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_all_five_dialects() {
        let registry = Registry::with_default_adapters();
        assert!(registry.has("openai"));
        assert!(registry.has("anthropic"));
        assert!(registry.has("gemini"));
        assert!(registry.has("antigravity"));
        assert!(registry.has("ai-sdk"));
    }

    #[test]
    fn unregistered_provider_is_an_error() {
        let registry = Registry::new();
        assert!(registry.get("openai").is_err());
    }

    #[test]
    fn clear_empties_the_registry() {
        let mut registry = Registry::with_default_adapters();
        registry.clear();
        assert!(!registry.has("openai"));
    }
}
