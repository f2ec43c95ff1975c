//! Model Router (C6): resolves a bare model name to `(provider, model)`
//! through a fixed precedence order (spec §4.1 / §6):
//!
//! 1. an explicit `model:provider` suffix
//! 2. a caller-supplied static mapping (config-driven overrides), itself
//!    carrying a primary target and any number of fallbacks
//! 3. a model catalog lookup (exact, then cautious prefix matching), which
//!    can itself be ambiguous — ambiguity is non-fatal and just falls
//!    through to the next step
//! 4. a regex pattern table inferred from each adapter's model prefixes,
//!    with OpenAI-family names further split into `openai`/`openai-web` by
//!    a credential-checker callback
//! 5. a hardcoded default (`openai`)
//!
//! Every step is synchronous and infallible — nothing here performs I/O; a
//! real catalog is expected to have been refreshed out of band before
//! `resolve` runs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::Regex;

use crate::registry::Registry;

/// The closed provider-id set the router resolves to (spec §4.2). A
/// superset of the dialect registry's adapter names: `openai-web` and
/// `opencode-zen` share the OpenAI-Chat wire dialect but are distinct
/// routing targets with their own credentials.
const KNOWN_PROVIDERS: &[&str] = &["openai", "anthropic", "gemini", "antigravity", "opencode-zen", "openai-web", "ai-sdk"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoute {
    pub provider: String,
    pub model: String,
    /// Additional `(provider, model)` targets to try if `provider` fails,
    /// in order.
    pub fallbacks: Vec<(String, String)>,
    /// Which resolution step produced this route: `"explicit"`, `"static"`,
    /// `"lookup"`, `"inference"`, or `"default"`.
    pub source: &'static str,
}

/// A queryable set of models known to exist per provider, refreshed by the
/// host application on whatever cadence it likes; the router only ever reads
/// it synchronously.
pub trait ModelCatalog: Send + Sync {
    fn known_models(&self, provider: &str) -> Vec<String>;
}

/// Whether the host has usable credentials for a provider. Used to
/// disambiguate an OpenAI-family inference match to `openai-web` vs plain
/// `openai`, and to decide whether `openai` is worth appending as a
/// fallback.
pub trait CredentialProvider: Send + Sync {
    fn has_credentials(&self, provider: &str) -> bool;
}

struct PatternRoute {
    pattern: Regex,
    provider: &'static str,
}

pub struct Router {
    known_providers: Vec<&'static str>,
    static_mapping: HashMap<String, Vec<String>>,
    patterns: Vec<PatternRoute>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    openai_fallback_enabled: bool,
}

impl Router {
    pub fn new(registry: &Registry) -> Self {
        Self {
            known_providers: registry.list().collect(),
            static_mapping: HashMap::new(),
            patterns: default_patterns(),
            credentials: None,
            openai_fallback_enabled: true,
        }
    }

    /// `mapping` values are ordered `[primary, ...fallbacks]`. Each entry is
    /// either a bare provider name (the target model stays the requested
    /// name) or a `model:provider` pair, matching the explicit-suffix shape.
    pub fn with_static_mapping(mut self, mapping: HashMap<String, Vec<String>>) -> Self {
        self.static_mapping = mapping;
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_openai_fallback_enabled(mut self, enabled: bool) -> Self {
        self.openai_fallback_enabled = enabled;
        self
    }

    /// Full resolution, consulting `catalog` at step 3. Never fails: a
    /// catalog ambiguity or an unmatched name simply falls through to the
    /// next step, down to the hardcoded default (spec §7: `AmbiguousModel`
    /// is non-fatal).
    pub fn resolve(&self, requested_model: &str, catalog: &dyn ModelCatalog) -> ModelRoute {
        self.explicit_suffix(requested_model)
            .or_else(|| self.static_mapping(requested_model))
            .or_else(|| self.catalog_lookup(requested_model, catalog))
            .or_else(|| self.pattern_inference(requested_model))
            .unwrap_or_else(|| default_route(requested_model))
    }

    /// Steps 1, 2, 4, 5 only — for callers with no catalog to consult.
    pub fn resolve_sync(&self, requested_model: &str) -> ModelRoute {
        self.explicit_suffix(requested_model)
            .or_else(|| self.static_mapping(requested_model))
            .or_else(|| self.pattern_inference(requested_model))
            .unwrap_or_else(|| default_route(requested_model))
    }

    fn explicit_suffix(&self, requested_model: &str) -> Option<ModelRoute> {
        let (model, provider) = requested_model.rsplit_once(':')?;
        self.known_providers.contains(&provider).then(|| ModelRoute {
            provider: provider.to_string(),
            model: model.to_string(),
            fallbacks: Vec::new(),
            source: "explicit",
        })
    }

    fn static_mapping(&self, requested_model: &str) -> Option<ModelRoute> {
        let (primary, fallbacks) = self.static_mapping.get(requested_model)?.split_first()?;
        let (provider, model) = split_target(primary, requested_model);
        let fallbacks = fallbacks.iter().map(|target| split_target(target, requested_model)).collect();
        Some(ModelRoute { provider, model, fallbacks, source: "static" })
    }

    /// Exact match wins; otherwise a cautious prefix match (spec §4.5 bullet
    /// 3 / §9 "catalog prefix matching is cautious"): a catalog entry
    /// matches if either string is a prefix of the other. Either way, the
    /// step only commits when every matching entry agrees on provider — any
    /// cross-provider disagreement (exact or prefix) is ambiguous and falls
    /// through rather than guessing (scenario S6).
    fn catalog_lookup(&self, requested_model: &str, catalog: &dyn ModelCatalog) -> Option<ModelRoute> {
        let entries: Vec<(&'static str, String)> =
            KNOWN_PROVIDERS.iter().flat_map(|&provider| catalog.known_models(provider).into_iter().map(move |model| (provider, model))).collect();

        let exact: Vec<&'static str> = entries.iter().filter(|(_, model)| model == requested_model).map(|(provider, _)| *provider).collect();
        if !exact.is_empty() {
            return single_provider_or_ambiguous(requested_model, exact);
        }

        let mut prefix_matches: Vec<&(&'static str, String)> =
            entries.iter().filter(|(_, model)| requested_model.starts_with(model.as_str()) || model.starts_with(requested_model)).collect();

        if prefix_matches.is_empty() {
            return None;
        }

        prefix_matches.sort_by_key(|(_, model)| std::cmp::Reverse(model.len()));
        let providers: Vec<&'static str> = prefix_matches.iter().map(|(provider, _)| *provider).collect();
        single_provider_or_ambiguous(requested_model, providers)
    }

    fn pattern_inference(&self, requested_model: &str) -> Option<ModelRoute> {
        let provider = self.patterns.iter().find(|route| route.pattern.is_match(requested_model))?.provider;

        Some(if provider == "openai" {
            self.resolve_openai_family(requested_model)
        } else {
            ModelRoute { provider: provider.to_string(), model: requested_model.to_string(), fallbacks: Vec::new(), source: "inference" }
        })
    }

    /// An OpenAI-family name is disambiguated to `openai-web` vs plain
    /// `openai` by the host's credential checker (spec §4.5, last
    /// paragraph): when both credentials exist and the fallback is enabled,
    /// `openai-web` is primary with `openai` appended as a fallback.
    fn resolve_openai_family(&self, requested_model: &str) -> ModelRoute {
        let has = |provider: &str| self.credentials.as_ref().is_some_and(|c| c.has_credentials(provider));

        if self.openai_fallback_enabled && has("openai-web") && has("openai") {
            ModelRoute {
                provider: "openai-web".to_string(),
                model: requested_model.to_string(),
                fallbacks: vec![("openai".to_string(), requested_model.to_string())],
                source: "inference",
            }
        } else {
            ModelRoute { provider: "openai".to_string(), model: requested_model.to_string(), fallbacks: Vec::new(), source: "inference" }
        }
    }
}

/// Commits to `provider` only if every candidate agrees; any disagreement is
/// ambiguous and falls through to the next resolution step rather than
/// guessing (spec §7: `AmbiguousModel` is non-fatal).
fn single_provider_or_ambiguous(requested_model: &str, providers: Vec<&'static str>) -> Option<ModelRoute> {
    let distinct: HashSet<&'static str> = providers.into_iter().collect();
    match distinct.len() {
        1 => Some(lookup_route(distinct.into_iter().next().expect("len checked above"), requested_model)),
        _ => {
            let mut candidates: Vec<String> = distinct.into_iter().map(str::to_string).collect();
            candidates.sort();
            log::warn!("model '{requested_model}' matches catalog entries from multiple providers {candidates:?}; falling through to inference");
            None
        }
    }
}

fn lookup_route(provider: &str, requested_model: &str) -> ModelRoute {
    ModelRoute { provider: provider.to_string(), model: requested_model.to_string(), fallbacks: Vec::new(), source: "lookup" }
}

fn default_route(requested_model: &str) -> ModelRoute {
    ModelRoute { provider: "openai".to_string(), model: requested_model.to_string(), fallbacks: Vec::new(), source: "default" }
}

/// Splits a static-mapping target of the form `model:provider` into
/// `(provider, model)`; a bare provider name keeps the originally requested
/// model name.
fn split_target(target: &str, requested_model: &str) -> (String, String) {
    match target.rsplit_once(':') {
        Some((model, provider)) => (provider.to_string(), model.to_string()),
        None => (target.to_string(), requested_model.to_string()),
    }
}

fn default_patterns() -> Vec<PatternRoute> {
    // Order matters: more specific patterns (antigravity, gemini) are
    // checked before the broad OpenAI catch-all so e.g. `o1`/`o3` never
    // accidentally falls into a pattern meant for a different provider, and
    // `gemini-claude-*`/`gemini-3-*` are claimed by Antigravity before the
    // plain `gemini-*` rule would otherwise take them.
    let rules: &[(&str, &str)] = &[
        (r"^claude-", "anthropic"),
        (r"^gemini-claude-", "antigravity"),
        (r"^gemini-3-", "antigravity"),
        (r"^gemini-", "gemini"),
        (r"^(gpt-|chatgpt-|o[0-9])", "openai"),
        (r"codex", "openai"),
    ];

    rules
        .iter()
        .map(|(pattern, provider)| PatternRoute {
            pattern: Regex::new(pattern).expect("router pattern table is a fixed, hand-written set of valid regexes"),
            provider,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    struct EmptyCatalog;
    impl ModelCatalog for EmptyCatalog {
        fn known_models(&self, _provider: &str) -> Vec<String> {
            Vec::new()
        }
    }

    struct StaticCatalog(HashMap<&'static str, Vec<&'static str>>);
    impl ModelCatalog for StaticCatalog {
        fn known_models(&self, provider: &str) -> Vec<String> {
            self.0.get(provider).map(|v| v.iter().map(|s| s.to_string()).collect()).unwrap_or_default()
        }
    }

    struct FixedCredentials(Vec<&'static str>);
    impl CredentialProvider for FixedCredentials {
        fn has_credentials(&self, provider: &str) -> bool {
            self.0.contains(&provider)
        }
    }

    fn router() -> Router {
        Router::new(&Registry::with_default_adapters())
    }

    #[test]
    fn explicit_suffix_wins_over_everything_else() {
        let route = router().resolve("gpt-4o:anthropic", &EmptyCatalog);
        assert_eq!(route.provider, "anthropic");
        assert_eq!(route.model, "gpt-4o");
        assert_eq!(route.source, "explicit");
    }

    #[test]
    fn pattern_inference_routes_claude_to_anthropic() {
        let route = router().resolve("claude-3-5-sonnet-20241022", &EmptyCatalog);
        assert_eq!(route.provider, "anthropic");
        assert_eq!(route.source, "inference");
    }

    #[test]
    fn gemini_claude_prefix_routes_to_antigravity_not_gemini() {
        let route = router().resolve("gemini-claude-3-opus", &EmptyCatalog);
        assert_eq!(route.provider, "antigravity");
    }

    #[test]
    fn gemini_3_prefix_routes_to_antigravity() {
        let route = router().resolve("gemini-3-pro", &EmptyCatalog);
        assert_eq!(route.provider, "antigravity");
    }

    #[test]
    fn plain_gemini_prefix_routes_to_gemini() {
        let route = router().resolve("gemini-1.5-pro", &EmptyCatalog);
        assert_eq!(route.provider, "gemini");
    }

    #[test]
    fn codex_anywhere_in_the_name_routes_to_openai() {
        let route = router().resolve("my-codex-finetune", &EmptyCatalog);
        assert_eq!(route.provider, "openai");
    }

    #[test]
    fn unrecognized_model_defaults_to_openai() {
        let route = router().resolve("some-custom-finetune", &EmptyCatalog);
        assert_eq!(route.provider, "openai");
        assert_eq!(route.source, "default");
    }

    #[test]
    fn catalog_ambiguity_is_non_fatal_and_falls_through_to_inference() {
        let mut catalog_data = HashMap::new();
        catalog_data.insert("openai", vec!["shared-model"]);
        catalog_data.insert("anthropic", vec!["shared-model"]);
        let catalog = StaticCatalog(catalog_data);

        // Not a fatal error (spec §7: AmbiguousModel is non-fatal) and
        // "shared-model" matches no inference pattern either, so it lands
        // on the hardcoded default rather than propagating an `Err`.
        let route = router().resolve("shared-model", &catalog);
        assert_eq!(route.provider, "openai");
        assert_eq!(route.source, "default");
    }

    #[test]
    fn catalog_prefix_ambiguity_across_providers_falls_through_to_inference() {
        // Scenario S6.
        let mut catalog_data = HashMap::new();
        catalog_data.insert("openai", vec!["gpt-4"]);
        catalog_data.insert("openai-web", vec!["gpt-4-turbo"]);
        let catalog = StaticCatalog(catalog_data);

        let route = router().resolve("gpt-4-turbo-preview", &catalog);
        assert_eq!(route.provider, "openai");
        assert_eq!(route.source, "inference");
    }

    #[test]
    fn catalog_prefix_match_picks_the_longest_entry_when_providers_agree() {
        let mut catalog_data = HashMap::new();
        catalog_data.insert("anthropic", vec!["claude-3", "claude-3-opus"]);
        let catalog = StaticCatalog(catalog_data);

        let route = router().resolve("claude-3-opus-20240229", &catalog);
        assert_eq!(route.provider, "anthropic");
        assert_eq!(route.source, "lookup");
    }

    #[test]
    fn static_mapping_overrides_pattern_inference() {
        let mut mapping = HashMap::new();
        mapping.insert("gpt-4o".to_string(), vec!["antigravity".to_string()]);
        let route = router().with_static_mapping(mapping).resolve("gpt-4o", &EmptyCatalog);
        assert_eq!(route.provider, "antigravity");
        assert_eq!(route.source, "static");
    }

    #[test]
    fn static_mapping_fallbacks_carry_their_own_provider_suffix() {
        let mut mapping = HashMap::new();
        mapping.insert("house-model".to_string(), vec!["house-model:anthropic".to_string(), "house-model-fallback:gemini".to_string()]);
        let route = router().with_static_mapping(mapping).resolve("house-model", &EmptyCatalog);
        assert_eq!(route.provider, "anthropic");
        assert_eq!(route.model, "house-model");
        assert_eq!(route.fallbacks, vec![("gemini".to_string(), "house-model-fallback".to_string())]);
    }

    #[test]
    fn openai_web_credential_present_alone_does_not_trigger_fallback_pairing() {
        let credentials = Arc::new(FixedCredentials(vec!["openai-web"]));
        let route = router().with_credentials(credentials).resolve("gpt-4o", &EmptyCatalog);
        assert_eq!(route.provider, "openai");
        assert!(route.fallbacks.is_empty());
    }

    #[test]
    fn both_openai_credentials_present_prefers_web_with_standard_as_fallback() {
        let credentials = Arc::new(FixedCredentials(vec!["openai", "openai-web"]));
        let route = router().with_credentials(credentials).resolve("gpt-4o", &EmptyCatalog);
        assert_eq!(route.provider, "openai-web");
        assert_eq!(route.fallbacks, vec![("openai".to_string(), "gpt-4o".to_string())]);
    }

    #[test]
    fn disabling_openai_fallback_keeps_plain_openai_even_with_both_credentials() {
        let credentials = Arc::new(FixedCredentials(vec!["openai", "openai-web"]));
        let route = router().with_credentials(credentials).with_openai_fallback_enabled(false).resolve("gpt-4o", &EmptyCatalog);
        assert_eq!(route.provider, "openai");
        assert!(route.fallbacks.is_empty());
    }
}
