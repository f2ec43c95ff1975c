//! Antigravity session-signature store (spec §5): a bounded, TTL-expiring
//! cache from session id to the opaque signature blob Antigravity hands back
//! on each turn. One caller writes it in after a response comes back; many
//! callers can read it when building the next turn's request. Modeled the
//! way `mcp::cache::DynamicDownstreamCache` caches its downstream handles.

use std::time::Duration;

use mini_moka::sync::Cache;

pub struct SignatureStore {
    cache: Cache<String, String>,
}

impl SignatureStore {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).time_to_live(ttl).build(),
        }
    }

    pub fn get(&self, session_id: &str) -> Option<String> {
        self.cache.get(&session_id.to_string())
    }

    pub fn put(&self, session_id: impl Into<String>, signature: impl Into<String>) {
        self.cache.insert(session_id.into(), signature.into());
    }

    pub fn remove(&self, session_id: &str) {
        self.cache.invalidate(&session_id.to_string());
    }
}

impl Default for SignatureStore {
    /// 10,000 sessions, 1 hour idle-free TTL — generous enough to outlive a
    /// single multi-turn conversation without growing unbounded across many.
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_signature_by_session_id() {
        let store = SignatureStore::default();
        store.put("session-1", "opaque-sig");
        assert_eq!(store.get("session-1").as_deref(), Some("opaque-sig"));
    }

    #[test]
    fn missing_session_returns_none() {
        let store = SignatureStore::default();
        assert_eq!(store.get("unknown"), None);
    }

    #[test]
    fn a_later_put_overwrites_the_earlier_signature() {
        let store = SignatureStore::default();
        store.put("session-1", "first");
        store.put("session-1", "second");
        assert_eq!(store.get("session-1").as_deref(), Some("second"));
    }

    #[test]
    fn remove_evicts_the_entry() {
        let store = SignatureStore::default();
        store.put("session-1", "sig");
        store.remove("session-1");
        assert_eq!(store.get("session-1"), None);
    }
}
