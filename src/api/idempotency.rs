//! Buffered-response replay cache (SPEC_FULL.md §9 Open Question 1).
//!
//! A buffered (non-streaming) `/v1/chat/completions` response is cached for
//! 24h, keyed on `(tenant_id, Idempotency-Key)`. A repeated key with the
//! same request body short-circuits straight to the cached response without
//! re-running C1-C6. Streaming requests never consult this cache — replaying
//! a byte stream is not meaningful, so the header is accepted but ignored
//! for `stream: true` requests (spec §9, documented not silently dropped).

use dashmap::DashMap;
use std::time::{Duration, Instant};

const TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
struct CachedEntry {
    inserted_at: Instant,
    request_fingerprint: u64,
    response: serde_json::Value,
}

/// In-process replay cache. Not shared across instances — a deployment
/// fronted by multiple replicas of this proxy gets weaker idempotency
/// guarantees than a single instance, which is an accepted limitation of
/// treating this as ambient infrastructure rather than a spec-load-bearing
/// component (spec §1 lists the decision/audit store as external).
#[derive(Default)]
pub struct IdempotencyCache {
    entries: DashMap<(String, String), CachedEntry>,
}

impl IdempotencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached response if present, unexpired, and the request
    /// body fingerprint matches (same key reused for a different body is
    /// treated as a cache miss, not a collision error).
    pub fn get(&self, tenant_id: &str, key: &str, fingerprint: u64) -> Option<serde_json::Value> {
        let entry = self.entries.get(&(tenant_id.to_string(), key.to_string()))?;
        if entry.inserted_at.elapsed() > TTL || entry.request_fingerprint != fingerprint {
            return None;
        }
        Some(entry.response.clone())
    }

    pub fn put(&self, tenant_id: &str, key: &str, fingerprint: u64, response: serde_json::Value) {
        self.entries.insert(
            (tenant_id.to_string(), key.to_string()),
            CachedEntry {
                inserted_at: Instant::now(),
                request_fingerprint: fingerprint,
                response,
            },
        );
    }
}

/// Cheap non-cryptographic fingerprint of the request body, good enough to
/// detect "same idempotency key, different body" reuse.
pub fn fingerprint(body: &crate::domain::ChatCompletionRequest) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    body.model.hash(&mut hasher);
    body.stream.hash(&mut hasher);
    for message in &body.messages {
        message.content.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatCompletionRequest, Message};

    fn sample_request(content: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            messages: vec![Message::user(content)],
            model: "auto".to_string(),
            stream: false,
            tools: None,
            temperature: None,
            max_tokens: None,
            conversation_id: None,
        }
    }

    #[test]
    fn miss_on_empty_cache() {
        let cache = IdempotencyCache::new();
        assert!(cache.get("tenant-1", "key-1", 42).is_none());
    }

    #[test]
    fn hit_on_matching_fingerprint() {
        let cache = IdempotencyCache::new();
        let fp = fingerprint(&sample_request("hello"));
        cache.put("tenant-1", "key-1", fp, serde_json::json!({"ok": true}));
        assert_eq!(
            cache.get("tenant-1", "key-1", fp),
            Some(serde_json::json!({"ok": true}))
        );
    }

    #[test]
    fn miss_when_body_changes_under_same_key() {
        let cache = IdempotencyCache::new();
        let fp_a = fingerprint(&sample_request("hello"));
        let fp_b = fingerprint(&sample_request("goodbye"));
        cache.put("tenant-1", "key-1", fp_a, serde_json::json!({"ok": true}));
        assert!(cache.get("tenant-1", "key-1", fp_b).is_none());
    }
}
