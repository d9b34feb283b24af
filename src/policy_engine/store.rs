//! Ext-B: PolicyStore — current active policy per (tenant, department),
//! with atomic reload (spec §2 Ext-B, §5, §9 "Hot-reload without
//! quiescing").
//!
//! A single atomic pointer swap between immutable snapshots. Old
//! snapshots are dropped once their last referencing request completes
//! — `Arc` reference counting gives us this for free; `ArcSwap` gives us
//! the atomic swap without a lock on the read path.

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::Arc;

use crate::domain::DepartmentPolicy;

pub type PolicyKey = (String, String);

/// In-memory, hot-reloadable policy snapshot store. `snapshot()` readers
/// never observe a torn or half-loaded value (invariant §3.7).
#[derive(Clone, Default)]
pub struct PolicyStore {
    snapshots: Arc<DashMap<PolicyKey, ArcSwap<DepartmentPolicy>>>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a single immutable snapshot (spec §4.4 step 1: "policy
    /// snapshot pinning"). Falls back to the built-in emergency default
    /// when no policy has ever been loaded for this key.
    pub fn snapshot(&self, key: &PolicyKey) -> Arc<DepartmentPolicy> {
        match self.snapshots.get(key) {
            Some(entry) => entry.load_full(),
            None => Arc::new(DepartmentPolicy::emergency_default()),
        }
    }

    /// Atomically replace the policy for `key`. In-flight requests that
    /// already loaded the previous snapshot keep using it until they
    /// complete; new requests see the new one immediately.
    pub fn reload(&self, key: PolicyKey, policy: DepartmentPolicy) {
        match self.snapshots.get(&key) {
            Some(existing) => existing.store(Arc::new(policy)),
            None => {
                self.snapshots.insert(key, ArcSwap::from_pointee(policy));
            }
        }
    }

    pub fn keys(&self) -> Vec<PolicyKey> {
        self.snapshots.iter().map(|e| e.key().clone()).collect()
    }

    /// All current snapshots, for `GET /internal/routing/policies`.
    pub fn all_snapshots(&self) -> Vec<(PolicyKey, Arc<DepartmentPolicy>)> {
        self.snapshots
            .iter()
            .map(|e| (e.key().clone(), e.value().load_full()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_falls_back_to_emergency_default() {
        let store = PolicyStore::new();
        let snapshot = store.snapshot(&("t1".to_string(), "eng".to_string()));
        assert_eq!(snapshot.version, "emergency");
    }

    #[test]
    fn reload_is_visible_to_new_snapshot_calls() {
        let store = PolicyStore::new();
        let key = ("t1".to_string(), "eng".to_string());
        let mut policy = DepartmentPolicy::emergency_default();
        policy.version = "v2".to_string();
        store.reload(key.clone(), policy);
        assert_eq!(store.snapshot(&key).version, "v2");
    }

    #[test]
    fn in_flight_snapshot_is_unaffected_by_concurrent_reload() {
        let store = PolicyStore::new();
        let key = ("t1".to_string(), "eng".to_string());
        let mut v1 = DepartmentPolicy::emergency_default();
        v1.version = "v1".to_string();
        store.reload(key.clone(), v1);
        let pinned = store.snapshot(&key);

        let mut v2 = DepartmentPolicy::emergency_default();
        v2.version = "v2".to_string();
        store.reload(key.clone(), v2);

        assert_eq!(pinned.version, "v1");
        assert_eq!(store.snapshot(&key).version, "v2");
    }
}
