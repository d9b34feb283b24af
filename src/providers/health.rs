//! Provider health tracking. Grounded on the teacher's
//! `observability::health` tri-state model (Healthy/Degraded/Unhealthy),
//! narrowed to the spec's `Healthy | Degraded | Failing` states and the
//! consecutive-failure escalation rule of spec §4.5.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::domain::HealthState;

/// Consecutive transient failures before a provider is marked Degraded,
/// then Failing. First success resets the counter immediately.
const DEGRADED_AFTER: u32 = 2;
const FAILING_AFTER: u32 = 5;

struct ProviderHealthCounter {
    consecutive_failures: AtomicU32,
}

/// Background-pinger-and-per-call-updated health map, shared across
/// requests. Readers take a point-in-time copy (spec §5 shared resource 2).
#[derive(Clone, Default)]
pub struct HealthMap {
    counters: Arc<DashMap<String, ProviderHealthCounter>>,
}

impl HealthMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, provider_tag: &str) {
        if let Some(counter) = self.counters.get(provider_tag) {
            counter.consecutive_failures.store(0, Ordering::Relaxed);
        }
    }

    pub fn record_failure(&self, provider_tag: &str) {
        let entry = self
            .counters
            .entry(provider_tag.to_string())
            .or_insert_with(|| ProviderHealthCounter {
                consecutive_failures: AtomicU32::new(0),
            });
        entry.consecutive_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn health(&self, provider_tag: &str) -> HealthState {
        match self.counters.get(provider_tag) {
            Some(counter) => {
                let failures = counter.consecutive_failures.load(Ordering::Relaxed);
                if failures >= FAILING_AFTER {
                    HealthState::Failing
                } else if failures >= DEGRADED_AFTER {
                    HealthState::Degraded
                } else {
                    HealthState::Healthy
                }
            }
            None => HealthState::Healthy,
        }
    }

    /// Point-in-time copy of every tracked provider's health, used by
    /// `GET /health`.
    pub fn snapshot(&self) -> Vec<(String, HealthState)> {
        self.counters
            .iter()
            .map(|entry| (entry.key().clone(), self.health(entry.key())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalates_then_resets() {
        let map = HealthMap::new();
        assert_eq!(map.health("openai"), HealthState::Healthy);
        for _ in 0..DEGRADED_AFTER {
            map.record_failure("openai");
        }
        assert_eq!(map.health("openai"), HealthState::Degraded);
        for _ in DEGRADED_AFTER..FAILING_AFTER {
            map.record_failure("openai");
        }
        assert_eq!(map.health("openai"), HealthState::Failing);
        map.record_success("openai");
        assert_eq!(map.health("openai"), HealthState::Healthy);
    }
}
