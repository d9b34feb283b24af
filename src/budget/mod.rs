//! Ext-A: BudgetStore — per-tenant/department spend counters and
//! daily-window semantics (spec §2, §5).
//!
//! Expected to be O(1) counter ops against a remote store with a short
//! timeout; on timeout the PolicyEngine proceeds with `budget_unknown`
//! and does not apply downgrade (spec §5).

pub mod types;

use async_trait::async_trait;
use std::time::Duration;

pub use types::BudgetStatus;

use crate::domain::Identity;

/// Timeout for a single BudgetStore round trip (spec §5).
pub const BUDGET_TIMEOUT: Duration = Duration::from_millis(50);

#[async_trait]
pub trait BudgetStore: Send + Sync {
    /// Current-period utilization percentage for (tenant, department).
    /// `None` means "unreachable or unknown" — callers must not assume 0.
    async fn utilization_pct(&self, identity: &Identity) -> Option<f32>;

    /// Record spend after a completed call (best-effort; failures here
    /// never affect the response already sent to the caller).
    async fn record_spend(&self, identity: &Identity, cost_usd: rust_decimal::Decimal);
}

/// Wraps any `BudgetStore` call with the spec §5 50ms timeout, collapsing
/// both "store error" and "timeout" into `None` (budget_unknown).
pub async fn utilization_with_timeout(
    store: &dyn BudgetStore,
    identity: &Identity,
) -> Option<f32> {
    match tokio::time::timeout(BUDGET_TIMEOUT, store.utilization_pct(identity)).await {
        Ok(pct) => pct,
        Err(_elapsed) => {
            tracing::warn!(tenant = %identity.tenant_id, department = %identity.department, "budget store timed out");
            None
        }
    }
}

/// Redis-backed implementation. Daily window keys are
/// `budget:{tenant}:{department}:{yyyy-mm-dd}` holding cents spent; the
/// percentage is computed against a configured daily cap.
pub struct RedisBudgetStore {
    client: redis::Client,
    daily_cap_usd_cents: i64,
}

impl RedisBudgetStore {
    pub fn new(redis_url: &str, daily_cap_usd_cents: i64) -> crate::domain::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            daily_cap_usd_cents,
        })
    }

    fn key(identity: &Identity) -> String {
        let today = chrono::Utc::now().format("%Y-%m-%d");
        format!(
            "budget:{}:{}:{}",
            identity.tenant_id, identity.department, today
        )
    }
}

#[async_trait]
impl BudgetStore for RedisBudgetStore {
    async fn utilization_pct(&self, identity: &Identity) -> Option<f32> {
        let mut conn = self.client.get_multiplexed_async_connection().await.ok()?;
        let spent_cents: i64 = redis::cmd("GET")
            .arg(Self::key(identity))
            .query_async(&mut conn)
            .await
            .unwrap_or(0);
        if self.daily_cap_usd_cents <= 0 {
            return Some(0.0);
        }
        Some((spent_cents as f32 / self.daily_cap_usd_cents as f32) * 100.0)
    }

    async fn record_spend(&self, identity: &Identity, cost_usd: rust_decimal::Decimal) {
        let Ok(mut conn) = self.client.get_multiplexed_async_connection().await else {
            return;
        };
        let cents = (cost_usd * rust_decimal::Decimal::from(100))
            .round()
            .to_string()
            .parse::<i64>()
            .unwrap_or(0);
        let key = Self::key(identity);
        let _: Result<(), _> = redis::pipe()
            .cmd("INCRBY")
            .arg(&key)
            .arg(cents)
            .cmd("EXPIRE")
            .arg(&key)
            .arg(172_800)
            .query_async(&mut conn)
            .await;
    }
}

/// In-process budget store for local development and tests (not
/// load-bearing — spec §1 treats BudgetStore as an external collaborator).
#[derive(Default)]
pub struct InMemoryBudgetStore {
    counters: dashmap::DashMap<(String, String), f32>,
}

#[async_trait]
impl BudgetStore for InMemoryBudgetStore {
    async fn utilization_pct(&self, identity: &Identity) -> Option<f32> {
        Some(
            *self
                .counters
                .get(&identity.policy_key())
                .map(|v| *v)
                .get_or_insert(0.0),
        )
    }

    async fn record_spend(&self, identity: &Identity, cost_usd: rust_decimal::Decimal) {
        use rust_decimal::prelude::ToPrimitive;
        let cost = cost_usd.to_f32().unwrap_or(0.0);
        *self.counters.entry(identity.policy_key()).or_insert(0.0) += cost;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_starts_at_zero() {
        let store = InMemoryBudgetStore::default();
        let identity = Identity::new("t1", "u1", "eng");
        assert_eq!(store.utilization_pct(&identity).await, Some(0.0));
    }
}
