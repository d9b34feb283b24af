//! Value types for the `/internal/routing/budget/status` endpoint (spec §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub tenant_id: String,
    pub user_id: String,
    pub department: String,
    pub utilization_pct: Option<f32>,
}
