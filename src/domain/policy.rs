//! PolicyRule / DepartmentPolicy and the YAML policy file schema (spec §3, §6).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::classification::{Complexity, TaskType};
use super::model::Tier;
use super::risk::RiskLevel;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchClause {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub task_type: Option<TaskType>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub complexity: Option<Complexity>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub risk_max: Option<RiskLevel>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub capabilities_required: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub department: Option<String>,
}

impl MatchClause {
    /// Unspecified predicates are wildcards; every specified predicate must hold.
    pub fn matches(
        &self,
        task_type: TaskType,
        complexity: Complexity,
        risk: RiskLevel,
        capabilities: &BTreeSet<String>,
        department: &str,
    ) -> bool {
        if let Some(t) = self.task_type {
            if t != task_type {
                return false;
            }
        }
        if let Some(c) = self.complexity {
            if c != complexity {
                return false;
            }
        }
        if let Some(max) = self.risk_max {
            if risk > max {
                return false;
            }
        }
        if !self.capabilities_required.is_subset(capabilities) {
            return false;
        }
        if let Some(d) = &self.department {
            if d != department {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub virtual_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub primary_model: Option<String>,
    #[serde(default)]
    pub fallback_models: Vec<String>,
    pub model_tier: Tier,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub name: String,
    #[serde(rename = "match", default)]
    pub match_clause: MatchClause,
    pub action: Action,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetThresholds {
    pub downgrade_at_pct: f32,
    pub force_cheap_at_pct: f32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_tier: Option<Tier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentPolicy {
    pub version: String,
    pub description: String,
    pub rules: Vec<PolicyRule>,
    pub budget: BudgetThresholds,
    pub base_fallback: Action,
}

impl DepartmentPolicy {
    pub fn emergency_default() -> Self {
        Self {
            version: "emergency".to_string(),
            description: "built-in emergency default, no policy loaded".to_string(),
            rules: Vec::new(),
            budget: BudgetThresholds {
                downgrade_at_pct: 80.0,
                force_cheap_at_pct: 95.0,
                max_tier: None,
            },
            base_fallback: Action {
                virtual_model: None,
                primary_model: Some("local/emergency-default".to_string()),
                fallback_models: Vec::new(),
                model_tier: Tier::Local,
                rationale: "no department policy available".to_string(),
            },
        }
    }
}
