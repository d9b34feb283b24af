//! RiskLevel and RiskAssessment (spec §3, §4.2).

use serde::{Deserialize, Serialize};

/// Ordered `low < medium < high < regulated`. Derive order matches
/// declaration order, so keep this ordering exactly as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Regulated,
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Low
    }
}

/// One of the closed signal families evaluated by the RiskAnalyzer, in
/// the order they are tried (spec §4.2 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalFamily {
    PiiPhiFinancialRegulated,
    LegalContractExec,
    BusinessSensitive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggeredSignal {
    pub family: SignalFamily,
    /// Matched text, truncated, quoted verbatim for explainability.
    pub excerpt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub rationale: String,
    pub triggered_signals: Vec<TriggeredSignal>,
    pub audit_required: bool,
    pub direct_commercial_forbidden: bool,
}

impl RiskAssessment {
    pub fn low() -> Self {
        Self {
            level: RiskLevel::Low,
            rationale: "no elevated signals detected".to_string(),
            triggered_signals: Vec::new(),
            audit_required: false,
            direct_commercial_forbidden: false,
        }
    }
}
