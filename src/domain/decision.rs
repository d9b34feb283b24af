//! RoutingDecision and the policy trace (spec §3, §4.4, §4.7).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classification::Classification;
use super::model::Tier;
use super::risk::RiskAssessment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceResult {
    Matched,
    Skipped,
    NotEvaluated,
    RiskOverride,
    BudgetOverride,
    CapabilityUnmet,
    FallbackFiltered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyTraceEntry {
    pub rule_name: String,
    pub result: TraceResult,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub model_id: String,
    pub provider_tag: String,
    pub succeeded: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyBreakdownMs {
    pub pre_analyzer: u64,
    pub risk_analyzer: u64,
    pub classifier: u64,
    pub policy: u64,
    pub provider: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    /// `(input_tokens / 1e6) * input_price + (output_tokens / 1e6) * output_price`
    /// (spec §4.7, prices are per-million-token as stored on `ConcreteModel`).
    pub fn estimate_cost_usd(
        &self,
        input_price_per_mtok: rust_decimal::Decimal,
        output_price_per_mtok: rust_decimal::Decimal,
    ) -> rust_decimal::Decimal {
        let million = rust_decimal::Decimal::from(1_000_000u32);
        (rust_decimal::Decimal::from(self.input_tokens) * input_price_per_mtok
            + rust_decimal::Decimal::from(self.output_tokens) * output_price_per_mtok)
            / million
    }
}

/// The committed outcome of routing a single request (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub request_id: Uuid,
    pub selected_model: String,
    pub provider: String,
    pub tier: Tier,
    pub rule_matched: String,
    pub fallback_chain: Vec<String>,
    pub confidence: f32,
    pub classification: Classification,
    pub risk_assessment: RiskAssessment,
    pub policy_version: String,
    pub constraints_applied: Vec<String>,
    pub policy_trace: Vec<PolicyTraceEntry>,
    pub latency_ms: LatencyBreakdownMs,
    pub token_usage: TokenUsage,
    pub estimated_cost_usd: rust_decimal::Decimal,
    /// Every attempt the Executor made, in order, including the winning one
    /// (spec §4.7 "attempt outcomes"; empty when the executor never ran).
    pub attempts: Vec<AttemptOutcome>,
    pub fallback_used: bool,
    pub virtual_model: Option<String>,
    pub terminal_error: Option<String>,
}

impl RoutingDecision {
    /// Invariant §3.4 helper: the matched trace entry's rule name must
    /// equal `rule_matched`, and exactly one entry is `matched`.
    pub fn matched_trace_entry(&self) -> Option<&PolicyTraceEntry> {
        self.policy_trace
            .iter()
            .find(|e| matches!(e.result, TraceResult::Matched))
    }
}
