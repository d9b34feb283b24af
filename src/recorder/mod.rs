//! C7: DecisionRecorder — emits exactly one structured audit record per
//! request (spec §4.7). Fans out to every configured sink with identical
//! payloads; append-only.

pub mod sinks;

pub use sinks::{AuditLogFilter, AuditQuery, AuditSink, InMemorySink, JsonFileSink, PostgresAuditSink};

use crate::domain::{Result, RoutingDecision};
use std::sync::Arc;

#[derive(Default)]
pub struct DecisionRecorder {
    sinks: Vec<Arc<dyn AuditSink>>,
    /// The sink that answers `GET /internal/audit/logs`, if any configured
    /// sink supports the read path (spec §6).
    queryable: Option<Arc<dyn AuditQuery>>,
}

impl DecisionRecorder {
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self {
            sinks,
            queryable: None,
        }
    }

    pub fn with_queryable(mut self, queryable: Arc<dyn AuditQuery>) -> Self {
        self.queryable = Some(queryable);
        self
    }

    /// Records the decision to every sink. A sink failure is logged but
    /// does not fail the request — the caller has already committed to a
    /// response; the audit write is a side effect, not a precondition.
    pub async fn record(&self, decision: &RoutingDecision) {
        for sink in &self.sinks {
            if let Err(err) = sink.store(decision).await {
                tracing::error!(
                    request_id = %decision.request_id,
                    error = %err,
                    "failed to write audit record to sink"
                );
            }
        }
    }

    pub async fn query(&self, filter: &AuditLogFilter) -> Result<Vec<RoutingDecision>> {
        match &self.queryable {
            Some(sink) => sink.query(filter).await,
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Classification, ClassifierSource, Complexity, LatencyBreakdownMs, RiskAssessment,
        RiskLevel, TaskType, Tier, TokenUsage,
    };
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use uuid::Uuid;

    fn sample_decision() -> RoutingDecision {
        RoutingDecision {
            request_id: Uuid::new_v4(),
            selected_model: "local/llama".to_string(),
            provider: "local".to_string(),
            tier: Tier::Local,
            rule_matched: "base_fallback".to_string(),
            fallback_chain: vec![],
            confidence: 0.5,
            classification: Classification {
                task_type: TaskType::General,
                complexity: Complexity::Medium,
                required_capabilities: BTreeSet::new(),
                confidence: 0.5,
                classifier_source: ClassifierSource::HeuristicFallback,
                department: None,
                rationale: String::new(),
            },
            risk_assessment: RiskAssessment::low(),
            policy_version: "1".to_string(),
            constraints_applied: vec![],
            policy_trace: vec![],
            latency_ms: LatencyBreakdownMs::default(),
            token_usage: TokenUsage::default(),
            estimated_cost_usd: Default::default(),
            attempts: vec![],
            fallback_used: false,
            virtual_model: None,
            terminal_error: None,
        }
    }

    #[tokio::test]
    async fn records_to_every_sink() {
        let sink = Arc::new(InMemorySink::default());
        let recorder = DecisionRecorder::new(vec![sink.clone()]);
        recorder.record(&sample_decision()).await;
        assert_eq!(sink.records().await.len(), 1);
    }
}
