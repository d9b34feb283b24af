//! Orchestrates stages C1-C7 over a single request (spec §2, §3 Lifecycle).
//!
//! A `RoutingContext` is created at HTTP ingress, mutated by the stages in
//! order, emitted to the `DecisionRecorder`, and then discarded. Invariant
//! §3.1: a Request produces exactly one `RoutingDecision`, even when the
//! provider call ultimately errors — every return path below builds and
//! records a decision before surfacing success or failure to the caller.

use std::sync::Arc;
use std::time::Instant;

use crate::budget::BudgetStore;
use crate::classifier::Classifier;
use crate::domain::{
    Classification, IncomingRequest, LatencyBreakdownMs, PreAnalysis, Result, RiskAssessment,
    RouterError, RoutingDecision, TokenUsage,
};
use crate::executor::{ExecutionFailure, ExecutionOutcome, Executor, ExecutorBody};
use crate::policy_engine::PolicyEngine;
use crate::preanalyzer;
use crate::recorder::DecisionRecorder;
use crate::risk;

pub struct RoutingContext {
    pub pre_analysis: PreAnalysis,
    pub risk: RiskAssessment,
    pub classification: Classification,
}

pub struct RoutingPipeline {
    classifier: Arc<Classifier>,
    policy_engine: Arc<PolicyEngine>,
    executor: Arc<Executor>,
    recorder: Arc<DecisionRecorder>,
    budget_store: Arc<dyn BudgetStore>,
    /// Policy-configurable long-context threshold (SPEC_FULL.md §9
    /// resolution): tokens above this add `long_context` to the required
    /// capability set before policy evaluation.
    long_context_token_threshold: u32,
}

pub struct RouteResult {
    pub decision: RoutingDecision,
    pub body: ExecutorBody,
}

impl RoutingPipeline {
    pub fn new(
        classifier: Arc<Classifier>,
        policy_engine: Arc<PolicyEngine>,
        executor: Arc<Executor>,
        recorder: Arc<DecisionRecorder>,
        budget_store: Arc<dyn BudgetStore>,
        long_context_token_threshold: u32,
    ) -> Self {
        Self {
            classifier,
            policy_engine,
            executor,
            recorder,
            budget_store,
            long_context_token_threshold,
        }
    }

    /// Runs C1 -> C7 for a single incoming request, recording exactly one
    /// decision regardless of outcome.
    pub async fn route(&self, incoming: &IncomingRequest) -> std::result::Result<RouteResult, RouterError> {
        let total_start = Instant::now();

        // C1
        let t0 = Instant::now();
        let mut pre = preanalyzer::analyze(&incoming.body);
        pre.department_hint = Some(incoming.identity.department.clone());
        let pre_analyzer_ms = t0.elapsed().as_millis() as u64;

        // C2 — authoritative; never softened by later stages (invariant §3.2).
        let t0 = Instant::now();
        let risk_assessment = risk::assess(&incoming.body, &pre);
        let risk_ms = t0.elapsed().as_millis() as u64;

        // C3 — advisory only.
        let t0 = Instant::now();
        let mut classification = self.classifier.classify(&incoming.body, &pre).await;
        if pre.estimated_input_tokens > self.long_context_token_threshold {
            classification
                .required_capabilities
                .insert("long_context".to_string());
        }
        let classifier_ms = t0.elapsed().as_millis() as u64;

        // C4
        let t0 = Instant::now();
        let policy_result = self
            .policy_engine
            .evaluate(
                &incoming.identity,
                &classification,
                &risk_assessment,
                &pre,
                self.budget_store.as_ref(),
            )
            .await;
        let policy_ms = t0.elapsed().as_millis() as u64;

        let latency_base = LatencyBreakdownMs {
            pre_analyzer: pre_analyzer_ms,
            risk_analyzer: risk_ms,
            classifier: classifier_ms,
            policy: policy_ms,
            provider: 0,
        };

        let policy_outcome = match policy_result {
            Ok(outcome) => outcome,
            Err(err) => {
                let decision = self.build_error_decision(
                    incoming,
                    &pre,
                    &risk_assessment,
                    &classification,
                    latency_base,
                    &err,
                );
                self.recorder.record(&decision).await;
                return Err(err);
            }
        };

        // C6
        let t0 = Instant::now();
        let exec_result = self
            .executor
            .execute(
                &policy_outcome.primary_model,
                &policy_outcome.fallback_chain,
                &incoming.body,
            )
            .await;
        let provider_ms = t0.elapsed().as_millis() as u64;

        let mut latency = latency_base;
        latency.provider = provider_ms;

        match exec_result {
            Ok(outcome) => {
                let decision = self.build_success_decision(
                    incoming,
                    &risk_assessment,
                    &classification,
                    &policy_outcome,
                    &outcome,
                    latency,
                );
                // Streaming responses finalize their own audit record once the
                // stream completes (or fails mid-stream): token usage and
                // cost aren't known until then, and invariant §3.1 requires
                // exactly one record per request, so `api::sse` takes over
                // recording rather than this recording twice.
                let is_stream = matches!(outcome.body, ExecutorBody::Stream(_));
                if !is_stream {
                    self.budget_store
                        .record_spend(&incoming.identity, decision.estimated_cost_usd)
                        .await;
                    self.recorder.record(&decision).await;
                }
                let _ = total_start;
                Ok(RouteResult {
                    decision,
                    body: outcome.body,
                })
            }
            Err(failure) => {
                let decision = self.build_failed_execution_decision(
                    incoming,
                    &risk_assessment,
                    &classification,
                    &policy_outcome,
                    latency,
                    &failure,
                );
                self.recorder.record(&decision).await;
                Err(failure.error)
            }
        }
    }

    /// Runs only C2-C4 against a caller-supplied synthetic classification,
    /// never calling a provider (`POST /internal/routing/simulate`, spec §6).
    pub async fn simulate(
        &self,
        incoming: &IncomingRequest,
        classification: Classification,
    ) -> Result<RoutingDecision> {
        let pre = preanalyzer::analyze(&incoming.body);
        let risk_assessment = risk::assess(&incoming.body, &pre);
        let policy_outcome = self
            .policy_engine
            .evaluate(
                &incoming.identity,
                &classification,
                &risk_assessment,
                &pre,
                self.budget_store.as_ref(),
            )
            .await?;

        Ok(RoutingDecision {
            request_id: incoming.request_id,
            selected_model: policy_outcome.primary_model.clone(),
            provider: policy_outcome
                .primary_model
                .split_once('/')
                .map(|(ns, _)| ns.to_string())
                .unwrap_or_default(),
            tier: policy_outcome.tier,
            rule_matched: policy_outcome.rule_matched,
            fallback_chain: policy_outcome.fallback_chain,
            confidence: classification.confidence,
            classification,
            risk_assessment,
            policy_version: policy_outcome.policy_version,
            constraints_applied: policy_outcome.constraints_applied,
            policy_trace: policy_outcome.policy_trace,
            latency_ms: LatencyBreakdownMs::default(),
            token_usage: TokenUsage::default(),
            estimated_cost_usd: Default::default(),
            attempts: vec![],
            fallback_used: false,
            virtual_model: policy_outcome.virtual_model,
            terminal_error: None,
        })
    }

    fn build_error_decision(
        &self,
        incoming: &IncomingRequest,
        _pre: &PreAnalysis,
        risk_assessment: &RiskAssessment,
        classification: &Classification,
        latency: LatencyBreakdownMs,
        err: &RouterError,
    ) -> RoutingDecision {
        RoutingDecision {
            request_id: incoming.request_id,
            selected_model: String::new(),
            provider: String::new(),
            tier: crate::domain::Tier::Local,
            rule_matched: String::new(),
            fallback_chain: vec![],
            confidence: classification.confidence,
            classification: classification.clone(),
            risk_assessment: risk_assessment.clone(),
            policy_version: String::new(),
            constraints_applied: vec![],
            policy_trace: vec![],
            latency_ms: latency,
            token_usage: TokenUsage::default(),
            estimated_cost_usd: Default::default(),
            attempts: vec![],
            fallback_used: false,
            virtual_model: None,
            terminal_error: Some(err.to_string()),
        }
    }

    /// Reads the buffered response body's `usage` object (when present) and
    /// prices it against the winning model's per-million-token rates
    /// (spec §4.7). Streaming bodies are priced later by `api::sse` once the
    /// final chunk's `usage` field is known.
    fn usage_and_cost(&self, exec_outcome: &ExecutionOutcome) -> (TokenUsage, rust_decimal::Decimal) {
        let token_usage = match &exec_outcome.body {
            ExecutorBody::Buffered(value) => {
                crate::providers::streaming::usage_from_value(value).unwrap_or_default()
            }
            ExecutorBody::Stream(_) => TokenUsage::default(),
        };
        let estimated_cost_usd = self
            .executor
            .registry()
            .model(&exec_outcome.model_used)
            .map(|m| token_usage.estimate_cost_usd(m.input_price_per_mtok, m.output_price_per_mtok))
            .unwrap_or_default();
        (token_usage, estimated_cost_usd)
    }

    fn build_success_decision(
        &self,
        incoming: &IncomingRequest,
        risk_assessment: &RiskAssessment,
        classification: &Classification,
        policy_outcome: &crate::policy_engine::PolicyOutcome,
        exec_outcome: &ExecutionOutcome,
        latency: LatencyBreakdownMs,
    ) -> RoutingDecision {
        let (token_usage, estimated_cost_usd) = self.usage_and_cost(exec_outcome);
        RoutingDecision {
            request_id: incoming.request_id,
            selected_model: exec_outcome.model_used.clone(),
            provider: exec_outcome.provider.clone(),
            tier: policy_outcome.tier,
            rule_matched: policy_outcome.rule_matched.clone(),
            fallback_chain: policy_outcome.fallback_chain.clone(),
            confidence: classification.confidence,
            classification: classification.clone(),
            risk_assessment: risk_assessment.clone(),
            policy_version: policy_outcome.policy_version.clone(),
            constraints_applied: policy_outcome.constraints_applied.clone(),
            policy_trace: policy_outcome.policy_trace.clone(),
            latency_ms: latency,
            token_usage,
            estimated_cost_usd,
            attempts: exec_outcome.attempts.clone(),
            fallback_used: exec_outcome.fallback_used,
            virtual_model: policy_outcome.virtual_model.clone(),
            terminal_error: None,
        }
    }

    fn build_failed_execution_decision(
        &self,
        incoming: &IncomingRequest,
        risk_assessment: &RiskAssessment,
        classification: &Classification,
        policy_outcome: &crate::policy_engine::PolicyOutcome,
        latency: LatencyBreakdownMs,
        failure: &ExecutionFailure,
    ) -> RoutingDecision {
        RoutingDecision {
            request_id: incoming.request_id,
            selected_model: policy_outcome.primary_model.clone(),
            provider: String::new(),
            tier: policy_outcome.tier,
            rule_matched: policy_outcome.rule_matched.clone(),
            fallback_chain: policy_outcome.fallback_chain.clone(),
            confidence: classification.confidence,
            classification: classification.clone(),
            risk_assessment: risk_assessment.clone(),
            policy_version: policy_outcome.policy_version.clone(),
            constraints_applied: policy_outcome.constraints_applied.clone(),
            policy_trace: policy_outcome.policy_trace.clone(),
            latency_ms: latency,
            token_usage: TokenUsage::default(),
            estimated_cost_usd: Default::default(),
            attempts: failure.attempts.clone(),
            fallback_used: true,
            virtual_model: policy_outcome.virtual_model.clone(),
            terminal_error: Some(failure.error.to_string()),
        }
    }
}
