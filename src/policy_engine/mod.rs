//! C4: PolicyEngine — the hardest component. Fuses Classification,
//! RiskAssessment, PreAnalysis, identity, DepartmentPolicy, and budget
//! status into a single concrete model selection (spec §4.4).

pub mod loader;
pub mod store;

use std::collections::BTreeSet;

use crate::budget::{utilization_with_timeout, BudgetStore};
use crate::domain::{
    Action, Classification, DepartmentPolicy, Identity, PolicyTraceEntry, PreAnalysis,
    ProviderTag, Result, RiskAssessment, RouterError, Tier, TraceResult,
};
use crate::providers::ProviderRegistry;

pub use store::{PolicyKey, PolicyStore};

/// The fused decision before the Executor attaches attempt outcomes:
/// everything in `RoutingDecision` except latency, token usage, cost,
/// and `fallback_used` (those are filled in after the provider call).
#[derive(Debug, Clone)]
pub struct PolicyOutcome {
    pub primary_model: String,
    pub fallback_chain: Vec<String>,
    pub tier: Tier,
    pub rule_matched: String,
    pub policy_trace: Vec<PolicyTraceEntry>,
    pub constraints_applied: Vec<String>,
    pub virtual_model: Option<String>,
    pub policy_version: String,
}

pub struct PolicyEngine {
    policy_store: PolicyStore,
    registry: ProviderRegistry,
}

impl PolicyEngine {
    pub fn new(policy_store: PolicyStore, registry: ProviderRegistry) -> Self {
        Self {
            policy_store,
            registry,
        }
    }

    pub fn policy_store(&self) -> &PolicyStore {
        &self.policy_store
    }

    pub async fn evaluate(
        &self,
        identity: &Identity,
        classification: &Classification,
        risk: &RiskAssessment,
        _pre: &PreAnalysis,
        budget_store: &dyn BudgetStore,
    ) -> Result<PolicyOutcome> {
        // Step 1: policy snapshot pinning.
        let key: PolicyKey = identity.policy_key();
        let snapshot = self.policy_store.snapshot(&key);

        // Steps 2-3: ordered rule match + virtual-model resolution.
        let (rule_name, action, mut trace) = self.match_rule(&snapshot, classification, risk, identity)?;

        let mut constraints = Vec::new();
        let mut candidates =
            self.resolve_candidates_filtered(&action, &classification.required_capabilities);

        if candidates.is_empty() {
            return Err(RouterError::NoRuleMatched);
        }

        // Step 4: risk enforcement (hard gate, set filter not reroute).
        if risk.direct_commercial_forbidden {
            let before = candidates.len();
            candidates.retain(|m| {
                self.registry
                    .model(m)
                    .map(|model| !model.provider_tag.is_direct_commercial())
                    .unwrap_or(true)
            });
            if candidates.is_empty() {
                trace.push(PolicyTraceEntry {
                    rule_name: rule_name.clone(),
                    result: TraceResult::RiskOverride,
                    reason: "all candidates are direct-commercial; risk gate forbids".to_string(),
                });
                return Err(RouterError::GovernanceBlocked {
                    reason: "risk gate stripped every candidate model".to_string(),
                });
            }
            if candidates.len() < before {
                constraints.push("risk_floor_high".to_string());
                trace.push(PolicyTraceEntry {
                    rule_name: rule_name.clone(),
                    result: TraceResult::RiskOverride,
                    reason: "direct-commercial candidates removed by risk gate".to_string(),
                });
            }
        }

        // Step 5: budget downgrade.
        let pct = utilization_with_timeout(budget_store, identity).await;
        let mut tier_cap: Option<Tier> = snapshot.budget.max_tier;
        match pct {
            None => {
                constraints.push("budget_unknown".to_string());
            }
            Some(pct) if pct >= snapshot.budget.force_cheap_at_pct => {
                candidates = self.resolve_candidates(&snapshot.base_fallback);
                constraints.push("budget_force_cheap".to_string());
                trace.push(PolicyTraceEntry {
                    rule_name: rule_name.clone(),
                    result: TraceResult::BudgetOverride,
                    reason: format!("utilization {pct:.1}% >= force_cheap_at_pct"),
                });
                tier_cap = Some(Tier::FastCheap.min(tier_cap.unwrap_or(Tier::FastCheap)));
            }
            Some(pct) if pct >= snapshot.budget.downgrade_at_pct => {
                constraints.push("budget_downgrade".to_string());
                trace.push(PolicyTraceEntry {
                    rule_name: rule_name.clone(),
                    result: TraceResult::BudgetOverride,
                    reason: format!("utilization {pct:.1}% >= downgrade_at_pct"),
                });
                let current_tier = self.tier_of(&candidates[0]);
                tier_cap = Some(match tier_cap {
                    Some(cap) => cap.min(current_tier.downgrade_one()),
                    None => current_tier.downgrade_one(),
                });
            }
            Some(_) => {}
        }

        if let Some(cap) = tier_cap {
            let before_primary = candidates.first().cloned();
            candidates.retain(|m| self.tier_of(m) <= cap);
            if candidates.is_empty() {
                candidates = self.resolve_candidates(&snapshot.base_fallback);
                candidates.retain(|m| self.tier_of(m) <= cap);
            }
            if candidates.is_empty() {
                // Base fallback itself exceeds the cap; proceed anyway rather
                // than leave the request with no candidate at all.
                candidates = before_primary.into_iter().collect();
            }
        }

        // Step 6: health filter — never remove the primary here, only the
        // fallback chain (the Executor observes the real primary failure).
        if candidates.len() > 1 {
            let primary = candidates[0].clone();
            let mut filtered = vec![primary];
            filtered.extend(candidates.into_iter().skip(1).filter(|m| {
                !matches!(self.registry.health(m), crate::domain::HealthState::Failing)
            }));
            candidates = filtered;
        }

        // Step 7: commit. Deduplicate fallback chain and ensure it excludes
        // the primary (invariant §3.7 / testable property 7).
        let primary_model = candidates[0].clone();
        let mut fallback_chain = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        seen.insert(primary_model.clone());
        for candidate in candidates.into_iter().skip(1) {
            if seen.insert(candidate.clone()) {
                fallback_chain.push(candidate);
            }
        }

        let tier = self.tier_of(&primary_model);
        let virtual_model = action.virtual_model.clone();

        Ok(PolicyOutcome {
            primary_model,
            fallback_chain,
            tier,
            rule_matched: rule_name,
            policy_trace: trace,
            constraints_applied: constraints,
            virtual_model,
            policy_version: snapshot.version.clone(),
        })
    }

    fn tier_of(&self, model_id: &str) -> Tier {
        self.registry
            .model(model_id)
            .map(|m| m.tier)
            .unwrap_or(Tier::Local)
    }

    /// Steps 2-3: returns the matched rule's name, its action, and the
    /// trace built so far (skipped entries for everything tried before
    /// the match, plus not_evaluated entries for everything after it).
    fn match_rule(
        &self,
        policy: &DepartmentPolicy,
        classification: &Classification,
        risk: &RiskAssessment,
        identity: &Identity,
    ) -> Result<(String, Action, Vec<PolicyTraceEntry>)> {
        let mut trace = Vec::new();

        for (idx, rule) in policy.rules.iter().enumerate() {
            let predicate_match = rule.match_clause.matches(
                classification.task_type,
                classification.complexity,
                risk.level,
                &classification.required_capabilities,
                &identity.department,
            );

            if !predicate_match {
                trace.push(PolicyTraceEntry {
                    rule_name: rule.name.clone(),
                    result: TraceResult::Skipped,
                    reason: "match clause predicates did not hold".to_string(),
                });
                continue;
            }

            let resolved = self.resolve_candidates_filtered(
                &rule.action,
                &classification.required_capabilities,
            );
            if resolved.is_empty() {
                trace.push(PolicyTraceEntry {
                    rule_name: rule.name.clone(),
                    result: TraceResult::CapabilityUnmet,
                    reason: "virtual model resolved to no capability-matching candidates"
                        .to_string(),
                });
                continue;
            }

            trace.push(PolicyTraceEntry {
                rule_name: rule.name.clone(),
                result: TraceResult::Matched,
                reason: "match clause predicates held and candidates resolved".to_string(),
            });
            for later in &policy.rules[idx + 1..] {
                trace.push(PolicyTraceEntry {
                    rule_name: later.name.clone(),
                    result: TraceResult::NotEvaluated,
                    reason: "earlier rule already matched".to_string(),
                });
            }
            return Ok((rule.name.clone(), rule.action.clone(), trace));
        }

        // Base fallback: matches unconditionally, so "no_rule_matched" is
        // reserved for the case where even this resolves to nothing.
        let resolved = self.resolve_candidates(&policy.base_fallback);
        if resolved.is_empty() {
            return Err(RouterError::NoRuleMatched);
        }
        trace.push(PolicyTraceEntry {
            rule_name: "base_fallback".to_string(),
            result: TraceResult::Matched,
            reason: "no department rule matched; base fallback applied".to_string(),
        });
        Ok(("base_fallback".to_string(), policy.base_fallback.clone(), trace))
    }

    /// Builds the ordered candidate list (primary first) for an action.
    /// Virtual models resolve through the registry; explicit
    /// primary/fallback model lists pass through unfiltered (the operator
    /// declared them directly, so there is nothing to resolve).
    fn resolve_candidates(&self, action: &Action) -> Vec<String> {
        if let Some(virtual_id) = &action.virtual_model {
            self.registry
                .resolve_virtual(virtual_id)
                .map(|list| list.to_vec())
                .unwrap_or_default()
        } else {
            let mut chain = Vec::new();
            if let Some(primary) = &action.primary_model {
                chain.push(primary.clone());
            }
            chain.extend(action.fallback_models.iter().cloned());
            chain
        }
    }

    /// As `resolve_candidates`, but for virtual-model actions also filters
    /// out any concrete model whose capability set fails to cover
    /// `required_capabilities` (spec §4.4 step 3). An empty result here is
    /// the `capability_unmet` trace condition.
    fn resolve_candidates_filtered(
        &self,
        action: &Action,
        required_capabilities: &BTreeSet<String>,
    ) -> Vec<String> {
        let chain = self.resolve_candidates(action);
        if action.virtual_model.is_none() {
            return chain;
        }
        chain
            .into_iter()
            .filter(|model_id| {
                self.registry
                    .model(model_id)
                    .map(|m| m.covers_capabilities(required_capabilities))
                    .unwrap_or(false)
            })
            .collect()
    }
}
