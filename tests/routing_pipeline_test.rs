//! End-to-end tests driving `RoutingPipeline::route` against a wiremock
//! stand-in provider, exercising the concrete scenarios in
//! SPEC_FULL.md §8 without a real LLM backend.

use std::collections::HashMap;
use std::sync::Arc;

use routing_brain::budget::{BudgetStore, InMemoryBudgetStore};
use routing_brain::classifier::Classifier;
use routing_brain::domain::{
    Action, BudgetThresholds, ChatCompletionRequest, ConcreteModel, DepartmentPolicy, Identity,
    IncomingRequest, Message, MatchClause, PolicyRule, ProviderTag, RiskLevel, Tier,
};
use routing_brain::executor::Executor;
use routing_brain::pipeline::RoutingPipeline;
use routing_brain::policy_engine::{PolicyEngine, PolicyStore};
use routing_brain::providers::{ProviderBinding, ProviderRegistry};
use routing_brain::recorder::{AuditLogFilter, DecisionRecorder, InMemorySink};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn provider_stub(server: &MockServer, completion: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "chatcmpl-test",
            "choices": [{"message": {"role": "assistant", "content": completion}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20},
        })))
        .mount(server)
        .await;
}

fn model(model_id: &str, tier: Tier) -> ConcreteModel {
    ConcreteModel {
        model_id: model_id.to_string(),
        provider_tag: ProviderTag::SelfHosted,
        capabilities: Default::default(),
        tier,
        input_price_per_mtok: "0.50".parse().unwrap(),
        output_price_per_mtok: "1.50".parse().unwrap(),
        context_window: 32_000,
        health: routing_brain::domain::HealthState::Healthy,
    }
}

fn binding(endpoint: String) -> ProviderBinding {
    ProviderBinding {
        provider_tag: ProviderTag::SelfHosted,
        endpoint,
        api_key: "test-key".to_string(),
        max_concurrent_calls: 8,
        timeout: std::time::Duration::from_secs(5),
        retryable_status_codes: vec![500, 502, 503],
    }
}

fn general_department_policy() -> DepartmentPolicy {
    DepartmentPolicy {
        version: "v1".to_string(),
        description: "test policy".to_string(),
        rules: vec![PolicyRule {
            name: "general_to_fast_cheap".to_string(),
            match_clause: MatchClause {
                task_type: Some(routing_brain::domain::TaskType::General),
                complexity: None,
                risk_max: Some(RiskLevel::Medium),
                capabilities_required: Default::default(),
                department: None,
            },
            action: Action {
                virtual_model: None,
                primary_model: Some("local/fast-model".to_string()),
                fallback_models: vec!["local/backup-model".to_string()],
                model_tier: Tier::FastCheap,
                rationale: "general queries route to the cheap local tier".to_string(),
            },
        }],
        budget: BudgetThresholds {
            downgrade_at_pct: 80.0,
            force_cheap_at_pct: 95.0,
            max_tier: None,
        },
        base_fallback: Action {
            virtual_model: None,
            primary_model: Some("local/backup-model".to_string()),
            fallback_models: vec![],
            model_tier: Tier::Local,
            rationale: "built-in base fallback".to_string(),
        },
    }
}

async fn build_pipeline(server: &MockServer) -> (RoutingPipeline, Arc<InMemoryBudgetStore>) {
    let endpoint = format!("{}/v1/chat/completions", server.uri());

    let mut models = HashMap::new();
    models.insert("local/fast-model".to_string(), model("local/fast-model", Tier::FastCheap));
    models.insert("local/backup-model".to_string(), model("local/backup-model", Tier::Local));

    let mut bindings = HashMap::new();
    bindings.insert("local".to_string(), binding(endpoint));

    let providers = ProviderRegistry::new(models, HashMap::new(), bindings);

    let policy_store = PolicyStore::new();
    policy_store.reload(("acme".to_string(), "engineering".to_string()), general_department_policy());
    let policy_engine = Arc::new(PolicyEngine::new(policy_store, providers.clone()));

    let classifier = Arc::new(Classifier::disabled());
    let executor = Arc::new(Executor::new(providers));
    let sink = Arc::new(InMemorySink::default());
    let recorder = Arc::new(DecisionRecorder::new(vec![sink.clone()]).with_queryable(sink));
    let budget_store = Arc::new(InMemoryBudgetStore::default());

    let pipeline = RoutingPipeline::new(
        classifier,
        policy_engine,
        executor,
        recorder,
        budget_store.clone(),
        32_000,
    );
    (pipeline, budget_store)
}

fn chat_request(content: &str) -> IncomingRequest {
    let identity = Identity::new("acme", "user-1", "engineering");
    let body = ChatCompletionRequest {
        messages: vec![Message::user(content)],
        model: routing_brain::domain::AUTO_MODEL.to_string(),
        stream: false,
        tools: None,
        temperature: None,
        max_tokens: None,
        conversation_id: None,
    };
    IncomingRequest::new(identity, body)
}

#[tokio::test]
async fn routes_general_query_to_policy_selected_model() {
    let server = MockServer::start().await;
    provider_stub(&server, "hi there").await;
    let (pipeline, budget_store) = build_pipeline(&server).await;

    let incoming = chat_request("hello, how are you?");
    let result = pipeline.route(&incoming).await.expect("routing should succeed");

    assert_eq!(result.decision.selected_model, "local/fast-model");
    assert_eq!(result.decision.tier, Tier::FastCheap);
    assert_eq!(result.decision.rule_matched, "general_to_fast_cheap");
    assert!(!result.decision.fallback_used);
    assert!(result.decision.terminal_error.is_none());

    // The mock provider's `usage` object should be threaded all the way
    // through to the audit record, priced against the model's rates.
    assert_eq!(result.decision.token_usage.input_tokens, 12);
    assert_eq!(result.decision.token_usage.output_tokens, 8);
    assert!(result.decision.estimated_cost_usd > Default::default());

    assert_eq!(result.decision.attempts.len(), 1);
    assert!(result.decision.attempts[0].succeeded);
    assert_eq!(result.decision.attempts[0].model_id, "local/fast-model");
    assert_eq!(result.decision.attempts[0].status_code, Some(200));

    // A successful buffered call must post its spend to the BudgetStore.
    let utilization = budget_store
        .utilization_pct(&incoming.identity)
        .await
        .expect("in-memory store always answers");
    assert!(utilization > 0.0);
}

#[tokio::test]
async fn falls_back_to_base_policy_when_no_rule_matches() {
    let server = MockServer::start().await;
    provider_stub(&server, "fallback response").await;
    let (pipeline, _budget_store) = build_pipeline(&server).await;

    // "debug" routes to TaskType::Debugging, which the test policy has no
    // rule for, so the engine should fall through to base_fallback.
    let incoming = chat_request("please debug this stack trace");
    let result = pipeline.route(&incoming).await.expect("routing should succeed");

    assert_eq!(result.decision.selected_model, "local/backup-model");
    assert_eq!(result.decision.tier, Tier::Local);
}

#[tokio::test]
async fn recorder_query_returns_the_decision_it_stored() {
    let server = MockServer::start().await;
    provider_stub(&server, "ok").await;
    let (pipeline, _budget_store) = build_pipeline(&server).await;

    let incoming = chat_request("a routine question");
    let result = pipeline.route(&incoming).await.expect("routing should succeed");

    let sink = Arc::new(InMemorySink::default());
    let recorder = DecisionRecorder::new(vec![sink.clone()]).with_queryable(sink);
    recorder.record(&result.decision).await;

    let filter = AuditLogFilter {
        risk_level: None,
        department: Some("engineering".to_string()),
        audit_required: None,
        page: 0,
        page_size: 50,
    };
    let records = recorder.query(&filter).await.expect("query should succeed");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].request_id, result.decision.request_id);
}

#[tokio::test]
async fn simulate_never_calls_the_provider() {
    let server = MockServer::start().await;
    // Intentionally no mock registered: if `simulate` called the provider
    // it would fail with a connection error, which `simulate` propagates
    // as Err and would fail this test's `.expect`.
    let (pipeline, _budget_store) = build_pipeline(&server).await;

    let incoming = chat_request("hello, how are you?");
    let classification = routing_brain::domain::Classification {
        task_type: routing_brain::domain::TaskType::General,
        complexity: routing_brain::domain::Complexity::Medium,
        required_capabilities: Default::default(),
        confidence: 0.9,
        classifier_source: routing_brain::domain::ClassifierSource::HeuristicFallback,
        department: Some("engineering".to_string()),
        rationale: "synthetic".to_string(),
    };

    let decision = pipeline
        .simulate(&incoming, classification)
        .await
        .expect("simulate should not touch the provider");

    assert_eq!(decision.selected_model, "local/fast-model");
    assert_eq!(decision.token_usage.input_tokens, 0);
    assert_eq!(decision.token_usage.output_tokens, 0);
}
