//! Handlers for every endpoint in spec §6.

use axum::extract::{Extension, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::AuthContext;
use crate::domain::{
    ChatCompletionRequest, Identity, IncomingRequest, Result, RouterError,
};
use crate::executor::ExecutorBody;

use super::idempotency::fingerprint;
use super::sse::{streamed_response, StreamAudit};
use super::types::{
    incoming_request_from_simulate, policy_key_string, AuditLogsQuery, AuditLogsResponse,
    BudgetStatusRequest, HealthResponse, ModelSummary, ModelsResponse, PoliciesResponse,
    ReloadResponse, SimulateRequest, SimulateResponse, VirtualModelSummary,
};
use super::ApiState;

/// Resolves the caller's routing identity. When auth is enabled,
/// `AuthContext` (inserted by the auth middleware) is authoritative. When
/// auth is disabled — local/dev mode — identity falls back to the three
/// extension headers described in spec §10.5.
fn resolve_identity(headers: &HeaderMap, auth: Option<&AuthContext>) -> Result<Identity> {
    if let Some(ctx) = auth {
        return Ok(ctx.identity.clone());
    }

    let tenant_id = headers
        .get("x-tenant-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| RouterError::Unauthorized("missing X-Tenant-Id".to_string()))?;
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| RouterError::Unauthorized("missing X-User-Id".to_string()))?;
    let department = headers
        .get("x-department")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| RouterError::Unauthorized("missing X-Department".to_string()))?;

    Ok(Identity::new(tenant_id, user_id, department))
}

fn decision_headers(decision: &crate::domain::RoutingDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let insert = |headers: &mut HeaderMap, name: &'static str, value: String| {
        if let Ok(v) = value.parse() {
            headers.insert(name, v);
        }
    };
    insert(&mut headers, "x-request-id", decision.request_id.to_string());
    insert(&mut headers, "x-routing-model", decision.selected_model.clone());
    insert(&mut headers, "x-routing-provider", decision.provider.clone());
    insert(&mut headers, "x-task-type", format!("{:?}", decision.classification.task_type));
    insert(&mut headers, "x-complexity", format!("{:?}", decision.classification.complexity));
    insert(&mut headers, "x-risk-level", format!("{:?}", decision.risk_assessment.level));
    insert(
        &mut headers,
        "x-audit-required",
        decision.risk_assessment.audit_required.to_string(),
    );
    headers
}

/// `POST /v1/chat/completions` (spec §6) — the only caller-facing
/// endpoint. Dual mode: buffered JSON or SSE, selected by `body.stream`.
pub async fn chat_completions(
    State(state): State<ApiState>,
    headers: HeaderMap,
    auth: Option<Extension<AuthContext>>,
    Json(body): Json<ChatCompletionRequest>,
) -> Response {
    let identity = match resolve_identity(&headers, auth.as_ref().map(|e| &e.0)) {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    let idempotency_key = headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    if let (Some(key), false) = (&idempotency_key, body.stream) {
        let fp = fingerprint(&body);
        if let Some(cached) = state.idempotency.get(&identity.tenant_id, key, fp) {
            return Json(cached).into_response();
        }
    }

    let mut incoming = IncomingRequest::new(identity.clone(), body);
    incoming.idempotency_key = idempotency_key.clone();
    let stream_requested = incoming.body.stream;

    match state.pipeline.route(&incoming).await {
        Ok(route_result) => {
            let mut headers = decision_headers(&route_result.decision);
            match route_result.body {
                ExecutorBody::Buffered(value) => {
                    if let (Some(key), false) = (&idempotency_key, stream_requested) {
                        let fp = fingerprint(&incoming.body);
                        state.idempotency.put(&identity.tenant_id, key, fp, value.clone());
                    }
                    (headers, Json(value)).into_response()
                }
                ExecutorBody::Stream(events) => {
                    let pricing = state
                        .providers
                        .model(&route_result.decision.selected_model)
                        .map(|m| (m.input_price_per_mtok, m.output_price_per_mtok));
                    let audit = StreamAudit {
                        recorder: state.recorder.clone(),
                        budget_store: state.budget_store.clone(),
                        identity,
                        pricing,
                    };
                    let sse = streamed_response(route_result.decision, audit, events);
                    let mut response = sse.into_response();
                    response.headers_mut().extend(headers.drain());
                    response
                }
            }
        }
        Err(err) => err.into_response_with_request_id(incoming.request_id),
    }
}

/// `GET /v1/models` (spec §6).
pub async fn list_models(State(state): State<ApiState>) -> Json<ModelsResponse> {
    let concrete = state.providers.all_models().map(ModelSummary::from).collect();
    let virtual_models = state
        .providers
        .all_virtual_models()
        .map(|(id, list)| VirtualModelSummary {
            virtual_id: id.clone(),
            preference_list: list.clone(),
        })
        .collect();
    Json(ModelsResponse { concrete, virtual_models })
}

/// `GET /health` (spec §6). Merges provider health (always present) with the
/// backing-store component checks registered in `main.rs`, when
/// observability health checks are enabled.
pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let providers: HashMap<String, crate::domain::HealthState> =
        state.providers.health_map().snapshot().into_iter().collect();

    let (status, components) = match &state.health_checker {
        Some(checker) => {
            let system = checker.check_health().await;
            let status = if system.status == crate::observability::HealthStatus::Unhealthy {
                "unhealthy"
            } else {
                "ok"
            };
            (status, system.components)
        }
        None => ("ok", Vec::new()),
    };

    Json(HealthResponse { status, providers, components })
}

/// `GET /internal/routing/policies` (spec §6).
pub async fn get_policies(State(state): State<ApiState>) -> Json<PoliciesResponse> {
    let policies = state
        .policy_engine
        .policy_store()
        .all_snapshots()
        .into_iter()
        .map(|(key, snapshot)| (policy_key_string(&key), (*snapshot).clone()))
        .collect();
    Json(PoliciesResponse { policies })
}

/// `POST /internal/routing/policies/reload` (spec §6): re-reads the
/// configured policy directory and atomically swaps every snapshot.
pub async fn reload_policies(State(state): State<ApiState>) -> Response {
    let root = std::path::Path::new(&state.config.policy_store.directory);

    match crate::policy_engine::loader::load_directory(root) {
        Ok(loaded) => {
            let keys: Vec<String> = loaded
                .iter()
                .map(|(key, _)| policy_key_string(key))
                .collect();
            for (key, policy) in loaded.iter() {
                state.policy_engine.policy_store().reload(key.clone(), policy.clone());
            }
            Json(ReloadResponse { reloaded: keys.len(), keys }).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// `POST /internal/routing/simulate` (spec §6): runs C2-C4 only.
pub async fn simulate(
    State(state): State<ApiState>,
    Json(request): Json<SimulateRequest>,
) -> Response {
    let incoming = incoming_request_from_simulate(&request);
    match state.pipeline.simulate(&incoming, request.classification).await {
        Ok(decision) => Json(SimulateResponse { decision }).into_response(),
        Err(err) => err.into_response_with_request_id(incoming.request_id),
    }
}

/// `POST /internal/routing/budget/status` (spec §6).
pub async fn budget_status(
    State(state): State<ApiState>,
    Json(request): Json<BudgetStatusRequest>,
) -> Json<crate::budget::BudgetStatus> {
    let identity = Identity::new(request.tenant_id, request.user_id, request.department);
    let utilization_pct = crate::budget::utilization_with_timeout(state.budget_store.as_ref(), &identity).await;
    Json(crate::budget::BudgetStatus {
        tenant_id: identity.tenant_id,
        user_id: identity.user_id,
        department: identity.department,
        utilization_pct,
    })
}

/// `GET /internal/audit/logs` (spec §6).
pub async fn audit_logs(
    State(state): State<ApiState>,
    Query(query): Query<AuditLogsQuery>,
) -> Response {
    let page_size = query.page_size.unwrap_or(50).clamp(1, 500);
    let filter = crate::recorder::AuditLogFilter {
        risk_level: query.risk_level,
        department: query.department.clone(),
        audit_required: query.audit_required,
        page: query.page,
        page_size,
    };

    match state.recorder.query(&filter).await {
        Ok(records) => Json(AuditLogsResponse { page: query.page, page_size, records }).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}

pub type SharedApiState = Arc<ApiState>;
