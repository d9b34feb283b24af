//! HTTP surface (spec §6). Grounded on the teacher's `src.backup/api/server.rs`
//! `ApiServer`/`build_router()`/`axum::serve` shape, narrowed to this
//! crate's endpoint list and swapped onto the routing pipeline instead of
//! cost-ops' ingestion/query endpoints.

pub mod handlers;
pub mod idempotency;
pub mod sse;
pub mod types;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthState, InMemoryApiKeyStore};
use crate::budget::BudgetStore;
use crate::config::RouterConfig;
use crate::observability::{HealthChecker, MetricsRegistry};
use crate::pipeline::RoutingPipeline;
use crate::policy_engine::PolicyEngine;
use crate::providers::ProviderRegistry;
use crate::recorder::DecisionRecorder;
use idempotency::IdempotencyCache;

/// Shared state behind every handler. Holds its own `Arc<PolicyEngine>`
/// and `Arc<DecisionRecorder>` in addition to the pipeline because
/// `RoutingPipeline` does not expose the collaborators it was built with —
/// the `/internal/*` endpoints need direct access the pipeline's public
/// surface doesn't offer.
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<RoutingPipeline>,
    pub policy_engine: Arc<PolicyEngine>,
    pub providers: ProviderRegistry,
    pub budget_store: Arc<dyn BudgetStore>,
    pub recorder: Arc<DecisionRecorder>,
    pub metrics: Arc<MetricsRegistry>,
    pub idempotency: Arc<IdempotencyCache>,
    pub config: Arc<RouterConfig>,
    /// Registered with a `DatabaseHealthCheck`/`CacheHealthCheck` per backing
    /// store that's actually configured (audit Postgres sink, Redis budget
    /// store). `None` when the observability config disables health checks.
    pub health_checker: Option<Arc<HealthChecker>>,
}

/// Builds the full axum router. Authentication middleware wraps every
/// route except `/health`, which must stay reachable for liveness probes
/// even when credentials are rejected (spec §6).
pub fn build_router(state: ApiState, auth_state: AuthState<InMemoryApiKeyStore>) -> Router {
    let authenticated = Router::new()
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/v1/models", get(handlers::list_models))
        .route("/internal/routing/policies", get(handlers::get_policies))
        .route(
            "/internal/routing/policies/reload",
            post(handlers::reload_policies),
        )
        .route("/internal/routing/simulate", post(handlers::simulate))
        .route(
            "/internal/routing/budget/status",
            post(handlers::budget_status),
        )
        .route("/internal/audit/logs", get(handlers::audit_logs))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(authenticated)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
