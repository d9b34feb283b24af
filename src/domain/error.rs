//! Error taxonomy for the routing core (spec.md §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, RouterError>;

/// Top-level error type for the routing pipeline and its collaborators.
///
/// Variant-to-HTTP mapping follows the taxonomy in spec §7. Note that
/// several "errors" here (e.g. `ClassifierDegraded`, `BudgetUnknown`) are
/// not surfaced to callers at all — they are recorded as constraints and
/// the pipeline proceeds. Only the terminal variants implement
/// `IntoResponse`.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The risk gate stripped every candidate model. Terminal, policy boundary.
    #[error("request blocked by governance policy: {reason}")]
    GovernanceBlocked { reason: String },

    /// No policy rule and no base fallback matched.
    #[error("no policy rule matched and no emergency default is configured")]
    NoRuleMatched,

    /// Every provider in the fallback chain failed.
    #[error("all providers in the fallback chain failed")]
    AllProvidersFailed { attempts: usize },

    /// The client disconnected mid-flight.
    #[error("client cancelled the request")]
    ClientCancelled,

    /// A provider returned a semantic refusal; pass through verbatim.
    #[error("upstream refusal: {message}")]
    UpstreamRefusal { message: String, raw: serde_json::Value },

    /// A provider call returned a non-2xx status. `retryable` reflects
    /// whether the status is in the provider binding's retryable set
    /// (spec §4.6); the Executor uses this to decide fallback.
    #[error("provider returned status {status}: {body}")]
    ProviderStatus {
        status: u16,
        retryable: bool,
        body: String,
    },

    /// Policy could not be loaded at ingress; routing cannot proceed.
    #[error("policy load failed: {0}")]
    PolicyLoadFailed(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("authentication failed: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
    governance_blocked: bool,
    /// Present whenever the error is raised after an `IncomingRequest`
    /// exists, so the client can correlate the response with its audit
    /// record (spec §7, SPEC_FULL.md §10.2).
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<Uuid>,
}

impl RouterError {
    fn code(&self) -> &'static str {
        match self {
            RouterError::GovernanceBlocked { .. } => "governance_blocked",
            RouterError::NoRuleMatched => "no_rule_matched",
            RouterError::AllProvidersFailed { .. } => "all_providers_failed",
            RouterError::ClientCancelled => "client_cancelled",
            RouterError::UpstreamRefusal { .. } => "upstream_refusal",
            RouterError::ProviderStatus { .. } => "provider_status",
            RouterError::PolicyLoadFailed(_) => "policy_load_failed",
            RouterError::InvalidRequest(_) => "invalid_request",
            RouterError::Unauthorized(_) => "unauthorized",
            RouterError::NotFound(_) => "not_found",
            RouterError::Config(_) => "config_error",
            RouterError::Serde(_) | RouterError::Yaml(_) => "serialization_error",
            RouterError::Io(_) => "io_error",
            RouterError::Http(_) => "upstream_http_error",
            RouterError::Database(_) => "database_error",
            RouterError::Redis(_) => "budget_store_error",
            RouterError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            // HTTP 451-equivalent: there is no literal `StatusCode::451` const
            // pre-stable, so we use the numeric constructor.
            RouterError::GovernanceBlocked { .. } => {
                StatusCode::from_u16(451).unwrap_or(StatusCode::FORBIDDEN)
            }
            RouterError::NoRuleMatched => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::AllProvidersFailed { .. } => StatusCode::BAD_GATEWAY,
            RouterError::ClientCancelled => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::UpstreamRefusal { .. } => StatusCode::OK,
            RouterError::ProviderStatus { .. } => StatusCode::BAD_GATEWAY,
            RouterError::PolicyLoadFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            RouterError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RouterError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            RouterError::NotFound(_) => StatusCode::NOT_FOUND,
            RouterError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::Serde(_) | RouterError::Yaml(_) => StatusCode::BAD_REQUEST,
            RouterError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::Http(_) => StatusCode::BAD_GATEWAY,
            RouterError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::Redis(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Process exit code for startup-time failures (spec §6 Exit codes).
    pub fn exit_code(&self) -> i32 {
        match self {
            RouterError::Config(_) => 2,
            RouterError::PolicyLoadFailed(_) => 64,
            _ => 1,
        }
    }
}

impl RouterError {
    /// Use at call sites that have an `IncomingRequest` in scope so the
    /// client-visible error envelope carries the request id (spec §7).
    pub fn into_response_with_request_id(self, request_id: Uuid) -> Response {
        self.into_response_inner(Some(request_id))
    }

    fn into_response_inner(self, request_id: Option<Uuid>) -> Response {
        if let RouterError::UpstreamRefusal { raw, .. } = &self {
            return (StatusCode::OK, Json(raw.clone())).into_response();
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
                governance_blocked: matches!(self, RouterError::GovernanceBlocked { .. }),
                request_id,
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        self.into_response_inner(None)
    }
}
