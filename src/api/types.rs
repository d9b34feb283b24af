//! Wire types for the HTTP surface that don't already live in `domain`
//! (spec §6).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{
    Classification, ConcreteModel, HealthState, IncomingRequest, RiskLevel, RoutingDecision, Tier,
};
use crate::policy_engine::PolicyKey;

#[derive(Debug, Serialize)]
pub struct ModelSummary {
    pub model_id: String,
    pub tier: Tier,
    pub provider_tag: String,
    pub capabilities: Vec<String>,
    pub context_window: u32,
}

impl From<&ConcreteModel> for ModelSummary {
    fn from(model: &ConcreteModel) -> Self {
        Self {
            model_id: model.model_id.clone(),
            tier: model.tier,
            provider_tag: format!("{:?}", model.provider_tag),
            capabilities: model.capabilities.iter().cloned().collect(),
            context_window: model.context_window,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VirtualModelSummary {
    pub virtual_id: String,
    pub preference_list: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub concrete: Vec<ModelSummary>,
    pub virtual_models: Vec<VirtualModelSummary>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub providers: HashMap<String, HealthState>,
    pub components: Vec<crate::observability::ComponentHealth>,
}

#[derive(Debug, Serialize)]
pub struct PoliciesResponse {
    /// Keyed by `"{tenant}/{department}"` since JSON object keys can't be tuples.
    pub policies: HashMap<String, crate::domain::DepartmentPolicy>,
}

pub fn policy_key_string(key: &PolicyKey) -> String {
    format!("{}/{}", key.0, key.1)
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub reloaded: usize,
    pub keys: Vec<String>,
}

/// `POST /internal/routing/simulate` (spec §6): runs C2-C4 with a caller
/// supplied synthetic `Classification`, never calling a provider.
#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub tenant_id: String,
    pub user_id: String,
    pub department: String,
    pub messages: Vec<crate::domain::Message>,
    pub classification: Classification,
}

#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub decision: RoutingDecision,
}

#[derive(Debug, Deserialize)]
pub struct BudgetStatusRequest {
    pub tenant_id: String,
    pub user_id: String,
    pub department: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct AuditLogsQuery {
    pub risk_level: Option<RiskLevel>,
    pub department: Option<String>,
    pub audit_required: Option<bool>,
    #[serde(default)]
    pub page: usize,
    pub page_size: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AuditLogsResponse {
    pub page: usize,
    pub page_size: usize,
    pub records: Vec<RoutingDecision>,
}

pub fn incoming_request_from_simulate(req: &SimulateRequest) -> IncomingRequest {
    use crate::domain::{ChatCompletionRequest, Identity, AUTO_MODEL};

    IncomingRequest::new(
        Identity::new(req.tenant_id.clone(), req.user_id.clone(), req.department.clone()),
        ChatCompletionRequest {
            messages: req.messages.clone(),
            model: AUTO_MODEL.to_string(),
            stream: false,
            tools: None,
            temperature: None,
            max_tokens: None,
            conversation_id: None,
        },
    )
}
