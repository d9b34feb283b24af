//! C5: ProviderRegistry — model-to-provider binding, health gating,
//! uniform call interface, normalized streaming (spec §4.5).

pub mod catalog;
pub mod client;
pub mod health;
pub mod streaming;

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{ChatCompletionRequest, ConcreteModel, HealthState, Result, RouterError};

pub use catalog::Catalog;
pub use client::{CallOutcome, ProviderBinding, ProviderClient};
pub use health::HealthMap;
pub use streaming::StreamEvent;

/// Long-lived registry: holds every known concrete model, every virtual
/// model's preference list, provider bindings, HTTP clients, and the
/// health map. Outlives individual requests (spec §3 Lifecycle).
#[derive(Clone)]
pub struct ProviderRegistry {
    models: Arc<HashMap<String, ConcreteModel>>,
    virtual_models: Arc<HashMap<String, Vec<String>>>,
    bindings: Arc<HashMap<String, ProviderBinding>>,
    client: ProviderClient,
    health: HealthMap,
}

impl ProviderRegistry {
    pub fn new(
        models: HashMap<String, ConcreteModel>,
        virtual_models: HashMap<String, Vec<String>>,
        bindings: HashMap<String, ProviderBinding>,
    ) -> Self {
        Self {
            models: Arc::new(models),
            virtual_models: Arc::new(virtual_models),
            bindings: Arc::new(bindings),
            client: ProviderClient::new(),
            health: HealthMap::new(),
        }
    }

    pub fn from_catalog(catalog: Catalog) -> Self {
        Self::new(catalog.models, catalog.virtual_models, catalog.bindings)
    }

    pub fn health_map(&self) -> &HealthMap {
        &self.health
    }

    pub fn model(&self, model_id: &str) -> Option<&ConcreteModel> {
        self.models.get(model_id)
    }

    /// Virtual-model resolution (spec §4.4 step 3): the preference list
    /// for `virtual_id`, or `None` if unknown. Resolved at decision time,
    /// never cached at policy-load time (spec §9).
    pub fn resolve_virtual(&self, virtual_id: &str) -> Option<&[String]> {
        self.virtual_models.get(virtual_id).map(|v| v.as_slice())
    }

    pub fn all_models(&self) -> impl Iterator<Item = &ConcreteModel> {
        self.models.values()
    }

    pub fn all_virtual_models(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.virtual_models.iter()
    }

    fn binding_for(&self, model: &ConcreteModel) -> Result<&ProviderBinding> {
        let key = model.provider_tag_key();
        self.bindings
            .get(&key)
            .ok_or_else(|| RouterError::Internal(format!("no provider binding for tag {key}")))
    }

    /// `health(provider_tag)` (spec §4.5).
    pub fn health(&self, model_id: &str) -> HealthState {
        match self.models.get(model_id) {
            Some(model) => self.health.health(&model.provider_tag_key()),
            None => HealthState::Healthy,
        }
    }

    /// `call(model_id, normalized_request)` (spec §4.5). Updates the
    /// health map from the outcome: consecutive transient failures
    /// escalate Healthy -> Degraded -> Failing; any success resets.
    pub async fn call(
        &self,
        model_id: &str,
        request: &ChatCompletionRequest,
    ) -> Result<CallOutcome> {
        let model = self
            .models
            .get(model_id)
            .ok_or_else(|| RouterError::Internal(format!("unknown model {model_id}")))?;
        let binding = self.binding_for(model)?;
        let provider_key = model.provider_tag_key();

        match self.client.call(binding, model_id, request).await {
            Ok(outcome) => {
                self.health.record_success(&provider_key);
                Ok(outcome)
            }
            Err(err @ RouterError::ProviderStatus { retryable: true, .. })
            | Err(err @ RouterError::Http(_)) => {
                self.health.record_failure(&provider_key);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

impl ConcreteModel {
    /// The key this model's provider binding is registered under. Kept
    /// separate from `provider_tag` because two providers can share a
    /// tag (e.g. two self-hosted clusters) while needing distinct
    /// endpoints/credentials; the binding key is the model's declared
    /// provider namespace (the segment before `/` in `model_id`).
    pub fn provider_tag_key(&self) -> String {
        self.model_id
            .split_once('/')
            .map(|(ns, _)| ns.to_string())
            .unwrap_or_else(|| self.model_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProviderTag, Tier};
    use std::collections::BTreeSet;

    fn sample_model() -> ConcreteModel {
        ConcreteModel {
            model_id: "openai/gpt-4o-mini".to_string(),
            provider_tag: ProviderTag::DirectCommercial,
            capabilities: BTreeSet::new(),
            tier: Tier::FastCheap,
            input_price_per_mtok: Default::default(),
            output_price_per_mtok: Default::default(),
            context_window: 128_000,
            health: crate::domain::HealthState::Healthy,
        }
    }

    #[test]
    fn provider_key_is_namespace_segment() {
        assert_eq!(sample_model().provider_tag_key(), "openai");
    }

    #[test]
    fn unknown_virtual_model_resolves_to_none() {
        let registry = ProviderRegistry::new(HashMap::new(), HashMap::new(), HashMap::new());
        assert!(registry.resolve_virtual("rb://missing").is_none());
    }
}
