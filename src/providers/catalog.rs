//! On-disk YAML model catalog loader, mirroring the policy loader's shape
//! (`policy_engine::loader`): not itself spec-load-bearing, but the
//! concrete implementation that makes the crate runnable standalone
//! without a separate model-registry service.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{ConcreteModel, Result, RouterError};

use super::client::ProviderBinding;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    models: Vec<ConcreteModel>,
    #[serde(default)]
    virtual_models: Vec<VirtualModelEntry>,
    #[serde(default)]
    bindings: Vec<BindingEntry>,
}

#[derive(Debug, Deserialize)]
struct VirtualModelEntry {
    id: String,
    preference_list: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BindingEntry {
    /// The namespace segment before `/` in bound models' `model_id`s (e.g.
    /// `"openai"`, `"local"`) — this, not `provider_tag`, is the key
    /// `ProviderRegistry::binding_for` looks up via
    /// `ConcreteModel::provider_tag_key()`. Two namespaces may share a
    /// `provider_tag` category (e.g. two distinct self-hosted clusters)
    /// while needing separate bindings.
    namespace: String,
    provider_tag: String,
    endpoint: String,
    api_key_env: String,
    #[serde(default = "default_max_concurrent")]
    max_concurrent_calls: u32,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
    #[serde(default = "default_retryable_status_codes")]
    retryable_status_codes: Vec<u16>,
}

fn default_max_concurrent() -> u32 {
    32
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_retryable_status_codes() -> Vec<u16> {
    vec![408, 425, 429, 500, 502, 503, 504]
}

pub struct Catalog {
    pub models: HashMap<String, ConcreteModel>,
    pub virtual_models: HashMap<String, Vec<String>>,
    pub bindings: HashMap<String, ProviderBinding>,
}

/// Loads a model catalog from `path` (YAML). `bindings[].namespace` is the
/// key into `ProviderRegistry`'s binding map, matching
/// `ConcreteModel::provider_tag_key()` (the segment of `model_id` before
/// `/`, e.g. `"openai"`, `"local"`).
pub fn load_file(path: &Path) -> Result<Catalog> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| RouterError::Config(format!("reading model catalog {path:?}: {e}")))?;
    parse(&contents)
}

pub fn parse(yaml: &str) -> Result<Catalog> {
    let file: CatalogFile =
        serde_yaml::from_str(yaml).map_err(|e| RouterError::Config(e.to_string()))?;

    let models = file
        .models
        .into_iter()
        .map(|m| (m.model_id.clone(), m))
        .collect();

    let virtual_models = file
        .virtual_models
        .into_iter()
        .map(|v| (v.id, v.preference_list))
        .collect();

    let mut bindings = HashMap::new();
    for entry in file.bindings {
        let api_key = std::env::var(&entry.api_key_env).unwrap_or_default();
        let provider_tag = parse_provider_tag(&entry.provider_tag)?;
        bindings.insert(
            entry.namespace,
            ProviderBinding {
                provider_tag,
                endpoint: entry.endpoint,
                api_key,
                max_concurrent_calls: entry.max_concurrent_calls,
                timeout: Duration::from_millis(entry.timeout_ms),
                retryable_status_codes: entry.retryable_status_codes,
            },
        );
    }

    Ok(Catalog {
        models,
        virtual_models,
        bindings,
    })
}

fn parse_provider_tag(raw: &str) -> Result<crate::domain::ProviderTag> {
    use crate::domain::ProviderTag;
    match raw {
        "direct_commercial" => Ok(ProviderTag::DirectCommercial),
        "compliant_cloud" => Ok(ProviderTag::CompliantCloud),
        "self_hosted" => Ok(ProviderTag::SelfHosted),
        other => Err(RouterError::Config(format!(
            "unknown provider_tag {other:?} in model catalog"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
models:
  - model_id: "local/llama-70b"
    provider_tag: self_hosted
    capabilities: ["general"]
    tier: local
    input_price_per_mtok: "0"
    output_price_per_mtok: "0"
    context_window: 8192
virtual_models:
  - id: "rb://fast_cheap_code"
    preference_list: ["local/llama-70b"]
bindings:
  - namespace: local
    provider_tag: self_hosted
    endpoint: "http://localhost:9000/v1/chat/completions"
    api_key_env: "SELF_HOSTED_API_KEY"
"#;

    #[test]
    fn parses_sample_catalog() {
        let catalog = parse(SAMPLE).unwrap();
        assert_eq!(catalog.models.len(), 1);
        assert_eq!(catalog.virtual_models.len(), 1);
        assert_eq!(catalog.bindings.len(), 1);
    }

    #[test]
    fn rejects_unknown_provider_tag() {
        let bad = SAMPLE.replace("self_hosted", "mystery_tag");
        assert!(parse(&bad).is_err());
    }
}
