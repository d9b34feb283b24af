//! `RouterConfig`: layered configuration (spec SPEC_FULL.md §10.3). Loaded
//! from a TOML file via [`RouterConfig::from_file`] and overridden by
//! `ROUTER_`-prefixed environment variables via [`RouterConfig::from_env`],
//! mirroring the `from_env()`/`from_file()` dual entry point the teacher
//! uses for its other config structs (`AuthConfig`, `ObservabilityConfig`).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::auth::AuthConfig;
use crate::domain::Result;
use crate::observability::config::ObservabilityConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub observability: ObservabilityConfig,
    pub policy_store: PolicyStoreConfig,
    pub budget_store: BudgetStoreConfig,
    pub classifier: ClassifierConfig,
    pub stage_timeouts: StageTimeoutConfig,
    pub audit: AuditConfig,
    /// Registry-side context-window cutoff (tokens) above which a model's
    /// capability set is expected to include `long_context` (spec §9).
    #[serde(default = "default_long_context_threshold")]
    pub long_context_token_threshold: u32,
}

/// Audit sink configuration (spec §4.7): at least the NDJSON file sink is
/// always active; the Postgres sink is opt-in via `database_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_log_path")]
    pub file_path: String,
    pub database_url: Option<String>,
}

fn default_audit_log_path() -> String {
    "./audit.ndjson".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyStoreConfig {
    /// Root directory holding `<tenant>/<department>.yaml` policy files.
    pub directory: String,
    #[serde(default = "default_watch_interval_secs")]
    pub watch_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStoreBackend {
    Redis,
    InMemory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStoreConfig {
    pub backend: BudgetStoreBackend,
    pub redis_url: Option<String>,
    #[serde(default = "default_daily_cap_cents")]
    pub daily_cap_usd_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub endpoint: Option<String>,
    pub api_key_env: Option<String>,
    #[serde(default = "default_classifier_model")]
    pub model: String,
    #[serde(default = "default_classifier_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTimeoutConfig {
    #[serde(default = "default_budget_timeout_ms")]
    pub budget_lookup_ms: u64,
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_call_ms: u64,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_watch_interval_secs() -> u64 {
    30
}
fn default_daily_cap_cents() -> i64 {
    10_000_00
}
fn default_classifier_model() -> String {
    "advisory-classifier".to_string()
}
fn default_classifier_timeout_ms() -> u64 {
    300
}
fn default_budget_timeout_ms() -> u64 {
    50
}
fn default_provider_timeout_ms() -> u64 {
    30_000
}
fn default_long_context_threshold() -> u32 {
    32_000
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: default_bind(),
                port: default_port(),
            },
            auth: AuthConfig::default(),
            observability: ObservabilityConfig::default(),
            policy_store: PolicyStoreConfig {
                directory: "./policies".to_string(),
                watch_interval_secs: default_watch_interval_secs(),
            },
            budget_store: BudgetStoreConfig {
                backend: BudgetStoreBackend::InMemory,
                redis_url: None,
                daily_cap_usd_cents: default_daily_cap_cents(),
            },
            classifier: ClassifierConfig {
                endpoint: None,
                api_key_env: None,
                model: default_classifier_model(),
                timeout_ms: default_classifier_timeout_ms(),
            },
            stage_timeouts: StageTimeoutConfig {
                budget_lookup_ms: default_budget_timeout_ms(),
                provider_call_ms: default_provider_timeout_ms(),
            },
            audit: AuditConfig {
                file_path: default_audit_log_path(),
                database_url: None,
            },
            long_context_token_threshold: default_long_context_threshold(),
        }
    }
}

impl RouterConfig {
    /// Load from a TOML file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| crate::domain::RouterError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Load the default configuration, then apply `ROUTER_*` environment
    /// variable overrides for the fields operators most commonly tune.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ROUTER_BIND") {
            config.server.bind = val;
        }
        if let Ok(val) = std::env::var("ROUTER_PORT") {
            if let Ok(port) = val.parse() {
                config.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("ROUTER_POLICY_DIR") {
            config.policy_store.directory = val;
        }
        if let Ok(val) = std::env::var("ROUTER_POLICY_WATCH_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                config.policy_store.watch_interval_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("ROUTER_REDIS_URL") {
            config.budget_store.backend = BudgetStoreBackend::Redis;
            config.budget_store.redis_url = Some(val);
        }
        if let Ok(val) = std::env::var("ROUTER_DAILY_CAP_USD_CENTS") {
            if let Ok(cap) = val.parse() {
                config.budget_store.daily_cap_usd_cents = cap;
            }
        }
        if let Ok(val) = std::env::var("ROUTER_CLASSIFIER_ENDPOINT") {
            config.classifier.endpoint = Some(val);
        }
        if let Ok(val) = std::env::var("ROUTER_CLASSIFIER_MODEL") {
            config.classifier.model = val;
        }
        if let Ok(val) = std::env::var("ROUTER_LONG_CONTEXT_TOKEN_THRESHOLD") {
            if let Ok(threshold) = val.parse() {
                config.long_context_token_threshold = threshold;
            }
        }
        if let Ok(val) = std::env::var("ROUTER_AUDIT_LOG_PATH") {
            config.audit.file_path = val;
        }
        if let Ok(val) = std::env::var("DATABASE_URL") {
            config.audit.database_url = Some(val);
        }

        config.observability = ObservabilityConfig::from_env();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_in_memory_budget_store() {
        let config = RouterConfig::default();
        assert!(matches!(
            config.budget_store.backend,
            BudgetStoreBackend::InMemory
        ));
        assert_eq!(config.long_context_token_threshold, 32_000);
    }

    #[test]
    #[serial_test::serial]
    fn from_env_overrides_redis_backend() {
        std::env::set_var("ROUTER_REDIS_URL", "redis://localhost:6379");
        let config = RouterConfig::from_env();
        assert!(matches!(config.budget_store.backend, BudgetStoreBackend::Redis));
        assert_eq!(
            config.budget_store.redis_url.as_deref(),
            Some("redis://localhost:6379")
        );
        std::env::remove_var("ROUTER_REDIS_URL");
    }
}
