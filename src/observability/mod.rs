// Observability stack - metrics, tracing, and health checks

pub mod config;
pub mod health;
pub mod metrics;
pub mod tracing;

pub use config::{
    HealthConfig, LogFileConfig, LoggingConfig, LoggingFormat, MetricsConfig,
    ObservabilityConfig, OtlpConfig, TracingConfig, TracingFormat,
};

pub use metrics::{start_timer, MetricsError, MetricsRegistry, Timer};

pub use tracing::{
    create_span_with_context, debug_span_with_context, error_span_with_context,
    extract_trace_context_from_headers, info_span_with_context,
    init_tracing as init_tracing_with_config, inject_trace_context_into_headers,
    trace_span_with_context, warn_span_with_context, CorrelationId, RequestId, TraceContext,
    TraceContextLayer,
};

pub use health::{
    CacheHealthCheck, ComponentHealth, DatabaseHealthCheck, ExternalServiceHealthCheck,
    FunctionHealthCheck, HealthCheck, HealthChecker, HealthStatus, SystemHealth,
};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize basic tracing (used when no `RouterConfig` is available yet,
/// e.g. before config parsing has run).
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize the observability stack with configuration
pub fn init_observability(config: &ObservabilityConfig) -> Result<ObservabilityStack, String> {
    ObservabilityStack::init(config)
}

/// Complete observability stack
pub struct ObservabilityStack {
    pub metrics: Option<MetricsRegistry>,
    pub health: Option<HealthChecker>,
    config: ObservabilityConfig,
}

impl ObservabilityStack {
    pub fn init(config: &ObservabilityConfig) -> Result<Self, String> {
        config.validate()?;

        if config.tracing.enabled {
            tracing::init_tracing(&config.tracing)?;
        }

        let metrics = if config.metrics.enabled {
            Some(
                metrics::MetricsRegistry::new(config.metrics.clone())
                    .map_err(|e| format!("Failed to initialize metrics: {}", e))?,
            )
        } else {
            None
        };

        let health = if config.health.enabled {
            Some(HealthChecker::new(config.health.clone()))
        } else {
            None
        };

        Ok(Self {
            metrics,
            health,
            config: config.clone(),
        })
    }

    pub fn metrics(&self) -> Option<&MetricsRegistry> {
        self.metrics.as_ref()
    }

    pub fn health(&self) -> Option<&HealthChecker> {
        self.health.as_ref()
    }

    pub fn config(&self) -> &ObservabilityConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observability_stack_init() {
        let config = ObservabilityConfig::default();
        let stack = ObservabilityStack::init(&config);
        assert!(stack.is_ok());

        let obs = stack.unwrap();
        assert!(obs.metrics.is_some());
        assert!(obs.health.is_some());
    }

    #[test]
    fn test_observability_stack_disabled() {
        let mut config = ObservabilityConfig::default();
        config.metrics.enabled = false;
        config.health.enabled = false;

        let stack = ObservabilityStack::init(&config).unwrap();
        assert!(stack.metrics.is_none());
        assert!(stack.health.is_none());
    }
}
