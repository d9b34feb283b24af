// Prometheus metrics for the routing proxy (spec §10.1)

use prometheus::{
    Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::config::MetricsConfig;

const NAMESPACE: &str = "routing_brain";

/// Error type for metrics operations
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    RegistrationError(String),

    #[error("Failed to export metrics: {0}")]
    ExportError(String),
}

/// Global metrics registry
pub struct MetricsRegistry {
    registry: Arc<Registry>,
    config: MetricsConfig,

    // HTTP surface (spec §6)
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,

    // Routing decisions (spec §4.4, §4.7)
    pub routing_decisions_total: IntCounterVec,
    pub routing_stage_duration_seconds: HistogramVec,
    pub routing_fallback_used_total: IntCounterVec,
    pub routing_governance_blocked_total: IntCounterVec,

    // Provider execution (spec §4.6)
    pub provider_calls_total: IntCounterVec,
    pub provider_call_duration_seconds: HistogramVec,
    pub provider_health_state: IntGaugeVec,

    // Budget (spec §5 BudgetStore)
    pub budget_utilization_pct: GaugeVec,
    pub budget_lookup_timeouts_total: IntCounter,

    // Policy store (spec §9 hot reload)
    pub policy_reloads_total: IntCounterVec,
    pub policy_snapshot_count: IntGauge,

    // Audit (spec §4.7)
    pub audit_sink_errors_total: IntCounterVec,

    // Authentication
    pub auth_attempts_total: IntCounterVec,
    pub auth_failures_total: IntCounterVec,

    // System
    pub uptime_seconds: Gauge,
    pub build_info: IntCounterVec,
}

impl MetricsRegistry {
    /// Create a new metrics registry
    pub fn new(config: MetricsConfig) -> Result<Self, MetricsError> {
        let registry = Registry::new();

        macro_rules! register_counter_vec {
            ($name:expr, $help:expr, $labels:expr) => {{
                let m = IntCounterVec::new(Opts::new($name, $help).namespace(NAMESPACE), $labels)
                    .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
                registry
                    .register(Box::new(m.clone()))
                    .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
                m
            }};
        }

        macro_rules! register_histogram_vec {
            ($name:expr, $help:expr, $labels:expr, $buckets:expr) => {{
                let m = HistogramVec::new(
                    HistogramOpts::new($name, $help)
                        .namespace(NAMESPACE)
                        .buckets($buckets),
                    $labels,
                )
                .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
                registry
                    .register(Box::new(m.clone()))
                    .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
                m
            }};
        }

        macro_rules! register_gauge_vec {
            ($name:expr, $help:expr, $labels:expr) => {{
                let m = GaugeVec::new(Opts::new($name, $help).namespace(NAMESPACE), $labels)
                    .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
                registry
                    .register(Box::new(m.clone()))
                    .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
                m
            }};
        }

        macro_rules! register_int_gauge_vec {
            ($name:expr, $help:expr, $labels:expr) => {{
                let m = IntGaugeVec::new(Opts::new($name, $help).namespace(NAMESPACE), $labels)
                    .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
                registry
                    .register(Box::new(m.clone()))
                    .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
                m
            }};
        }

        let http_requests_total = register_counter_vec!(
            "http_requests_total",
            "Total HTTP requests",
            &["method", "path", "status"]
        );
        let http_request_duration_seconds = register_histogram_vec!(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            &["method", "path"],
            config.latency_buckets.clone()
        );

        let routing_decisions_total = register_counter_vec!(
            "routing_decisions_total",
            "Total routing decisions by tier and department",
            &["tier", "department", "rule_matched"]
        );
        let routing_stage_duration_seconds = register_histogram_vec!(
            "routing_stage_duration_seconds",
            "Duration of each pipeline stage in seconds",
            &["stage"],
            config.latency_buckets.clone()
        );
        let routing_fallback_used_total = register_counter_vec!(
            "routing_fallback_used_total",
            "Total requests that used a fallback model",
            &["department"]
        );
        let routing_governance_blocked_total = register_counter_vec!(
            "routing_governance_blocked_total",
            "Total requests blocked by risk/governance gating",
            &["risk_level"]
        );

        let provider_calls_total = register_counter_vec!(
            "provider_calls_total",
            "Total provider call attempts",
            &["provider", "model", "outcome"]
        );
        let provider_call_duration_seconds = register_histogram_vec!(
            "provider_call_duration_seconds",
            "Provider call duration in seconds",
            &["provider", "model"],
            config.latency_buckets.clone()
        );
        let provider_health_state = register_int_gauge_vec!(
            "provider_health_state",
            "Provider health: 0=healthy 1=degraded 2=failing",
            &["model"]
        );

        let budget_utilization_pct = register_gauge_vec!(
            "budget_utilization_pct",
            "Current budget utilization percentage",
            &["tenant", "department"]
        );
        let budget_lookup_timeouts_total = IntCounter::new(
            "routing_brain_budget_lookup_timeouts_total",
            "Total budget store lookups that exceeded the timeout",
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(budget_lookup_timeouts_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let policy_reloads_total = register_counter_vec!(
            "policy_reloads_total",
            "Total policy reload attempts",
            &["tenant", "department", "status"]
        );
        let policy_snapshot_count = IntGauge::new(
            "routing_brain_policy_snapshot_count",
            "Number of (tenant, department) policy snapshots currently loaded",
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(policy_snapshot_count.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let audit_sink_errors_total = register_counter_vec!(
            "audit_sink_errors_total",
            "Total audit sink write failures",
            &["sink"]
        );

        let auth_attempts_total = register_counter_vec!(
            "auth_attempts_total",
            "Total authentication attempts",
            &["method", "status"]
        );
        let auth_failures_total = register_counter_vec!(
            "auth_failures_total",
            "Total authentication failures",
            &["method", "reason"]
        );

        let uptime_seconds = Gauge::new(
            "routing_brain_uptime_seconds",
            "System uptime in seconds",
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(uptime_seconds.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let build_info = register_counter_vec!(
            "build_info",
            "Build information",
            &["version", "rustc_version"]
        );
        build_info
            .with_label_values(&[env!("CARGO_PKG_VERSION"), "unknown"])
            .inc();

        if config.include_process_metrics {
            let process_collector = prometheus::process_collector::ProcessCollector::for_self();
            registry
                .register(Box::new(process_collector))
                .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        }

        Ok(Self {
            registry: Arc::new(registry),
            config,
            http_requests_total,
            http_request_duration_seconds,
            routing_decisions_total,
            routing_stage_duration_seconds,
            routing_fallback_used_total,
            routing_governance_blocked_total,
            provider_calls_total,
            provider_call_duration_seconds,
            provider_health_state,
            budget_utilization_pct,
            budget_lookup_timeouts_total,
            policy_reloads_total,
            policy_snapshot_count,
            audit_sink_errors_total,
            auth_attempts_total,
            auth_failures_total,
            uptime_seconds,
            build_info,
        })
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::ExportError(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::ExportError(e.to_string()))
    }

    /// Get the underlying registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }
}

use prometheus::IntGaugeVec;

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    histogram: Histogram,
}

impl Timer {
    pub fn new(histogram: Histogram) -> Self {
        Self {
            start: Instant::now(),
            histogram,
        }
    }

    pub fn observe_duration(self) -> Duration {
        let duration = self.start.elapsed();
        self.histogram.observe(duration.as_secs_f64());
        duration
    }
}

pub fn start_timer(histogram: &Histogram) -> Timer {
    Timer::new(histogram.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registry_creation() {
        let config = MetricsConfig::default();
        let registry = MetricsRegistry::new(config);
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_export() {
        let config = MetricsConfig::default();
        let registry = MetricsRegistry::new(config).unwrap();

        registry
            .http_requests_total
            .with_label_values(&["POST", "/v1/chat/completions", "200"])
            .inc();

        let exported = registry.export().unwrap();
        assert!(exported.contains("routing_brain_http_requests_total"));
    }

    #[test]
    fn test_routing_decision_metrics() {
        let config = MetricsConfig::default();
        let registry = MetricsRegistry::new(config).unwrap();

        registry
            .routing_decisions_total
            .with_label_values(&["balanced", "eng", "code_review_rule"])
            .inc();

        registry
            .routing_fallback_used_total
            .with_label_values(&["eng"])
            .inc();

        let exported = registry.export().unwrap();
        assert!(exported.contains("routing_brain_routing_decisions_total"));
        assert!(exported.contains("routing_brain_routing_fallback_used_total"));
    }

    #[test]
    fn test_budget_metrics() {
        let config = MetricsConfig::default();
        let registry = MetricsRegistry::new(config).unwrap();

        registry
            .budget_utilization_pct
            .with_label_values(&["tenant-1", "eng"])
            .set(42.5);

        let exported = registry.export().unwrap();
        assert!(exported.contains("routing_brain_budget_utilization_pct"));
    }

    #[test]
    fn test_timer() {
        let config = MetricsConfig::default();
        let registry = MetricsRegistry::new(config).unwrap();

        let histogram = registry
            .http_request_duration_seconds
            .with_label_values(&["GET", "/health"]);

        let timer = start_timer(&histogram);
        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.observe_duration();

        assert!(duration.as_millis() >= 10);
    }

    #[test]
    fn test_auth_metrics() {
        let config = MetricsConfig::default();
        let registry = MetricsRegistry::new(config).unwrap();

        registry
            .auth_attempts_total
            .with_label_values(&["jwt", "success"])
            .inc();

        registry
            .auth_failures_total
            .with_label_values(&["api_key", "invalid"])
            .inc();

        let exported = registry.export().unwrap();
        assert!(exported.contains("routing_brain_auth_attempts_total"));
    }
}
