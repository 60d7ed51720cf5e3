//! Prometheus metrics for API responses, authentication and relationship loading.
//!
//! # Example
//!
//! ```rust,no_run
//! use panel_core::telemetry::metrics::{ApiMetrics, RelationshipOutcome};
//!
//! ApiMetrics::record_response("location", "view", 200);
//! ApiMetrics::record_relationship("location", "nodes", RelationshipOutcome::Denied);
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Instant;

/// Global metrics registry.
static METRICS_REGISTRY: OnceLock<MetricsRegistry> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,

    /// Histogram buckets for request durations (in seconds)
    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,

    /// Global labels to add to all metrics
    #[serde(default)]
    pub global_labels: HashMap<String, String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            duration_buckets: default_duration_buckets(),
            global_labels: HashMap::new(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_duration_buckets() -> Vec<f64> {
    vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
}

/// Central metrics registry.
pub struct MetricsRegistry {
    prometheus_handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("prometheus_handle", &self.prometheus_handle.is_some())
            .finish()
    }
}

impl MetricsRegistry {
    /// Get the global metrics registry.
    ///
    /// Before `init_metrics` runs (and in tests) this is an empty registry
    /// that renders nothing.
    pub fn global() -> &'static MetricsRegistry {
        METRICS_REGISTRY.get_or_init(|| MetricsRegistry {
            prometheus_handle: None,
        })
    }

    /// Whether a recorder is installed.
    pub fn is_enabled(&self) -> bool {
        self.prometheus_handle.is_some()
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.prometheus_handle
            .as_ref()
            .map(|h| h.render())
            .unwrap_or_default()
    }
}

/// Install the Prometheus recorder and publish it as the global registry.
pub fn init_metrics(config: &MetricsConfig, service_name: &str) -> anyhow::Result<&'static MetricsRegistry> {
    if !config.enabled {
        tracing::info!(service_name = %service_name, "Metrics disabled");
        return Ok(MetricsRegistry::global());
    }

    let mut builder = PrometheusBuilder::new();

    for (key, value) in &config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    builder = builder.set_buckets(&config.duration_buckets)?;

    let handle = builder.install_recorder()?;

    register_metric_descriptions();

    if METRICS_REGISTRY
        .set(MetricsRegistry {
            prometheus_handle: Some(handle),
        })
        .is_err()
    {
        anyhow::bail!("metrics registry already initialized");
    }

    tracing::info!(service_name = %service_name, "Metrics initialized");

    Ok(MetricsRegistry::global())
}

fn register_metric_descriptions() {
    describe_counter!(
        "panel_api_responses_total",
        "Application API responses by resource, action and status"
    );
    describe_histogram!(
        "panel_api_response_duration_seconds",
        "Application API handler duration in seconds"
    );
    describe_counter!("panel_errors_total", "Errors rendered to clients by code");
    describe_counter!(
        "panel_auth_failures_total",
        "Rejected Application API authentication attempts"
    );
    describe_counter!(
        "panel_relationships_total",
        "Requested relationships by outcome (loaded, denied)"
    );
}

/// How a requested relationship was rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipOutcome {
    Loaded,
    Denied,
}

impl RelationshipOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Denied => "denied",
        }
    }
}

/// Application API counters.
pub struct ApiMetrics;

impl ApiMetrics {
    /// Count a rendered response.
    pub fn record_response(resource: &'static str, action: &'static str, status: u16) {
        counter!(
            "panel_api_responses_total",
            "resource" => resource,
            "action" => action,
            "status" => status.to_string(),
        )
        .increment(1);
    }

    /// Count a requested relationship.
    pub fn record_relationship(
        resource: &'static str,
        relationship: &'static str,
        outcome: RelationshipOutcome,
    ) {
        counter!(
            "panel_relationships_total",
            "resource" => resource,
            "relationship" => relationship,
            "outcome" => outcome.as_str(),
        )
        .increment(1);
    }

    /// Count a rejected authentication attempt.
    pub fn record_auth_failure(reason: &'static str) {
        counter!("panel_auth_failures_total", "reason" => reason).increment(1);
    }

    /// Start timing a handler.
    pub fn start(resource: &'static str, action: &'static str) -> HandlerTimer {
        HandlerTimer {
            resource,
            action,
            start: Instant::now(),
        }
    }
}

/// Records handler duration when finished.
pub struct HandlerTimer {
    resource: &'static str,
    action: &'static str,
    start: Instant,
}

impl HandlerTimer {
    /// Record the elapsed time and the response status.
    pub fn finish(self, status: u16) {
        let elapsed = self.start.elapsed().as_secs_f64();
        histogram!(
            "panel_api_response_duration_seconds",
            "resource" => self.resource,
            "action" => self.action,
        )
        .record(elapsed);
        ApiMetrics::record_response(self.resource, self.action, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_config_defaults() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert!(!config.duration_buckets.is_empty());
    }

    #[test]
    fn test_global_registry_without_recorder_renders_empty() {
        let registry = MetricsRegistry::global();
        if !registry.is_enabled() {
            assert!(registry.render().is_empty());
        }
    }

    #[test]
    fn test_handler_timer_without_recorder() {
        let timer = ApiMetrics::start("location", "index");
        timer.finish(200);
        ApiMetrics::record_relationship("location", "nodes", RelationshipOutcome::Denied);
    }

    #[test]
    fn test_relationship_outcome_labels() {
        assert_eq!(RelationshipOutcome::Loaded.as_str(), "loaded");
        assert_eq!(RelationshipOutcome::Denied.as_str(), "denied");
    }
}
