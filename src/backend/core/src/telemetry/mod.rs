//! Telemetry: structured logging and Prometheus metrics.
//!
//! # Example
//!
//! ```rust,no_run
//! use panel_core::telemetry::{init_telemetry, LoggingConfig, MetricsConfig};
//!
//! init_telemetry(&LoggingConfig::default(), &MetricsConfig::default(), "production")
//!     .expect("Failed to initialize telemetry");
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, mask_api_key, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, ApiMetrics, HandlerTimer, MetricsConfig, MetricsRegistry, RelationshipOutcome,
};

/// Service name reported in logs and metrics.
pub const SERVICE_NAME: &str = "panel-core";

/// Initialize logging first, then metrics (so metrics setup is logged).
pub fn init_telemetry(
    logging: &LoggingConfig,
    metrics: &MetricsConfig,
    environment: &str,
) -> anyhow::Result<&'static MetricsRegistry> {
    init_logging(logging, environment)?;
    init_metrics(metrics, SERVICE_NAME)
}
