//! Operational handlers.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use tracing::warn;

use super::AppState;
use crate::error::PanelError;
use crate::telemetry::MetricsRegistry;

// ═══════════════════════════════════════════════════════════════════════════════
// Health Check
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, code, repository) = match state.repository.ping().await {
        Ok(()) => ("healthy", StatusCode::OK, "ok"),
        Err(error) => {
            warn!(error = %error, "Repository health check failed");
            ("unhealthy", StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    (
        code,
        Json(serde_json::json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "checks": { "repository": repository },
        })),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Metrics
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn prometheus_metrics() -> impl IntoResponse {
    let body = MetricsRegistry::global().render();

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Unknown routes render the standard 404 body.
pub async fn not_found() -> PanelError {
    PanelError::not_found("route", "unknown")
}
