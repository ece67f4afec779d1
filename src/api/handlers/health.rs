//! Health check handlers
//!
//! Liveness, readiness with per-component status, and metrics export.

use std::time::Instant;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

/// Response for the basic health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall health status
    pub status: HealthStatus,
    /// Service name
    pub service: &'static str,
    /// Service version
    pub version: &'static str,
    /// Timestamp of health check
    pub timestamp: String,
}

/// Response for the readiness endpoint
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: HealthStatus,
    pub components: Vec<ComponentStatus>,
}

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All components healthy
    Healthy,
    /// Some components degraded but operational
    Degraded,
    /// Critical components unhealthy
    Unhealthy,
}

impl HealthStatus {
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy)
    }
}

/// Individual component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    /// Component name
    pub name: String,
    /// Health status
    pub status: HealthStatus,
    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

/// GET / - Banner.
pub async fn root() -> &'static str {
    "gm gm! api is running"
}

/// Basic health check endpoint.
///
/// Returns without touching any dependency. Use this for liveness probes.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        service: "view-proof-service",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Readiness check endpoint.
///
/// Fails with 503 when the store is unreachable. A missing ZK prover only
/// degrades the service since the fallback stages still answer.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let start = Instant::now();
    let store = match state.view_store.ping().await {
        Ok(()) => ComponentStatus {
            name: "store".to_string(),
            status: HealthStatus::Healthy,
            message: None,
            response_time_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(e) => ComponentStatus {
            name: "store".to_string(),
            status: HealthStatus::Unhealthy,
            message: Some(format!("Store unavailable: {}", e)),
            response_time_ms: None,
        },
    };

    let prover = if state.generator.has_prover() {
        ComponentStatus {
            name: "zk_prover".to_string(),
            status: HealthStatus::Healthy,
            message: None,
            response_time_ms: None,
        }
    } else {
        ComponentStatus {
            name: "zk_prover".to_string(),
            status: HealthStatus::Degraded,
            message: Some("ZK_PROVER_URL not set; using direct verification".to_string()),
            response_time_ms: None,
        }
    };

    let components = vec![store, prover];
    let status = determine_overall_status(&components);
    let code = if status.is_unhealthy() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (code, Json(ReadinessResponse { status, components }))
}

/// GET /metrics - Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}

/// Worst component status wins.
fn determine_overall_status(components: &[ComponentStatus]) -> HealthStatus {
    if components.iter().any(|c| c.status.is_unhealthy()) {
        return HealthStatus::Unhealthy;
    }
    if components
        .iter()
        .any(|c| matches!(c.status, HealthStatus::Degraded))
    {
        return HealthStatus::Degraded;
    }
    HealthStatus::Healthy
}
