use axum::{extract::State, http::StatusCode, response::Json};

use crate::services::{HealthCheckStatus, HealthStatus};
use crate::AppState;

/// Liveness plus the store and adapter modes
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthStatus),
        (status = 503, description = "Store unreachable", body = HealthStatus)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let health = state.health_checker.check().await;
    let status = match health.status {
        HealthCheckStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (status, Json(health))
}
