use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kindred_shared::{HealthCheck, HealthResponse, HealthStatus};
use std::sync::Arc;

use crate::AppState;

/// Health check that pings the configured store. Failure causes go to the log, not the response.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let name = format!("store:{}", state.config.store.as_str());
    let check = match state.store.ping().await {
        Ok(()) => HealthCheck::healthy(name),
        Err(e) => {
            tracing::error!(error = %e, check = %name, "store health check failed");
            HealthCheck::unhealthy(name, "store unavailable")
        }
    };

    let response = HealthResponse::healthy("kindred-social", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![check]);

    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
