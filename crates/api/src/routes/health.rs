//! Liveness endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::context::AppContext;

#[derive(Serialize)]
pub struct HealthReport {
    status: &'static str,
}

/// GET /health - Database reachability probe
pub async fn health(State(ctx): State<Arc<AppContext>>) -> (StatusCode, Json<HealthReport>) {
    match ctx.health_check().await {
        Ok(()) => (StatusCode::OK, Json(HealthReport { status: "ok" })),
        Err(error) => {
            warn!(%error, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthReport { status: "degraded" }))
        }
    }
}
