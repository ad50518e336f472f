//! WhatsApp instance lifecycle endpoints.

use std::sync::Arc;

use agendapro_domain::{AgendaError, MessagingInstance};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::context::AppContext;
use crate::routes::{ApiResult, CurrentSession};

pub fn router() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/instance", get(status).delete(disconnect))
        .route("/instance/connect", post(connect))
        .route("/instance/qr", post(refresh_qr))
}

/// GET /api/instance - Pairing state, reconciled against the gateway
async fn status(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<MessagingInstance>> {
    let instance = ctx
        .instances
        .status(session.tenant_id)
        .await?
        .ok_or_else(|| AgendaError::NotFound("messaging instance".to_string()))?;
    Ok(Json(instance))
}

/// POST /api/instance/connect - Provision the tenant's instance
///
/// Idempotent: an existing instance is reconciled and handed back with a
/// fresh QR code when it is still pairing.
async fn connect(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<MessagingInstance>> {
    Ok(Json(ctx.instances.connect(session.tenant_id, &session.email).await?))
}

/// POST /api/instance/qr - Request a fresh pairing QR code
async fn refresh_qr(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<MessagingInstance>> {
    Ok(Json(ctx.instances.refresh_qr(session.tenant_id).await?))
}

/// DELETE /api/instance - Tear the instance down on both sides
async fn disconnect(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<StatusCode> {
    ctx.instances.disconnect(session.tenant_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
