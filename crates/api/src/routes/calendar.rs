//! Google Calendar account linking endpoints.

use std::sync::Arc;

use agendapro_domain::{AgendaError, CalendarTokens};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::context::AppContext;
use crate::routes::{ApiResult, CurrentSession};

/// Page shown in the tenant's browser after a successful link.
const LINKED_PAGE: &str = "<!DOCTYPE html>\
<html><body><p>Google Calendar conectado. Pode fechar esta janela.</p></body></html>";

pub fn router() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/calendar/auth-url", get(auth_url))
        .route("/calendar/callback", get(callback))
        .route("/calendar/status", get(link_status))
        .route("/calendar", delete(unlink))
}

#[derive(Debug, Serialize)]
struct AuthUrlResponse {
    url: String,
}

/// GET /api/calendar/auth-url - Consent screen URL for the tenant's browser
async fn auth_url(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<AuthUrlResponse>> {
    let url = ctx.oauth_flow.authorize_url(&session.tenant_id.to_string())?;
    Ok(Json(AuthUrlResponse { url }))
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: String,
    state: String,
}

/// GET /api/calendar/callback - OAuth redirect target
///
/// Session-exempt: the provider redirects the bare browser here, so the
/// tenant travels in `state`, placed there by `auth_url`.
async fn callback(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<Html<&'static str>> {
    let tenant_id = query
        .state
        .parse::<Uuid>()
        .map_err(|_| AgendaError::Validation("state is not a tenant id".to_string()))?;

    let exchanged = ctx.oauth_flow.exchange_code(&query.code).await?;
    let now = Utc::now();
    let tokens = CalendarTokens {
        tenant_id,
        access_token: exchanged.access_token,
        refresh_token: exchanged.refresh_token,
        expires_at: now + ChronoDuration::seconds(exchanged.expires_in_seconds),
        updated_at: now,
    };
    ctx.tokens.upsert(&tokens).await?;

    info!(%tenant_id, "calendar account linked");
    Ok(Html(LINKED_PAGE))
}

#[derive(Debug, Serialize)]
struct LinkStatusResponse {
    linked: bool,
}

/// GET /api/calendar/status - Whether the tenant has linked an account
async fn link_status(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<LinkStatusResponse>> {
    let linked = ctx.calendar_sync.is_linked(session.tenant_id).await?;
    Ok(Json(LinkStatusResponse { linked }))
}

/// DELETE /api/calendar - Unlink the account and drop the stored tokens
///
/// Already-created events stay on the remote calendar; only the sync
/// credentials are removed. Deleting an absent link is a no-op.
async fn unlink(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<StatusCode> {
    ctx.tokens.delete(session.tenant_id).await?;
    info!(tenant_id = %session.tenant_id, "calendar account unlinked");
    Ok(StatusCode::NO_CONTENT)
}
