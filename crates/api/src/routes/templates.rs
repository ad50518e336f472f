//! Message template endpoints.

use std::sync::Arc;

use agendapro_domain::{AgendaError, MessageKind, MessageTemplate};
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::context::AppContext;
use crate::routes::{ApiResult, CurrentSession};

pub fn router() -> Router<Arc<AppContext>> {
    Router::new().route("/templates", get(list)).route("/templates/{kind}", put(upsert))
}

/// GET /api/templates - All templates of the tenant
async fn list(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<Vec<MessageTemplate>>> {
    Ok(Json(ctx.notifications.list_templates(session.tenant_id).await?))
}

#[derive(Debug, Deserialize)]
struct TemplateRequest {
    content: String,
}

/// PUT /api/templates/{kind} - Create or replace the template of one kind
async fn upsert(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Path(kind): Path<String>,
    Json(request): Json<TemplateRequest>,
) -> ApiResult<Json<MessageTemplate>> {
    let kind = kind.parse::<MessageKind>().map_err(AgendaError::Validation)?;
    let template =
        ctx.notifications.upsert_template(session.tenant_id, kind, &request.content).await?;
    Ok(Json(template))
}
