//! Client directory endpoints.

use std::sync::Arc;

use agendapro_domain::{AgendaError, Client, NewClient};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use uuid::Uuid;

use crate::context::AppContext;
use crate::routes::{ApiResult, CurrentSession};

pub fn router() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/clients", get(list).post(create))
        .route("/clients/{id}", get(show).put(replace).delete(remove))
}

/// GET /api/clients - All clients of the tenant, alphabetical
async fn list(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<Vec<Client>>> {
    Ok(Json(ctx.clients.list(session.tenant_id).await?))
}

/// POST /api/clients - Register a new client
async fn create(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Json(input): Json<NewClient>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    let now = Utc::now();
    let client = Client {
        id: Uuid::now_v7(),
        tenant_id: session.tenant_id,
        name: validated_name(&input.name)?,
        email: blank_to_none(input.email),
        phone: blank_to_none(input.phone),
        created_at: now,
        updated_at: now,
    };
    ctx.clients.insert(&client).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// GET /api/clients/{id} - One client
async fn show(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Client>> {
    let client = ctx
        .clients
        .get(session.tenant_id, id)
        .await?
        .ok_or_else(|| AgendaError::NotFound(format!("client {id}")))?;
    Ok(Json(client))
}

/// PUT /api/clients/{id} - Replace the client's contact fields
async fn replace(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
    Json(input): Json<NewClient>,
) -> ApiResult<Json<Client>> {
    let mut client = ctx
        .clients
        .get(session.tenant_id, id)
        .await?
        .ok_or_else(|| AgendaError::NotFound(format!("client {id}")))?;

    client.name = validated_name(&input.name)?;
    client.email = blank_to_none(input.email);
    client.phone = blank_to_none(input.phone);
    client.updated_at = Utc::now();
    ctx.clients.update(&client).await?;
    Ok(Json(client))
}

/// DELETE /api/clients/{id} - Remove the client
async fn remove(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    ctx.clients.delete(session.tenant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validated_name(name: &str) -> Result<String, AgendaError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AgendaError::Validation("client name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
