//! Admin panel endpoints.
//!
//! Role enforcement lives in `AdminService`; these handlers only shape
//! the requests and pass the caller's session through.

use std::sync::Arc;

use agendapro_domain::{AdminLogEntry, AgendaError, UserAccount, UserRole};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::context::AppContext;
use crate::routes::{ApiResult, ClientMeta, CurrentSession};

pub fn router() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}", delete(delete_user))
        .route("/admin/users/{id}/password", post(reset_password))
        .route("/admin/users/{id}/role", post(change_role))
        .route("/admin/logs", get(list_logs))
}

/// GET /api/admin/users - Every managed account
async fn list_users(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<Vec<UserAccount>>> {
    Ok(Json(ctx.admin.list_users(&session).await?))
}

#[derive(Debug, Deserialize)]
struct PasswordRequest {
    password: String,
}

/// POST /api/admin/users/{id}/password - Set a new password for the account
async fn reset_password(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<Uuid>,
    Json(request): Json<PasswordRequest>,
) -> ApiResult<StatusCode> {
    ctx.admin.reset_password(&session, &meta, id, &request.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct RoleRequest {
    role: String,
}

/// POST /api/admin/users/{id}/role - Reassign the account's role
async fn change_role(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<Uuid>,
    Json(request): Json<RoleRequest>,
) -> ApiResult<StatusCode> {
    let role = request.role.parse::<UserRole>().map_err(AgendaError::Validation)?;
    ctx.admin.change_role(&session, &meta, id, role).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/admin/users/{id} - Remove the account
async fn delete_user(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    ClientMeta(meta): ClientMeta,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    ctx.admin.delete_user(&session, &meta, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

/// GET /api/admin/logs - Audit trail, newest first
async fn list_logs(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Json<Vec<AdminLogEntry>>> {
    Ok(Json(ctx.admin.list_logs(&session, query.limit).await?))
}
