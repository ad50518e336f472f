//! Appointment booking endpoints.

use std::sync::Arc;

use agendapro_core::BookingResult;
use agendapro_domain::{AgendaError, Appointment, AppointmentPatch, MessageKind, NewAppointment};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AppContext;
use crate::routes::{ApiResult, CurrentSession};

pub fn router() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/appointments", get(list).post(create))
        .route("/appointments/{id}", get(show).put(update).delete(remove))
        .route("/appointments/{id}/confirm", post(confirm))
        .route("/appointments/{id}/cancel", post(cancel))
        .route("/appointments/{id}/notifications", post(send_notification))
}

/// Booked appointment plus the warning of a failed best-effort step,
/// such as an outbox enqueue that did not go through.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub appointment: Appointment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<BookingResult> for BookingResponse {
    fn from(result: BookingResult) -> Self {
        Self { appointment: result.appointment, warning: result.warning }
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    date: Option<NaiveDate>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

/// GET /api/appointments - Agenda for one day or an inclusive date range
async fn list(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Appointment>>> {
    let rows = match (query.date, query.from, query.to) {
        (Some(date), None, None) => ctx.booking.list_by_date(session.tenant_id, date).await?,
        (None, Some(from), Some(to)) => {
            ctx.booking.list_in_range(session.tenant_id, from, to).await?
        }
        _ => {
            return Err(AgendaError::Validation(
                "query needs either date= or from= and to=".to_string(),
            )
            .into())
        }
    };
    Ok(Json(rows))
}

/// POST /api/appointments - Book a new appointment
async fn create(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Json(input): Json<NewAppointment>,
) -> ApiResult<(StatusCode, Json<BookingResponse>)> {
    let result = ctx.booking.create(session.tenant_id, input).await?;
    Ok((StatusCode::CREATED, Json(result.into())))
}

/// GET /api/appointments/{id} - One appointment
async fn show(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(ctx.booking.get(session.tenant_id, id).await?))
}

/// PUT /api/appointments/{id} - Reschedule or edit fields
async fn update(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
    Json(patch): Json<AppointmentPatch>,
) -> ApiResult<Json<BookingResponse>> {
    let result = ctx.booking.update(session.tenant_id, id, patch).await?;
    Ok(Json(result.into()))
}

/// Outcome of a delete; `warning` reports a failed best-effort cleanup.
#[derive(Debug, Serialize)]
struct DeleteResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

/// DELETE /api/appointments/{id} - Remove the appointment
async fn remove(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    let warning = ctx.booking.delete(session.tenant_id, id).await?;
    Ok(Json(DeleteResponse { warning }))
}

/// POST /api/appointments/{id}/confirm - Move pending to confirmed
async fn confirm(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BookingResponse>> {
    let result = ctx.booking.confirm(session.tenant_id, id).await?;
    Ok(Json(result.into()))
}

/// POST /api/appointments/{id}/cancel - Cancel and free the slot
async fn cancel(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BookingResponse>> {
    let result = ctx.booking.cancel(session.tenant_id, id).await?;
    Ok(Json(result.into()))
}

#[derive(Debug, Deserialize)]
struct SendNotificationRequest {
    kind: MessageKind,
}

/// POST /api/appointments/{id}/notifications - Dispatch one message kind
async fn send_notification(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
    Json(request): Json<SendNotificationRequest>,
) -> ApiResult<StatusCode> {
    ctx.notifications.send_notification(session.tenant_id, id, request.kind).await?;
    Ok(StatusCode::NO_CONTENT)
}
