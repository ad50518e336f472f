//! Service catalog endpoints.

use std::sync::Arc;

use agendapro_domain::{AgendaError, NewServiceOffering, ServiceOffering};
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
        .route("/services", get(list).post(create))
        .route("/services/{id}", get(show).put(replace).delete(remove))
}

/// GET /api/services - Full catalog of the tenant
async fn list(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<Vec<ServiceOffering>>> {
    Ok(Json(ctx.catalog.list(session.tenant_id).await?))
}

/// POST /api/services - Add an offering to the catalog
async fn create(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Json(input): Json<NewServiceOffering>,
) -> ApiResult<(StatusCode, Json<ServiceOffering>)> {
    let (name, duration_minutes, price) = validated_fields(&input)?;
    let now = Utc::now();
    let offering = ServiceOffering {
        id: Uuid::now_v7(),
        tenant_id: session.tenant_id,
        name,
        duration_minutes,
        price,
        created_at: now,
        updated_at: now,
    };
    ctx.catalog.insert(&offering).await?;
    Ok((StatusCode::CREATED, Json(offering)))
}

/// GET /api/services/{id} - One offering
async fn show(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ServiceOffering>> {
    let offering = ctx
        .catalog
        .get(session.tenant_id, id)
        .await?
        .ok_or_else(|| AgendaError::NotFound(format!("service {id}")))?;
    Ok(Json(offering))
}

/// PUT /api/services/{id} - Replace the offering
///
/// Existing appointments keep the name, duration, and price they were
/// booked with; the catalog change only affects future bookings.
async fn replace(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
    Json(input): Json<NewServiceOffering>,
) -> ApiResult<Json<ServiceOffering>> {
    let mut offering = ctx
        .catalog
        .get(session.tenant_id, id)
        .await?
        .ok_or_else(|| AgendaError::NotFound(format!("service {id}")))?;

    let (name, duration_minutes, price) = validated_fields(&input)?;
    offering.name = name;
    offering.duration_minutes = duration_minutes;
    offering.price = price;
    offering.updated_at = Utc::now();
    ctx.catalog.update(&offering).await?;
    Ok(Json(offering))
}

/// DELETE /api/services/{id} - Remove the offering
async fn remove(
    State(ctx): State<Arc<AppContext>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    ctx.catalog.delete(session.tenant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validated_fields(input: &NewServiceOffering) -> Result<(String, u32, f64), AgendaError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AgendaError::Validation("service name must not be empty".to_string()));
    }
    if input.duration_minutes == 0 {
        return Err(AgendaError::Validation("service duration must be positive".to_string()));
    }
    if !input.price.is_finite() || input.price < 0.0 {
        return Err(AgendaError::Validation("service price must not be negative".to_string()));
    }
    Ok((name.to_string(), input.duration_minutes, input.price))
}
