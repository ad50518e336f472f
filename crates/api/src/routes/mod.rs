//! HTTP routing, session extraction, and error mapping.
//!
//! Every route module exposes a `router()` merged here under `/api`.
//! Handlers return `ApiResult<T>`; the single `ApiError` wrapper decides
//! which status a domain error maps to, so no handler ever picks a status
//! code for a failure by hand.

pub mod admin;
pub mod appointments;
pub mod calendar;
pub mod clients;
pub mod health;
pub mod instance;
pub mod services;
pub mod templates;

use std::convert::Infallible;
use std::sync::Arc;

use agendapro_domain::{AgendaError, RequestMeta, Session, UserRole};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{debug, error};
use uuid::Uuid;

use crate::context::AppContext;

/// Build the application router.
///
/// `/health` sits outside `/api` so probes skip session extraction.
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api_router())
        .with_state(ctx)
}

fn api_router() -> Router<Arc<AppContext>> {
    Router::new()
        .merge(clients::router())
        .merge(services::router())
        .merge(appointments::router())
        .merge(templates::router())
        .merge(instance::router())
        .merge(calendar::router())
        .merge(admin::router())
}

/// Wrapper translating domain errors onto HTTP responses.
///
/// The body is the serialized `AgendaError` itself, so clients see the
/// same `{"type", "message"}` shape everywhere.
pub struct ApiError(pub AgendaError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<AgendaError> for ApiError {
    fn from(err: AgendaError) -> Self {
        Self(err)
    }
}

fn status_for(err: &AgendaError) -> StatusCode {
    match err {
        AgendaError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AgendaError::NotFound(_) => StatusCode::NOT_FOUND,
        AgendaError::Conflict(_) | AgendaError::AlreadySent(_) => StatusCode::CONFLICT,
        AgendaError::Auth(_) => StatusCode::UNAUTHORIZED,
        AgendaError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        AgendaError::Database(_) | AgendaError::Config(_) | AgendaError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        } else {
            debug!(error = %self.0, status = %status, "request rejected");
        }
        (status, Json(self.0)).into_response()
    }
}

/// Caller identity for the request.
///
/// The fronting auth layer verifies credentials and forwards the identity
/// in `x-user-id`, `x-tenant-id`, `x-user-email`, and `x-user-role`. A
/// request without a parseable set of these headers is rejected outright.
pub struct CurrentSession(pub Session);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_from_headers(&parts.headers).map(Self).map_err(ApiError::from)
    }
}

fn session_from_headers(headers: &HeaderMap) -> Result<Session, AgendaError> {
    let user_id = uuid_header(headers, "x-user-id")?;
    let tenant_id = uuid_header(headers, "x-tenant-id")?;
    let email = required_header(headers, "x-user-email")?.to_string();
    let role =
        required_header(headers, "x-user-role")?.parse::<UserRole>().map_err(AgendaError::Auth)?;
    Ok(Session { user_id, tenant_id, email, role })
}

fn required_header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AgendaError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AgendaError::Auth(format!("missing {name} header")))
}

fn uuid_header(headers: &HeaderMap, name: &'static str) -> Result<Uuid, AgendaError> {
    required_header(headers, name)?
        .parse()
        .map_err(|_| AgendaError::Auth(format!("invalid {name} header")))
}

/// Request metadata captured into the admin audit trail.
///
/// Extraction never fails; absent headers simply leave the fields empty.
pub struct ClientMeta(pub RequestMeta);

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // First hop of x-forwarded-for is the client address
        let ip_address = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        Ok(Self(RequestMeta { ip_address, user_agent }))
    }
}
