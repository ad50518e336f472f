//! Shared helpers for route tests.
//!
//! Each test builds a full `AppContext` on a throwaway database and drives
//! the router in-process with `tower::ServiceExt::oneshot`; no sockets are
//! bound. Worker cadences are stretched far out so background sweeps never
//! race the assertions.

#![allow(dead_code)]

use std::sync::Arc;

use agendapro_domain::{AppConfig, DatabaseConfig};
use agendapro_server::{router, AppContext};
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_EMAIL: &str = "dona@salao.com.br";
pub const TEST_USER_AGENT: &str = "agendapro-tests";
pub const TEST_FORWARDED_FOR: &str = "203.0.113.9";

/// A wired application on a temporary database.
pub struct TestApp {
    pub ctx: Arc<AppContext>,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    _temp_dir: TempDir,
}

impl TestApp {
    /// Context on a fresh database with default configuration.
    pub async fn spawn() -> Self {
        Self::spawn_with(AppConfig::default()).await
    }

    /// Context on a fresh database with caller-tweaked configuration.
    /// The database path and the worker cadences are always overridden.
    pub async fn spawn_with(mut config: AppConfig) -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let db_path = temp_dir.path().join("agendapro.db");
        config.database =
            DatabaseConfig { path: db_path.to_string_lossy().into_owned(), pool_size: 4 };

        // Keep the workers quiet for the duration of a test run
        config.workers.outbox_poll_seconds = 3600;
        config.workers.monitor_pending_poll_seconds = 3600;
        config.workers.monitor_connected_poll_seconds = 3600;
        config.workers.reminder_cron = "0 0 0 1 1 *".to_string();

        let ctx = Arc::new(AppContext::new_with_config(config).await.expect("context builds"));
        Self { ctx, tenant_id: Uuid::new_v4(), user_id: Uuid::new_v4(), _temp_dir: temp_dir }
    }

    /// One request without session headers.
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> Response<Body> {
        let request = with_body(Request::builder().method(method).uri(uri), body);
        router(self.ctx.clone()).oneshot(request).await.expect("router call")
    }

    /// One request carrying an admin session.
    pub async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> Response<Body> {
        self.as_role("admin", method, uri, body).await
    }

    /// One request with an explicit role header.
    pub async fn as_role(
        &self,
        role: &str,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-user-id", self.user_id.to_string())
            .header("x-tenant-id", self.tenant_id.to_string())
            .header("x-user-email", TEST_EMAIL)
            .header("x-user-role", role)
            .header("x-forwarded-for", TEST_FORWARDED_FOR)
            .header(header::USER_AGENT, TEST_USER_AGENT);
        let request = with_body(builder, body);
        router(self.ctx.clone()).oneshot(request).await.expect("router call")
    }
}

fn with_body(builder: axum::http::request::Builder, body: Option<Value>) -> Request<Body> {
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

/// Deserialize the response body as JSON.
pub async fn read_json(response: Response<Body>) -> Value {
    let bytes =
        axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Assert the status and return the parsed body.
pub async fn expect_status(response: Response<Body>, status: StatusCode) -> Value {
    assert_eq!(response.status(), status, "unexpected status");
    read_json(response).await
}
