//! Route coverage for Google Calendar account linking.

mod support;

use agendapro_domain::AppConfig;
use axum::http::StatusCode;
use serde_json::json;
use support::{expect_status, TestApp};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn calendar_app(server: &MockServer) -> TestApp {
    let mut config = AppConfig::default();
    config.calendar.client_id = "cid".to_string();
    config.calendar.client_secret = "csecret".to_string();
    config.calendar.redirect_uri = "http://localhost:8080/api/calendar/callback".to_string();
    config.calendar.token_url = format!("{}/token", server.uri());
    TestApp::spawn_with(config).await
}

#[tokio::test(flavor = "multi_thread")]
async fn auth_url_carries_client_and_tenant_state() {
    let server = MockServer::start().await;
    let app = calendar_app(&server).await;

    let body =
        expect_status(app.admin("GET", "/api/calendar/auth-url", None).await, StatusCode::OK).await;
    let url = body["url"].as_str().expect("url");
    assert!(url.contains("client_id=cid"));
    assert!(url.contains("access_type=offline"));
    assert!(url.contains(&format!("state={}", app.tenant_id)));
}

#[tokio::test(flavor = "multi_thread")]
async fn auth_url_without_configured_client_is_an_error() {
    let app = TestApp::spawn().await;
    let response = app.admin("GET", "/api/calendar/auth-url", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test(flavor = "multi_thread")]
async fn callback_links_the_account_and_unlink_reverts() {
    let server = MockServer::start().await;
    let app = calendar_app(&server).await;

    let before =
        expect_status(app.admin("GET", "/api/calendar/status", None).await, StatusCode::OK).await;
    assert_eq!(before["linked"], false);

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-1"))
        .and(body_string_contains("client_id=cid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3599,
        })))
        .expect(1)
        .mount(&server)
        .await;

    // The provider redirects the bare browser here, so no session headers
    let callback = app
        .request(
            "GET",
            &format!("/api/calendar/callback?code=auth-1&state={}", app.tenant_id),
            None,
        )
        .await;
    assert_eq!(callback.status(), StatusCode::OK);

    let after =
        expect_status(app.admin("GET", "/api/calendar/status", None).await, StatusCode::OK).await;
    assert_eq!(after["linked"], true);

    let stored = app.ctx.tokens.get(app.tenant_id).await.expect("query").expect("tokens stored");
    assert_eq!(stored.access_token, "access-1");
    assert_eq!(stored.refresh_token, "refresh-1");

    let unlink = app.admin("DELETE", "/api/calendar", None).await;
    assert_eq!(unlink.status(), StatusCode::NO_CONTENT);

    let reverted =
        expect_status(app.admin("GET", "/api/calendar/status", None).await, StatusCode::OK).await;
    assert_eq!(reverted["linked"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn callback_with_garbled_state_is_rejected() {
    let server = MockServer::start().await;
    let app = calendar_app(&server).await;

    let body = expect_status(
        app.request("GET", "/api/calendar/callback?code=auth-1&state=not-a-tenant", None).await,
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;
    assert_eq!(body["type"], "Validation");
}

#[tokio::test(flavor = "multi_thread")]
async fn provider_refusing_the_code_maps_to_401() {
    let server = MockServer::start().await;
    let app = calendar_app(&server).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
        })))
        .mount(&server)
        .await;

    let response = app
        .request(
            "GET",
            &format!("/api/calendar/callback?code=expired&state={}", app.tenant_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
