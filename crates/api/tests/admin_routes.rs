//! Route coverage for the admin panel.

mod support;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use support::{expect_status, TestApp, TEST_FORWARDED_FOR, TEST_USER_AGENT};
use uuid::Uuid;

fn seed_user(app: &TestApp, email: &str, role: &str) -> Uuid {
    let id = Uuid::now_v7();
    let conn = app.ctx.db.get_connection().expect("connection");
    conn.execute(
        "INSERT INTO users (id, email, password_hash, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id.to_string(), email, "$argon2id$seed", role, Utc::now().timestamp()],
    )
    .expect("seed user");
    id
}

#[tokio::test(flavor = "multi_thread")]
async fn role_change_lands_in_the_audit_trail() {
    let app = TestApp::spawn().await;
    let target = seed_user(&app, "pro@salao.com.br", "professional");

    let users = expect_status(app.admin("GET", "/api/admin/users", None).await, StatusCode::OK).await;
    assert_eq!(users.as_array().expect("array").len(), 1);
    assert_eq!(users[0]["email"], "pro@salao.com.br");

    let changed = app
        .admin(
            "POST",
            &format!("/api/admin/users/{target}/role"),
            Some(json!({"role": "receptionist"})),
        )
        .await;
    assert_eq!(changed.status(), StatusCode::NO_CONTENT);

    let users = expect_status(app.admin("GET", "/api/admin/users", None).await, StatusCode::OK).await;
    assert_eq!(users[0]["role"], "receptionist");

    let logs = expect_status(app.admin("GET", "/api/admin/logs", None).await, StatusCode::OK).await;
    let entries = logs.as_array().expect("array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "role_changed_by_admin");
    assert_eq!(entries[0]["details"]["new_role"], "receptionist");
    // Request metadata flows into the entry
    assert_eq!(entries[0]["ip_address"], TEST_FORWARDED_FOR);
    assert_eq!(entries[0]["user_agent"], TEST_USER_AGENT);
}

#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_user_captures_the_account_details() {
    let app = TestApp::spawn().await;
    let target = seed_user(&app, "pro@salao.com.br", "professional");

    let deleted = app.admin("DELETE", &format!("/api/admin/users/{target}"), None).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let logs = expect_status(app.admin("GET", "/api/admin/logs?limit=5", None).await, StatusCode::OK)
        .await;
    let entries = logs.as_array().expect("array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "user_deleted_by_admin");
    assert_eq!(entries[0]["details"]["deleted_user"]["email"], "pro@salao.com.br");
}

#[tokio::test(flavor = "multi_thread")]
async fn admins_cannot_target_their_own_account() {
    let app = TestApp::spawn().await;
    let own = app.user_id;

    let role = expect_status(
        app.admin("POST", &format!("/api/admin/users/{own}/role"), Some(json!({"role": "professional"})))
            .await,
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;
    assert_eq!(role["type"], "Validation");

    let removed = expect_status(
        app.admin("DELETE", &format!("/api/admin/users/{own}"), None).await,
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;
    assert_eq!(removed["type"], "Validation");
}

#[tokio::test(flavor = "multi_thread")]
async fn non_admin_roles_are_rejected() {
    let app = TestApp::spawn().await;

    let listed = app.as_role("receptionist", "GET", "/api/admin/users", None).await;
    assert_eq!(listed.status(), StatusCode::UNAUTHORIZED);

    let logs = app.as_role("professional", "GET", "/api/admin/logs", None).await;
    assert_eq!(logs.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread")]
async fn password_reset_enforces_minimum_length() {
    let app = TestApp::spawn().await;
    let target = seed_user(&app, "pro@salao.com.br", "professional");

    let weak = expect_status(
        app.admin(
            "POST",
            &format!("/api/admin/users/{target}/password"),
            Some(json!({"password": "curta"})),
        )
        .await,
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;
    assert_eq!(weak["type"], "Validation");

    let strong = app
        .admin(
            "POST",
            &format!("/api/admin/users/{target}/password"),
            Some(json!({"password": "Str0ng!Senha"})),
        )
        .await;
    assert_eq!(strong.status(), StatusCode::NO_CONTENT);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_role_value_is_a_validation_error() {
    let app = TestApp::spawn().await;
    let target = seed_user(&app, "pro@salao.com.br", "professional");

    let body = expect_status(
        app.admin("POST", &format!("/api/admin/users/{target}/role"), Some(json!({"role": "owner"})))
            .await,
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;
    assert_eq!(body["type"], "Validation");
}
