//! Route coverage for appointment booking.
//!
//! Bookings use far-future dates so the reminder windows never apply.

mod support;

use agendapro_domain::SyncOperation;
use axum::http::StatusCode;
use serde_json::{json, Value};
use support::{expect_status, TestApp};

async fn seed_client(app: &TestApp) -> String {
    let created = expect_status(
        app.admin(
            "POST",
            "/api/clients",
            Some(json!({"name": "Maria Silva", "phone": "11987654321"})),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    created["id"].as_str().expect("client id").to_string()
}

async fn seed_service(app: &TestApp, duration_minutes: u32) -> String {
    let created = expect_status(
        app.admin(
            "POST",
            "/api/services",
            Some(json!({
                "name": "Corte de cabelo",
                "duration_minutes": duration_minutes,
                "price": 80.0,
            })),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    created["id"].as_str().expect("service id").to_string()
}

async fn book(app: &TestApp, body: Value, status: StatusCode) -> Value {
    expect_status(app.admin("POST", "/api/appointments", Some(body)).await, status).await
}

#[tokio::test(flavor = "multi_thread")]
async fn booking_conflicts_map_to_409_and_back_to_back_is_free() {
    let app = TestApp::spawn().await;
    let client_id = seed_client(&app).await;
    let service_id = seed_service(&app, 60).await;

    let first = book(
        &app,
        json!({
            "client_id": client_id,
            "service_id": service_id,
            "date": "2030-04-09",
            "start_time": "10:00:00",
        }),
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(first["appointment"]["status"], "pending");
    assert_eq!(first["appointment"]["service_name"], "Corte de cabelo");
    assert!(first.get("warning").is_none());

    let overlap = book(
        &app,
        json!({
            "client_id": client_id,
            "service_id": service_id,
            "date": "2030-04-09",
            "start_time": "10:20:00",
        }),
        StatusCode::CONFLICT,
    )
    .await;
    assert_eq!(overlap["type"], "Conflict");

    // Closed-open intervals: starting exactly at the previous end is fine
    book(
        &app,
        json!({
            "client_id": client_id,
            "service_id": service_id,
            "date": "2030-04-09",
            "start_time": "11:00:00",
        }),
        StatusCode::CREATED,
    )
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn day_listing_confirm_and_cancel_flow() {
    let app = TestApp::spawn().await;
    let client_id = seed_client(&app).await;
    let service_id = seed_service(&app, 30).await;

    let created = book(
        &app,
        json!({
            "client_id": client_id,
            "service_id": service_id,
            "date": "2030-04-09",
            "start_time": "09:00:00",
        }),
        StatusCode::CREATED,
    )
    .await;
    let id = created["appointment"]["id"].as_str().expect("id").to_string();

    let listed = expect_status(
        app.admin("GET", "/api/appointments?date=2030-04-09", None).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(listed.as_array().expect("array").len(), 1);

    let confirmed = expect_status(
        app.admin("POST", &format!("/api/appointments/{id}/confirm"), None).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(confirmed["appointment"]["status"], "confirmed");

    let cancelled = expect_status(
        app.admin("POST", &format!("/api/appointments/{id}/cancel"), None).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(cancelled["appointment"]["status"], "cancelled");

    // A cancelled appointment no longer blocks its slot
    book(
        &app,
        json!({
            "client_id": client_id,
            "service_id": service_id,
            "date": "2030-04-09",
            "start_time": "09:00:00",
        }),
        StatusCode::CREATED,
    )
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn listing_needs_a_date_or_a_range() {
    let app = TestApp::spawn().await;

    let missing =
        expect_status(app.admin("GET", "/api/appointments", None).await, StatusCode::UNPROCESSABLE_ENTITY)
            .await;
    assert_eq!(missing["type"], "Validation");

    let empty = expect_status(
        app.admin("GET", "/api/appointments?from=2030-04-01&to=2030-04-30", None).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(empty.as_array().expect("array").len(), 0);

    let inverted = app.admin("GET", "/api/appointments?from=2030-05-01&to=2030-04-01", None).await;
    assert_eq!(inverted.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test(flavor = "multi_thread")]
async fn rescheduling_into_an_occupied_slot_is_rejected() {
    let app = TestApp::spawn().await;
    let client_id = seed_client(&app).await;
    let service_id = seed_service(&app, 60).await;

    book(
        &app,
        json!({
            "client_id": client_id,
            "service_id": service_id,
            "date": "2030-04-09",
            "start_time": "10:00:00",
        }),
        StatusCode::CREATED,
    )
    .await;
    let second = book(
        &app,
        json!({
            "client_id": client_id,
            "service_id": service_id,
            "date": "2030-04-09",
            "start_time": "14:00:00",
        }),
        StatusCode::CREATED,
    )
    .await;
    let id = second["appointment"]["id"].as_str().expect("id").to_string();

    let moved = app
        .admin(
            "PUT",
            &format!("/api/appointments/{id}"),
            Some(json!({"start_time": "10:30:00"})),
        )
        .await;
    assert_eq!(moved.status(), StatusCode::CONFLICT);

    // An untouched reschedule against its own slot is not a conflict
    let same = app
        .admin(
            "PUT",
            &format!("/api/appointments/{id}"),
            Some(json!({"start_time": "14:00:00"})),
        )
        .await;
    assert_eq!(same.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_of_unsynced_appointment_leaves_no_delete_job() {
    let app = TestApp::spawn().await;
    let client_id = seed_client(&app).await;
    let service_id = seed_service(&app, 30).await;

    let created = book(
        &app,
        json!({
            "client_id": client_id,
            "service_id": service_id,
            "date": "2030-04-09",
            "start_time": "08:00:00",
        }),
        StatusCode::CREATED,
    )
    .await;
    let id = created["appointment"]["id"].as_str().expect("id").to_string();

    let deleted = expect_status(
        app.admin("DELETE", &format!("/api/appointments/{id}"), None).await,
        StatusCode::OK,
    )
    .await;
    assert!(deleted.get("warning").is_none());

    // Only the create job was ever enqueued; nothing to delete remotely
    let jobs = app.ctx.outbox.dequeue_batch(10).await.expect("dequeue");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].operation, SyncOperation::Create);
}

#[tokio::test(flavor = "multi_thread")]
async fn notification_without_gateway_instance_is_rejected() {
    let app = TestApp::spawn().await;
    let client_id = seed_client(&app).await;
    let service_id = seed_service(&app, 30).await;

    let created = book(
        &app,
        json!({
            "client_id": client_id,
            "service_id": service_id,
            "date": "2030-04-09",
            "start_time": "15:00:00",
        }),
        StatusCode::CREATED,
    )
    .await;
    let id = created["appointment"]["id"].as_str().expect("id").to_string();

    let body = expect_status(
        app.admin(
            "POST",
            &format!("/api/appointments/{id}/notifications"),
            Some(json!({"kind": "confirmation"})),
        )
        .await,
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;
    assert_eq!(body["type"], "Validation");
    assert!(body["message"].as_str().expect("message").contains("instance"));
}

#[tokio::test(flavor = "multi_thread")]
async fn booking_an_unknown_service_is_404() {
    let app = TestApp::spawn().await;
    let client_id = seed_client(&app).await;

    let response = app
        .admin(
            "POST",
            "/api/appointments",
            Some(json!({
                "client_id": client_id,
                "service_id": "0191e4a0-0000-7000-8000-00000000dead",
                "date": "2030-04-09",
                "start_time": "10:00:00",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
