//! Shared fixtures for infrastructure integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use agendapro_domain::{Appointment, AppointmentStatus, Client, MessagesSent, ServiceOffering};
use agendapro_infra::database::DbManager;
use chrono::{NaiveDate, NaiveTime, Utc};
use once_cell::sync::OnceCell;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

static TRACING: OnceCell<()> = OnceCell::new();

/// Install a compact tracing subscriber once per test binary.
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
    });
}

/// Temporary database that keeps the underlying file alive for the duration
/// of a test.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new temporary database with the schema applied.
    pub fn new() -> Self {
        init_tracing();

        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("agendapro-test.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");
        manager.run_migrations().expect("schema migrations should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn tenant_id() -> Uuid {
    Uuid::now_v7()
}

pub fn make_client(tenant_id: Uuid, name: &str, phone: Option<&str>) -> Client {
    let now = Utc::now();
    Client {
        id: Uuid::now_v7(),
        tenant_id,
        name: name.to_string(),
        email: Some(format!("{}@example.com", name.to_lowercase().replace(' ', "."))),
        phone: phone.map(str::to_string),
        created_at: now,
        updated_at: now,
    }
}

pub fn make_service(tenant_id: Uuid, name: &str, duration_minutes: u32) -> ServiceOffering {
    let now = Utc::now();
    ServiceOffering {
        id: Uuid::now_v7(),
        tenant_id,
        name: name.to_string(),
        duration_minutes,
        price: 80.0,
        created_at: now,
        updated_at: now,
    }
}

pub fn make_appointment(
    tenant_id: Uuid,
    client_id: Uuid,
    service_id: Uuid,
    date: &str,
    start: &str,
    duration_minutes: u32,
) -> Appointment {
    let now = Utc::now();
    Appointment {
        id: Uuid::now_v7(),
        tenant_id,
        client_id,
        service_id,
        service_name: "Corte de cabelo".to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("valid test date"),
        start_time: NaiveTime::parse_from_str(start, "%H:%M:%S").expect("valid test time"),
        duration_minutes,
        price: 80.0,
        status: AppointmentStatus::Pending,
        google_event_id: None,
        is_synced_to_google: false,
        messages_sent: MessagesSent::default(),
        created_at: now,
        updated_at: now,
    }
}
