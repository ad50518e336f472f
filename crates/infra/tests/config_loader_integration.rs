//! Integration tests for configuration loading.
//!
//! Exercises complete deployment-shaped config files end to end, including
//! the handoff from the loaded worker section into the background worker
//! configurations.

use std::io::Write;
use std::time::Duration;

use agendapro_domain::AgendaError;
use agendapro_infra::config;
use agendapro_infra::{
    InstanceMonitorConfig, OutboxWorkerConfig, ReminderSchedulerConfig,
};
use tempfile::NamedTempFile;

#[test]
fn full_json_config_round_trips_into_worker_settings() {
    let json_content = r#"{
        "database": {
            "path": "/var/lib/agendapro/agenda.db",
            "pool_size": 8
        },
        "server": {
            "bind_addr": "0.0.0.0:8080"
        },
        "messaging": {
            "base_url": "http://gateway.internal:8081",
            "api_key": "evolution-key",
            "timeout_seconds": 15,
            "max_retries": 2
        },
        "calendar": {
            "client_id": "google-client",
            "client_secret": "google-secret",
            "redirect_uri": "http://localhost:3000/oauth/callback",
            "timezone": "America/Sao_Paulo"
        },
        "workers": {
            "outbox_poll_seconds": 30,
            "outbox_batch_size": 20,
            "outbox_max_attempts": 5,
            "monitor_pending_poll_seconds": 3,
            "monitor_connected_poll_seconds": 60,
            "reminder_cron": "0 */2 * * * *"
        }
    }"#;

    let path = write_fixture(json_content, "json");
    let loaded = config::load_from_file(Some(path.clone())).expect("json config should load");

    assert_eq!(loaded.database.path, "/var/lib/agendapro/agenda.db");
    assert_eq!(loaded.server.bind_addr, "0.0.0.0:8080");
    assert_eq!(loaded.messaging.api_key, "evolution-key");
    assert_eq!(loaded.calendar.client_id, "google-client");

    // The worker section feeds the three background workers.
    let outbox = OutboxWorkerConfig::from_worker_config(&loaded.workers);
    assert_eq!(outbox.poll_interval, Duration::from_secs(30));
    assert_eq!(outbox.batch_size, 20);
    assert_eq!(outbox.max_attempts, 5);

    let monitor = InstanceMonitorConfig::from_worker_config(&loaded.workers);
    assert_eq!(monitor.pending_poll, Duration::from_secs(3));
    assert_eq!(monitor.connected_poll, Duration::from_secs(60));

    let reminder = ReminderSchedulerConfig::from_worker_config(&loaded.workers);
    assert_eq!(reminder.cron_expression, "0 */2 * * * *");

    std::fs::remove_file(path).ok();
}

#[test]
fn full_toml_config_loads_every_section() {
    let toml_content = r#"
[database]
path = "/var/lib/agendapro/agenda.db"
pool_size = 6

[server]
bind_addr = "127.0.0.1:9090"

[messaging]
base_url = "http://gateway.internal:8081"
api_key = "evolution-key"
timeout_seconds = 20
max_retries = 3

[calendar]
client_id = "google-client"
client_secret = "google-secret"
redirect_uri = "http://localhost:3000/oauth/callback"
timezone = "America/Manaus"

[workers]
outbox_poll_seconds = 45
outbox_batch_size = 10
outbox_max_attempts = 4
monitor_pending_poll_seconds = 5
monitor_connected_poll_seconds = 30
reminder_cron = "0 */5 * * * *"
"#;

    let path = write_fixture(toml_content, "toml");
    let loaded = config::load_from_file(Some(path.clone())).expect("toml config should load");

    assert_eq!(loaded.database.pool_size, 6);
    assert_eq!(loaded.server.bind_addr, "127.0.0.1:9090");
    assert_eq!(loaded.messaging.timeout_seconds, 20);
    assert_eq!(loaded.calendar.timezone, "America/Manaus");
    assert_eq!(loaded.workers.outbox_poll_seconds, 45);
    // Unspecified calendar endpoints keep the Google defaults.
    assert_eq!(loaded.calendar.auth_url, "https://accounts.google.com/o/oauth2/v2/auth");
    assert_eq!(loaded.calendar.api_base_url, "https://www.googleapis.com/calendar/v3");

    std::fs::remove_file(path).ok();
}

#[test]
fn unsupported_extension_is_rejected() {
    let path = write_fixture("database:\n  path: agenda.db\n", "yaml");

    let result = config::load_from_file(Some(path.clone()));
    match result {
        Err(AgendaError::Config(msg)) => {
            assert!(msg.contains("Unsupported"), "error should name the format problem: {msg}");
        }
        other => panic!("expected Config error, got {other:?}"),
    }

    std::fs::remove_file(path).ok();
}

fn write_fixture(contents: &str, extension: &str) -> std::path::PathBuf {
    let mut temp_file = NamedTempFile::new().expect("temp file should be created");
    temp_file.write_all(contents.as_bytes()).expect("fixture should be written");
    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("fixture should be copied");
    path
}
