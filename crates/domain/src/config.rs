//! Configuration structures
//!
//! Deserialized from environment variables or a TOML/JSON file by the infra
//! config loader. Every section carries usable defaults so a minimal config
//! can boot the service.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DB_POOL_SIZE, DEFAULT_EVENT_TIMEZONE, DEFAULT_MONITOR_CONNECTED_POLL_SECS,
    DEFAULT_MONITOR_PENDING_POLL_SECS, DEFAULT_OUTBOX_BATCH_SIZE, DEFAULT_OUTBOX_MAX_ATTEMPTS,
    DEFAULT_OUTBOX_POLL_SECS, DEFAULT_REMINDER_CRON, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL,
};

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
}

/// SQLite database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "agendapro.db".to_string(), pool_size: DEFAULT_DB_POOL_SIZE }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "127.0.0.1:8080".to_string() }
    }
}

/// Messaging gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_http_retries")]
    pub max_retries: u32,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            api_key: String::new(),
            timeout_seconds: default_http_timeout(),
            max_retries: default_http_retries(),
        }
    }
}

/// Calendar provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            api_base_url: default_api_base_url(),
            timezone: default_timezone(),
            timeout_seconds: default_http_timeout(),
        }
    }
}

/// Background worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_outbox_poll")]
    pub outbox_poll_seconds: u64,
    #[serde(default = "default_outbox_batch")]
    pub outbox_batch_size: usize,
    #[serde(default = "default_outbox_attempts")]
    pub outbox_max_attempts: u32,
    #[serde(default = "default_monitor_pending_poll")]
    pub monitor_pending_poll_seconds: u64,
    #[serde(default = "default_monitor_connected_poll")]
    pub monitor_connected_poll_seconds: u64,
    #[serde(default = "default_reminder_cron")]
    pub reminder_cron: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            outbox_poll_seconds: default_outbox_poll(),
            outbox_batch_size: default_outbox_batch(),
            outbox_max_attempts: default_outbox_attempts(),
            monitor_pending_poll_seconds: default_monitor_pending_poll(),
            monitor_connected_poll_seconds: default_monitor_connected_poll(),
            reminder_cron: default_reminder_cron(),
        }
    }
}

fn default_pool_size() -> u32 {
    DEFAULT_DB_POOL_SIZE
}

fn default_http_timeout() -> u64 {
    30
}

fn default_http_retries() -> u32 {
    1
}

fn default_auth_url() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

fn default_api_base_url() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_timezone() -> String {
    DEFAULT_EVENT_TIMEZONE.to_string()
}

fn default_outbox_poll() -> u64 {
    DEFAULT_OUTBOX_POLL_SECS
}

fn default_outbox_batch() -> usize {
    DEFAULT_OUTBOX_BATCH_SIZE
}

fn default_outbox_attempts() -> u32 {
    DEFAULT_OUTBOX_MAX_ATTEMPTS
}

fn default_monitor_pending_poll() -> u64 {
    DEFAULT_MONITOR_PENDING_POLL_SECS
}

fn default_monitor_connected_poll() -> u64 {
    DEFAULT_MONITOR_CONNECTED_POLL_SECS
}

fn default_reminder_cron() -> String {
    DEFAULT_REMINDER_CRON.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable() {
        let config = AppConfig::default();
        assert_eq!(config.database.pool_size, DEFAULT_DB_POOL_SIZE);
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.workers.outbox_batch_size, DEFAULT_OUTBOX_BATCH_SIZE);
        assert_eq!(config.calendar.timezone, "America/Sao_Paulo");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_content = r#"
[database]
path = "test.db"

[messaging]
base_url = "http://gateway.local"
api_key = "secret"
"#;
        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.database.path, "test.db");
        assert_eq!(config.database.pool_size, DEFAULT_DB_POOL_SIZE);
        assert_eq!(config.messaging.base_url, "http://gateway.local");
        assert_eq!(config.messaging.timeout_seconds, 30);
        assert_eq!(config.workers.outbox_max_attempts, DEFAULT_OUTBOX_MAX_ATTEMPTS);
    }
}
