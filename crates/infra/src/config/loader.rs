//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required variables are missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `AGENDAPRO_DB_PATH`: Database file path (required for the env source)
//! - `AGENDAPRO_DB_POOL_SIZE`: Connection pool size
//! - `AGENDAPRO_BIND_ADDR`: HTTP listen address
//! - `AGENDAPRO_GATEWAY_URL`: WhatsApp gateway base URL
//! - `AGENDAPRO_GATEWAY_API_KEY`: WhatsApp gateway API key
//! - `AGENDAPRO_GOOGLE_CLIENT_ID`: Google OAuth client id
//! - `AGENDAPRO_GOOGLE_CLIENT_SECRET`: Google OAuth client secret
//! - `AGENDAPRO_GOOGLE_REDIRECT_URI`: OAuth redirect URI
//! - `AGENDAPRO_EVENT_TIMEZONE`: IANA timezone attached to calendar events
//! - `AGENDAPRO_OUTBOX_POLL_SECS`: Outbox worker poll interval
//! - `AGENDAPRO_OUTBOX_BATCH_SIZE`: Outbox worker batch size
//! - `AGENDAPRO_OUTBOX_MAX_ATTEMPTS`: Attempts before a job is failed
//! - `AGENDAPRO_REMINDER_CRON`: Reminder scan cron expression
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./agendapro.json` or `./agendapro.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use agendapro_domain::{
    AgendaError, AppConfig, CalendarConfig, DatabaseConfig, MessagingConfig, Result, ServerConfig,
    WorkerConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `AgendaError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<AppConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `AGENDAPRO_DB_PATH` must be present; every other variable overlays the
/// section defaults when set.
///
/// # Errors
/// Returns `AgendaError::Config` if the database path is missing or a set
/// variable has an invalid value.
pub fn load_from_env() -> Result<AppConfig> {
    let defaults = AppConfig::default();

    let database = DatabaseConfig {
        path: env_var("AGENDAPRO_DB_PATH")?,
        pool_size: env_parse("AGENDAPRO_DB_POOL_SIZE")?.unwrap_or(defaults.database.pool_size),
    };

    let server =
        ServerConfig { bind_addr: env_or("AGENDAPRO_BIND_ADDR", defaults.server.bind_addr) };

    let messaging = MessagingConfig {
        base_url: env_or("AGENDAPRO_GATEWAY_URL", defaults.messaging.base_url),
        api_key: env_or("AGENDAPRO_GATEWAY_API_KEY", defaults.messaging.api_key),
        timeout_seconds: env_parse("AGENDAPRO_GATEWAY_TIMEOUT_SECS")?
            .unwrap_or(defaults.messaging.timeout_seconds),
        max_retries: env_parse("AGENDAPRO_GATEWAY_MAX_RETRIES")?
            .unwrap_or(defaults.messaging.max_retries),
    };

    let calendar = CalendarConfig {
        client_id: env_or("AGENDAPRO_GOOGLE_CLIENT_ID", defaults.calendar.client_id),
        client_secret: env_or("AGENDAPRO_GOOGLE_CLIENT_SECRET", defaults.calendar.client_secret),
        redirect_uri: env_or("AGENDAPRO_GOOGLE_REDIRECT_URI", defaults.calendar.redirect_uri),
        auth_url: env_or("AGENDAPRO_GOOGLE_AUTH_URL", defaults.calendar.auth_url),
        token_url: env_or("AGENDAPRO_GOOGLE_TOKEN_URL", defaults.calendar.token_url),
        api_base_url: env_or("AGENDAPRO_GOOGLE_API_BASE_URL", defaults.calendar.api_base_url),
        timezone: env_or("AGENDAPRO_EVENT_TIMEZONE", defaults.calendar.timezone),
        timeout_seconds: env_parse("AGENDAPRO_CALENDAR_TIMEOUT_SECS")?
            .unwrap_or(defaults.calendar.timeout_seconds),
    };

    let workers = WorkerConfig {
        outbox_poll_seconds: env_parse("AGENDAPRO_OUTBOX_POLL_SECS")?
            .unwrap_or(defaults.workers.outbox_poll_seconds),
        outbox_batch_size: env_parse("AGENDAPRO_OUTBOX_BATCH_SIZE")?
            .unwrap_or(defaults.workers.outbox_batch_size),
        outbox_max_attempts: env_parse("AGENDAPRO_OUTBOX_MAX_ATTEMPTS")?
            .unwrap_or(defaults.workers.outbox_max_attempts),
        monitor_pending_poll_seconds: env_parse("AGENDAPRO_MONITOR_PENDING_POLL_SECS")?
            .unwrap_or(defaults.workers.monitor_pending_poll_seconds),
        monitor_connected_poll_seconds: env_parse("AGENDAPRO_MONITOR_CONNECTED_POLL_SECS")?
            .unwrap_or(defaults.workers.monitor_connected_poll_seconds),
        reminder_cron: env_or("AGENDAPRO_REMINDER_CRON", defaults.workers.reminder_cron),
    };

    Ok(AppConfig { database, server, messaging, calendar, workers })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `AgendaError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AgendaError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            AgendaError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AgendaError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AgendaError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AgendaError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(AgendaError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./config.{json,toml}`,
///    `./agendapro.{json,toml}`)
/// 2. Parent directories (up to 2 levels)
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    // Try current working directory
    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("agendapro.json"),
            cwd.join("agendapro.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
            cwd.join("../../config.json"),
            cwd.join("../../config.toml"),
        ]);
    }

    // Try relative to executable
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("agendapro.json"),
                exe_dir.join("agendapro.toml"),
                exe_dir.join("../config.json"),
                exe_dir.join("../config.toml"),
                exe_dir.join("../../config.json"),
                exe_dir.join("../../config.toml"),
            ]);
        }
    }

    // Return first existing candidate
    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| AgendaError::Config(format!("Missing required environment variable: {}", key)))
}

/// Get environment variable with a fallback value
fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

/// Parse an optional environment variable into `T`
///
/// Returns `Ok(None)` when the variable is not set and an error when it is
/// set but does not parse.
fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| AgendaError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}
