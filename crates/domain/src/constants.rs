//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Messaging gateway
pub const DEFAULT_COUNTRY_CODE: &str = "55";
pub const INSTANCE_NAME_PREFIX: &str = "agendapro";
pub const GATEWAY_INTEGRATION: &str = "WHATSAPP-BAILEYS";

// Template placeholders recognized by the renderer
pub const TEMPLATE_PLACEHOLDERS: [&str; 5] = ["{name}", "{email}", "{date}", "{service}", "{time}"];

// Calendar provider
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
pub const DEFAULT_EVENT_TIMEZONE: &str = "America/Sao_Paulo";

// Outbox worker defaults
pub const DEFAULT_OUTBOX_POLL_SECS: u64 = 60;
pub const DEFAULT_OUTBOX_BATCH_SIZE: usize = 50;
pub const DEFAULT_OUTBOX_MAX_ATTEMPTS: u32 = 3;

// Instance status monitor defaults (seconds between gateway polls)
pub const DEFAULT_MONITOR_PENDING_POLL_SECS: u64 = 5;
pub const DEFAULT_MONITOR_CONNECTED_POLL_SECS: u64 = 30;

// Reminder scheduler: scan cadence and dispatch window width
pub const DEFAULT_REMINDER_CRON: &str = "0 */5 * * * *";
pub const REMINDER_WINDOW_MINUTES: i64 = 15;

// Admin panel
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const DEFAULT_ADMIN_LOG_LIMIT: usize = 100;

// Persistence
pub const DEFAULT_DB_POOL_SIZE: u32 = 4;
pub const MAX_ERROR_REASON_LENGTH: usize = 256;
