//! # Agenda Pro Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite persistence (pooling, schema, repositories)
//! - WhatsApp gateway HTTP client
//! - Google Calendar HTTP client and OAuth flow
//! - Background workers (outbox drain, instance monitor, reminder cron)
//!
//! ## Architecture
//! - Implements traits defined in `agendapro-core`
//! - Depends on `agendapro-domain` and `agendapro-core`
//! - Contains all "impure" code (I/O, external services)

pub mod config;
pub mod database;
pub mod errors;
pub mod integrations;
pub mod scheduling;
pub mod sync;

// Re-export commonly used items
pub use database::*;
pub use errors::InfraError;
pub use integrations::calendar::{
    ExchangedTokens, GoogleCalendarAuth, GoogleCalendarClient, GoogleOAuthFlow,
};
pub use integrations::messaging::EvolutionGateway;
pub use scheduling::{
    InstanceMonitor, InstanceMonitorConfig, ReminderScheduler, ReminderSchedulerConfig,
    SchedulerError, SchedulerResult,
};
pub use sync::{OutboxWorker, OutboxWorkerConfig};
