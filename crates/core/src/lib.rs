//! # Agenda Pro Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The interval overlap checker and booking rules
//! - Port/adapter interfaces (traits)
//! - Use cases and services
//!
//! ## Architecture Principles
//! - Only depends on `agendapro-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod admin;
pub mod calendar;
pub mod messaging;
pub mod scheduling;
pub mod sync;

// Re-export specific items to avoid ambiguity
pub use admin::ports::{AuditLogRepository, UserDirectory};
pub use admin::AdminService;
pub use calendar::ports::{
    CalendarAuth, CalendarProvider, EventDetails, RefreshedToken, TokenRepository,
};
pub use calendar::CalendarSyncService;
pub use messaging::ports::{
    InstanceRepository, MessageGateway, ProvisionedInstance, TemplateRepository,
};
pub use messaging::{InstanceService, NotificationService};
pub use scheduling::conflict::has_conflict;
pub use scheduling::ports::{AppointmentRepository, ClientRepository, ServiceCatalogRepository};
pub use scheduling::{BookingResult, BookingService};
pub use sync::ports::{OutboxQueue, SyncJobHandler};
