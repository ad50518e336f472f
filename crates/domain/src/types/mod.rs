//! Domain types and models

pub mod admin;
pub mod booking;
pub mod calendar;
pub mod messaging;
pub mod session;

pub use admin::{AdminLogEntry, RequestMeta, UserAccount, UserRole};
pub use booking::{
    Appointment, AppointmentPatch, AppointmentStatus, CandidateSlot, Client, MessagesSent,
    NewAppointment, NewClient, NewServiceOffering, ServiceOffering,
};
pub use calendar::{CalendarTokens, SyncJob, SyncJobStatus, SyncOperation};
pub use messaging::{InstanceStatus, MessageKind, MessageTemplate, MessagingInstance};
pub use session::Session;
